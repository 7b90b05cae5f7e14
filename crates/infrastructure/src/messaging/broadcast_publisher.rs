use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::EventPublisher;
use tokio::sync::broadcast;
use tracing::trace;

/// In-process state stream backed by a broadcast channel.
///
/// Subscribers only see events sent after they subscribed; with nobody
/// listening an event is simply dropped. A subscriber that falls more than
/// `capacity` events behind skips the oldest ones.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Err only means there is no receiver right now
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(event_type = event.event_type(), "No subscribers, event dropped");
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
