use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::EventPublisher;
use std::sync::Arc;

/// Fans one event out to several publishers
pub struct CompositeEventPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl CompositeEventPublisher {
    pub fn new(publishers: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { publishers }
    }
}

#[async_trait]
impl EventPublisher for CompositeEventPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for publisher in &self.publishers {
            // One failing sink must not starve the others
            if let Err(e) = publisher.publish(event.clone()).await {
                tracing::error!("Failed to publish {} event: {}", event.event_type(), e);
            }
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.publishers.iter().map(|p| p.listener_count()).sum()
    }
}
