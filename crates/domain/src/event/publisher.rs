use crate::DomainEvent;
use async_trait::async_trait;

/// Outbound event sink. Delivery is fire-and-forget: an event with no
/// current listener is dropped, never queued for a later subscriber.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Number of listeners that would receive an event published now
    fn listener_count(&self) -> usize {
        0
    }
}
