use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::EventPublisher;
use tracing::{debug, info, warn};

/// Writes every event to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &event {
            DomainEvent::ConnectionStateChanged {
                slot_id,
                state,
                reason: Some(reason),
                ..
            } => warn!(slot = %slot_id, state = %state, reason = %reason, "Connection state changed"),
            DomainEvent::ConnectionStateChanged { slot_id, state, .. } => {
                info!(slot = %slot_id, state = %state, "Connection state changed")
            }
            DomainEvent::AdapterStateChanged { state, .. } => {
                info!(state = ?state, code = state.code(), "Adapter state changed")
            }
            DomainEvent::LinkStateChanged { connected, .. } => {
                info!(connected, "Link state changed")
            }
            DomainEvent::StatusReceived { slot_id, bytes, .. } => {
                debug!(slot = %slot_id, bytes = ?bytes, "Printer status received")
            }
            DomainEvent::ReaderStopped { slot_id, reason, .. } => {
                warn!(slot = %slot_id, reason = %reason, "Reader stopped")
            }
            DomainEvent::TaskFailed {
                slot_id,
                operation,
                error,
                ..
            } => warn!(slot = ?slot_id, operation = %operation, error = %error, "Queued task failed"),
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        1
    }
}
