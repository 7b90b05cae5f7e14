use domain::event::EventPublisher;
use domain::{DomainEvent, Port, SlotId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest `cancel` waits for the loop before aborting it
const CANCEL_BOUND: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Loop not running (never started, or ended on a port error)
    Idle,
    Running,
    Cancelled,
}

/// Background loop draining inbound bytes from a port.
///
/// Frames are published as `StatusReceived`. A read error ends the loop,
/// publishes `ReaderStopped` and calls the failure hook once.
pub struct Reader {
    slot_id: SlotId,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Reader {
    pub fn start<F>(
        slot_id: SlotId,
        port: Arc<dyn Port>,
        token: CancellationToken,
        publisher: Arc<dyn EventPublisher>,
        on_failure: F,
    ) -> Self
    where
        F: FnOnce(String) + Send + 'static,
    {
        let loop_token = token.clone();
        let mut on_failure = Some(on_failure);
        let handle = tokio::spawn(async move {
            debug!(slot = %slot_id, "Reader started");
            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => {
                        debug!(slot = %slot_id, "Reader cancelled");
                        break;
                    }
                    result = port.read() => match result {
                        Ok(Some(bytes)) => {
                            debug!(slot = %slot_id, len = bytes.len(), "Status bytes received");
                            if let Err(e) = publisher.publish(DomainEvent::status_received(slot_id, bytes)).await {
                                warn!("Failed to publish status: {}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(slot = %slot_id, error = %e, "Reader stopped on port error");
                            let reason = e.to_string();
                            if let Err(e) = publisher.publish(DomainEvent::reader_stopped(slot_id, reason.clone())).await {
                                warn!("Failed to publish reader stop: {}", e);
                            }
                            if let Some(hook) = on_failure.take() {
                                hook(reason);
                            }
                            break;
                        }
                    },
                }
            }
        });

        Self {
            slot_id,
            token,
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> ReaderState {
        if self.token.is_cancelled() {
            ReaderState::Cancelled
        } else if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            ReaderState::Running
        } else {
            ReaderState::Idle
        }
    }

    /// Stop the loop and wait for it. The pending read future is dropped,
    /// never left running.
    pub async fn cancel(&mut self) {
        self.token.cancel();
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match tokio::time::timeout(CANCEL_BOUND, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => warn!(slot = %self.slot_id, "Reader task failed: {}", e),
            Err(_) => {
                warn!(slot = %self.slot_id, "Reader did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
