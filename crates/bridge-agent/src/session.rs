use anyhow::{Result, anyhow, bail};
use application::{ConnectRequest, PrintBridge, PrintMode};
use domain::{ConnectionState, DomainEvent, SlotId};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::job_file::JobFile;

/// One connect / print / teardown run against a bridge.
///
/// Subscribes before the first request so no state change is missed.
pub struct Session {
    bridge: PrintBridge,
    events: broadcast::Receiver<DomainEvent>,
    connect_timeout: Duration,
    failures: Vec<String>,
}

impl Session {
    pub fn new(bridge: PrintBridge, connect_timeout: Duration) -> Self {
        let events = bridge.subscribe();
        Self {
            bridge,
            events,
            connect_timeout,
            failures: Vec::new(),
        }
    }

    pub fn bridge(&self) -> &PrintBridge {
        &self.bridge
    }

    /// Queue a connect and wait for the slot to come up
    pub async fn connect(&mut self, request: ConnectRequest) -> Result<SlotId> {
        self.bridge.connect(request)?;
        let slot = self.bridge.active_slot();
        let deadline = Instant::now() + self.connect_timeout;

        loop {
            let event = match timeout_at(deadline, self.events.recv()).await {
                Ok(Ok(event)) => event,
                Ok(Err(RecvError::Lagged(n))) => {
                    warn!("Missed {} events while connecting", n);
                    continue;
                }
                Ok(Err(RecvError::Closed)) => bail!("event channel closed"),
                Err(_) => bail!("slot {} did not connect within {:?}", slot, self.connect_timeout),
            };

            if let DomainEvent::ConnectionStateChanged {
                slot_id,
                state,
                reason,
                ..
            } = event
            {
                if slot_id != slot {
                    continue;
                }
                match (state, reason) {
                    (ConnectionState::Connected, _) => {
                        info!(slot = %slot, "✅ Printer connected");
                        return Ok(slot);
                    }
                    (ConnectionState::Disconnected, Some(reason)) => {
                        return Err(anyhow!("connect failed: {}", reason));
                    }
                    (state, _) => debug!(slot = %slot, state = %state, "Connection progress"),
                }
            }
        }
    }

    pub fn print(&self, job: &JobFile, mode: PrintMode) -> Result<()> {
        self.bridge.print_as(mode, &job.config, &job.data)?;
        info!("🖨️ Print job queued");
        Ok(())
    }

    pub fn self_test(&self) -> Result<()> {
        self.bridge.print_test()?;
        info!("🖨️ Self-test queued");
        Ok(())
    }

    /// Log printer status for `window`, collecting queued-task failures
    pub async fn listen(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        while let Ok(result) = timeout_at(deadline, self.events.recv()).await {
            match result {
                Ok(event) => self.observe(event),
                Err(RecvError::Lagged(n)) => warn!("Missed {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn observe(&mut self, event: DomainEvent) {
        match event {
            DomainEvent::StatusReceived { slot_id, bytes, .. } => {
                info!(slot = %slot_id, "📥 Printer status: {:02X?}", bytes);
            }
            DomainEvent::TaskFailed {
                operation, error, ..
            } => {
                self.failures.push(format!("{}: {}", operation, error));
            }
            DomainEvent::ReaderStopped { reason, .. } => {
                self.failures.push(format!("link lost: {}", reason));
            }
            _ => {}
        }
    }

    /// Close every slot, stop the queue and report what went wrong
    /// after the caller's requests were acknowledged.
    pub async fn finish(mut self) -> Result<()> {
        self.bridge.destroy()?;
        self.bridge.shutdown().await;
        info!("🛑 Bridge stopped");

        loop {
            match self.events.try_recv() {
                Ok(event) => self.observe(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        if self.failures.is_empty() {
            Ok(())
        } else {
            bail!("{}", self.failures.join("; "))
        }
    }
}
