use dashmap::DashMap;
use domain::event::EventPublisher;
use domain::printer::CommandEncoder;
use domain::{
    ConnectionState, Dialect, DomainError, DomainEvent, Port, PortFactory, SlotConfig, SlotId,
    TransportKind,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::reader::Reader;
use crate::queue::SerialQueue;

/// Registered configuration, readable without touching the I/O state
#[derive(Clone)]
struct SlotEntry {
    config: SlotConfig,
    encoder: Arc<dyn CommandEncoder>,
}

/// Live resources of a slot. Only touched from queue tasks.
#[derive(Default)]
struct SlotIo {
    port: Option<Arc<dyn Port>>,
    reader: Option<Reader>,
    /// Incremented on every successful open
    generation: u64,
}

/// Single owner of every device slot and its port, reader and state.
///
/// The async operations are meant to run on the [`SerialQueue`]; the
/// state snapshot (`get_conn_state`, `state_of`) can be read from anywhere
/// and is never torn, only possibly stale.
pub struct ConnectionFactory {
    port_factory: Arc<dyn PortFactory>,
    publisher: Arc<dyn EventPublisher>,
    queue: SerialQueue,
    entries: DashMap<SlotId, SlotEntry>,
    states: DashMap<SlotId, ConnectionState>,
    io: Mutex<HashMap<SlotId, SlotIo>>,
    me: Weak<ConnectionFactory>,
}

impl ConnectionFactory {
    pub fn new(
        port_factory: Arc<dyn PortFactory>,
        publisher: Arc<dyn EventPublisher>,
        queue: SerialQueue,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            port_factory,
            publisher,
            queue,
            entries: DashMap::new(),
            states: DashMap::new(),
            io: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    pub fn queue(&self) -> &SerialQueue {
        &self.queue
    }

    /// Register or replace a slot's configuration. Does no I/O; an open
    /// port keeps running until the next `open_port` or `close_port`.
    pub fn build(
        &self,
        id: SlotId,
        transport: TransportKind,
        address: &str,
        dialect: Dialect,
    ) -> Result<SlotId, DomainError> {
        let config = SlotConfig::new(id, transport, address.trim(), dialect)?;
        let encoder = infrastructure::encoder_for(dialect);
        debug!(slot = %id, transport = %transport, address = %config.address, dialect = %dialect, "Slot built");
        self.entries.insert(id, SlotEntry { config, encoder });
        self.states.entry(id).or_default();
        Ok(id)
    }

    pub fn slot_ids(&self) -> Vec<SlotId> {
        let mut ids: Vec<SlotId> = self.entries.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn slot_config(&self, id: SlotId) -> Option<SlotConfig> {
        self.entries.get(&id).map(|e| e.config.clone())
    }

    pub fn encoder(&self, id: SlotId) -> Option<Arc<dyn CommandEncoder>> {
        self.entries.get(&id).map(|e| e.encoder.clone())
    }

    pub fn current_dialect(&self, id: SlotId) -> Option<Dialect> {
        self.entries.get(&id).map(|e| e.config.dialect)
    }

    /// True iff the slot is connected
    pub fn get_conn_state(&self, id: SlotId) -> bool {
        self.state_of(id).is_connected()
    }

    pub fn state_of(&self, id: SlotId) -> ConnectionState {
        self.states.get(&id).map(|s| *s).unwrap_or_default()
    }

    /// Move the slot one step along Disconnected, Connecting, Connected
    async fn advance(
        &self,
        id: SlotId,
        step: fn(&ConnectionState) -> Result<ConnectionState, &'static str>,
    ) -> Result<(), DomainError> {
        let next = step(&self.state_of(id))
            .map_err(|e| DomainError::ConnError(format!("slot {}: {}", id, e)))?;
        self.set_state(id, next, None).await;
        Ok(())
    }

    /// Allowed from any state; a reason is published even without a change
    async fn mark_disconnected(&self, id: SlotId, reason: Option<String>) {
        let next = self.state_of(id).to_disconnected();
        self.set_state(id, next, reason).await;
    }

    async fn set_state(&self, id: SlotId, state: ConnectionState, reason: Option<String>) {
        let previous = self.states.insert(id, state).unwrap_or_default();
        if previous == state && reason.is_none() {
            return;
        }
        if let Err(e) = self
            .publisher
            .publish(DomainEvent::connection_state_changed(id, state, reason))
            .await
        {
            warn!("Failed to publish state change: {}", e);
        }
    }

    async fn report_failure(&self, id: SlotId, operation: &str, err: &DomainError) {
        if let Err(e) = self
            .publisher
            .publish(DomainEvent::task_failed(Some(id), operation, err.to_string()))
            .await
        {
            warn!("Failed to publish task failure: {}", e);
        }
    }

    /// Cancel the reader and close the port of a slot, if any
    async fn release(&self, id: SlotId, io: &mut SlotIo) {
        if let Some(mut reader) = io.reader.take() {
            reader.cancel().await;
        }
        if let Some(port) = io.port.take() {
            port.close().await;
            debug!(slot = %id, generation = io.generation, "Port closed");
        }
    }

    /// Open the slot's port, closing any port it already has first
    pub async fn open_port(&self, id: SlotId) -> Result<(), DomainError> {
        let entry = self
            .entries
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| DomainError::InvalidArgument(format!("slot {} not built", id)))?;

        let mut slots = self.io.lock().await;
        let io = slots.entry(id).or_default();

        let current = self.state_of(id);
        if io.port.is_some() || !current.can_connect() {
            if current.is_transitioning() {
                warn!(slot = %id, "Slot left half-open, resetting");
            } else {
                info!(slot = %id, "Closing previous port before reopening");
            }
            self.release(id, io).await;
            self.mark_disconnected(id, None).await;
        }

        self.advance(id, ConnectionState::to_connecting).await?;
        info!(
            slot = %id,
            transport = %entry.config.transport,
            address = %entry.config.address,
            "🔌 Opening port"
        );

        let port: Arc<dyn Port> = match self
            .port_factory
            .create_port(entry.config.transport, &entry.config.address)
        {
            Ok(port) => Arc::from(port),
            Err(e) => {
                error!(slot = %id, "Cannot create port: {}", e);
                self.mark_disconnected(id, Some(e.to_string())).await;
                return Err(e);
            }
        };

        if let Err(e) = port.open().await {
            error!(slot = %id, "❌ Failed to open port: {}", e);
            self.mark_disconnected(id, Some(e.to_string())).await;
            return Err(e);
        }

        io.generation += 1;
        let generation = io.generation;
        let me = self.me.clone();
        let queue = self.queue.clone();
        let reader = Reader::start(
            id,
            port.clone(),
            self.queue.child_token(),
            self.publisher.clone(),
            move |reason| {
                let submitted = queue.submit(async move {
                    if let Some(factory) = me.upgrade() {
                        factory.on_reader_stopped(id, generation, reason).await;
                    }
                });
                if submitted.is_err() {
                    debug!(slot = %id, "Queue stopped, reader failure not handled");
                }
            },
        );
        io.port = Some(port);
        io.reader = Some(reader);

        if let Err(e) = self.advance(id, ConnectionState::to_connected).await {
            self.release(id, io).await;
            self.mark_disconnected(id, Some(e.to_string())).await;
            return Err(e);
        }
        info!(slot = %id, generation, "✅ Port open");
        Ok(())
    }

    /// Reader hook: downgrade the slot unless it has been reopened since
    async fn on_reader_stopped(&self, id: SlotId, generation: u64, reason: String) {
        let mut slots = self.io.lock().await;
        let Some(io) = slots.get_mut(&id) else {
            return;
        };
        if io.generation != generation || io.port.is_none() {
            debug!(slot = %id, generation, current = io.generation, "Ignoring stale reader failure");
            return;
        }
        warn!(slot = %id, reason = %reason, "Link lost, closing port");
        self.release(id, io).await;
        self.mark_disconnected(id, Some(reason)).await;
    }

    async fn write(&self, id: SlotId, bytes: &[u8], operation: &str) -> Result<(), DomainError> {
        let port = {
            let slots = self.io.lock().await;
            slots.get(&id).and_then(|io| io.port.clone())
        };
        let Some(port) = port else {
            warn!(slot = %id, "{} on a slot without an open port", operation);
            return Err(DomainError::NotConnected(id.value()));
        };

        debug!(slot = %id, len = bytes.len(), "Writing to port");
        if let Err(e) = port.write(bytes).await {
            error!(slot = %id, "Write failed: {}", e);
            self.report_failure(id, operation, &e).await;
            return Err(e);
        }
        Ok(())
    }

    /// Write an encoded job through the slot's port
    pub async fn send_data_immediately(&self, id: SlotId, data: Vec<u8>) -> Result<(), DomainError> {
        self.write(id, &data, "send_data").await
    }

    /// Write raw bytes through the slot's port
    pub async fn send_byte_data_immediately(
        &self,
        id: SlotId,
        bytes: &[u8],
    ) -> Result<(), DomainError> {
        self.write(id, bytes, "send_byte_data").await
    }

    /// Cancel the reader, close the port and mark the slot disconnected.
    /// Idempotent.
    pub async fn close_port(&self, id: SlotId) {
        {
            let mut slots = self.io.lock().await;
            if let Some(io) = slots.get_mut(&id) {
                self.release(id, io).await;
            }
        }
        if self.entries.contains_key(&id) {
            self.mark_disconnected(id, None).await;
        }
    }

    pub async fn close_all(&self) {
        for id in self.slot_ids() {
            self.close_port(id).await;
        }
    }

    /// Close the slot and forget its configuration
    pub async fn destroy_slot(&self, id: SlotId) {
        self.close_port(id).await;
        self.io.lock().await.remove(&id);
        self.entries.remove(&id);
        self.states.remove(&id);
        debug!(slot = %id, "Slot destroyed");
    }
}
