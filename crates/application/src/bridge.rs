use domain::event::EventPublisher;
use domain::radio::{AdapterState, RadioAdapter, ensure_ready};
use domain::{Dialect, DomainError, DomainEvent, PortFactory, PrintJob, SlotId, TransportKind};
use infrastructure::{BroadcastEventPublisher, CompositeEventPublisher};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::device::ConnectionFactory;
use crate::queue::SerialQueue;

/// Arguments of a connect request. Only the address is mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectRequest {
    pub address: String,
    #[serde(default)]
    pub transport: Option<TransportKind>,
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub id: Option<u32>,
}

impl ConnectRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }
}

/// Notifications the host platform forwards to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Radio power changed
    AdapterState(AdapterState),
    /// Low-level link to a remote device came up or went down
    Link { connected: bool },
}

/// Which rendering mode a print request uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintMode {
    /// The dialect's natural mode
    #[default]
    Auto,
    Receipt,
    Label,
}

/// Values used when a connect request leaves fields out
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeDefaults {
    pub slot_id: SlotId,
    pub transport: TransportKind,
    pub dialect: Dialect,
}

/// Request boundary of the print bridge.
///
/// Every hardware operation is queued; calls return as soon as the request
/// is validated and submitted. Outcomes arrive as events on `subscribe()`.
pub struct PrintBridge {
    factory: Arc<ConnectionFactory>,
    queue: SerialQueue,
    radio: Arc<dyn RadioAdapter>,
    notifier: BroadcastEventPublisher,
    publisher: Arc<dyn EventPublisher>,
    defaults: BridgeDefaults,
    active: Mutex<SlotId>,
}

impl PrintBridge {
    /// Wire the bridge. `sinks` receive every event next to the subscribers.
    pub fn new(
        port_factory: Arc<dyn PortFactory>,
        radio: Arc<dyn RadioAdapter>,
        notifier: BroadcastEventPublisher,
        sinks: Vec<Arc<dyn EventPublisher>>,
        defaults: BridgeDefaults,
    ) -> Self {
        let mut publishers: Vec<Arc<dyn EventPublisher>> = vec![Arc::new(notifier.clone())];
        publishers.extend(sinks);
        let publisher: Arc<dyn EventPublisher> =
            Arc::new(CompositeEventPublisher::new(publishers));

        let queue = SerialQueue::new();
        let factory = ConnectionFactory::new(port_factory, publisher.clone(), queue.clone());

        Self {
            factory,
            queue,
            radio,
            notifier,
            publisher,
            active: Mutex::new(defaults.slot_id),
            defaults,
        }
    }

    pub fn factory(&self) -> &Arc<ConnectionFactory> {
        &self.factory
    }

    pub fn active_slot(&self) -> SlotId {
        *self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_active(&self, id: SlotId) {
        *self.active.lock().unwrap_or_else(|p| p.into_inner()) = id;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.notifier.subscribe()
    }

    pub fn is_available(&self) -> bool {
        self.radio.is_available()
    }

    pub fn is_on(&self) -> bool {
        self.radio.is_enabled()
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.radio.state()
    }

    pub fn is_connected(&self) -> bool {
        self.factory.get_conn_state(self.active_slot())
    }

    pub fn connect(&self, request: ConnectRequest) -> Result<(), DomainError> {
        ensure_ready(self.radio.as_ref())?;

        let address = request.address.trim();
        if address.is_empty() {
            return Err(DomainError::InvalidArgument("address missing".to_string()));
        }
        let id = match request.id {
            Some(id) => SlotId::new(id)?,
            None => self.defaults.slot_id,
        };
        let transport = request.transport.unwrap_or(self.defaults.transport);
        let dialect = request.dialect.unwrap_or(self.defaults.dialect);

        self.factory.build(id, transport, address, dialect)?;

        let previous = self.active_slot();
        if previous != id {
            let factory = self.factory.clone();
            self.queue.submit(async move { factory.close_port(previous).await })?;
        }
        self.set_active(id);

        let factory = self.factory.clone();
        self.queue.submit(async move {
            if let Err(e) = factory.open_port(id).await {
                warn!(slot = %id, "Connect failed: {}", e);
            }
        })?;
        info!(slot = %id, transport = %transport, address, "Connect queued");
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), DomainError> {
        let id = self.active_slot();
        let factory = self.factory.clone();
        self.queue.submit(async move { factory.close_port(id).await })?;
        debug!(slot = %id, "Disconnect queued");
        Ok(())
    }

    /// Close everything, then stop the queue. The bridge is unusable after.
    pub fn destroy(&self) -> Result<(), DomainError> {
        let factory = self.factory.clone();
        let queue = self.queue.clone();
        self.queue.submit(async move {
            factory.close_all().await;
            queue.stop();
        })?;
        info!("Destroy queued");
        Ok(())
    }

    /// Let queued work finish and wait for the queue worker to exit
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    pub fn print(&self, config: &Value, data: &Value) -> Result<(), DomainError> {
        self.print_as(PrintMode::Auto, config, data)
    }

    /// Validate and encode now, send on the queue
    pub fn print_as(&self, mode: PrintMode, config: &Value, data: &Value) -> Result<(), DomainError> {
        let id = self.active_slot();
        if !self.factory.get_conn_state(id) {
            return Err(DomainError::NotConnected(id.value()));
        }
        let encoder = self
            .factory
            .encoder(id)
            .ok_or(DomainError::NotConnected(id.value()))?;

        let job = PrintJob::from_request(config, data)?;
        let bytes = match mode {
            PrintMode::Auto => encoder.encode_job(&job)?,
            PrintMode::Receipt => encoder.encode_receipt(&job)?,
            PrintMode::Label => encoder.encode_label(&job)?,
        };
        debug!(slot = %id, dialect = %encoder.dialect(), len = bytes.len(), "Print job encoded");

        let factory = self.factory.clone();
        self.queue.submit(async move {
            if let Err(e) = factory.send_data_immediately(id, bytes).await {
                warn!(slot = %id, "Print failed: {}", e);
            }
        })
    }

    pub fn print_test(&self) -> Result<(), DomainError> {
        let id = self.active_slot();
        if !self.factory.get_conn_state(id) {
            return Err(DomainError::NotConnected(id.value()));
        }
        let encoder = self
            .factory
            .encoder(id)
            .ok_or(DomainError::NotConnected(id.value()))?;
        let bytes = encoder.encode_self_test();

        let factory = self.factory.clone();
        self.queue.submit(async move {
            if let Err(e) = factory.send_byte_data_immediately(id, &bytes).await {
                warn!(slot = %id, "Self-test failed: {}", e);
            }
        })
    }

    /// Relay a host notification. Radio off and link loss close every slot
    /// so the reported state follows the hardware.
    pub async fn on_platform_event(&self, event: PlatformEvent) -> Result<(), DomainError> {
        let (domain_event, link_down) = match event {
            PlatformEvent::AdapterState(state) => {
                info!(code = state.code(), "Adapter state changed");
                (
                    DomainEvent::adapter_state_changed(state),
                    state == AdapterState::Off,
                )
            }
            PlatformEvent::Link { connected } => {
                info!(connected, "Link state changed");
                (DomainEvent::link_state_changed(connected), !connected)
            }
        };

        if let Err(e) = self.publisher.publish(domain_event).await {
            warn!("Failed to publish platform event: {}", e);
        }

        if link_down {
            let factory = self.factory.clone();
            self.queue.submit(async move { factory.close_all().await })?;
        }
        Ok(())
    }
}
