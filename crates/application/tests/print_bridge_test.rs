use application::{BridgeDefaults, ConnectRequest, PlatformEvent, PrintBridge, PrintMode};
use async_trait::async_trait;
use domain::event::EventPublisher;
use domain::radio::{AdapterState, RadioAdapter};
use domain::{ConnectionState, Dialect, DomainError, DomainEvent, SlotId, TransportKind};
use infrastructure::ports::{MockPortFactory, PortCall};
use infrastructure::{BroadcastEventPublisher, HostRadioAdapter};
use mockall::mock;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

mock! {
    pub Radio {}
    impl RadioAdapter for Radio {
        fn is_available(&self) -> bool;
        fn has_permission(&self) -> bool;
        fn state(&self) -> AdapterState;
        fn is_enabled(&self) -> bool;
    }
}

/// Sink that remembers every event it sees
struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn listener_count(&self) -> usize {
        1
    }
}

struct Fixture {
    bridge: PrintBridge,
    ports: MockPortFactory,
    radio: Arc<HostRadioAdapter>,
    sink: Arc<RecordingPublisher>,
    events: broadcast::Receiver<DomainEvent>,
}

fn fixture(dialect: Dialect) -> Fixture {
    let ports = MockPortFactory::new(Duration::from_millis(10));
    let radio = Arc::new(HostRadioAdapter::default());
    let sink = Arc::new(RecordingPublisher::new());
    let defaults = BridgeDefaults {
        slot_id: SlotId::default(),
        transport: TransportKind::Bluetooth,
        dialect,
    };
    let bridge = PrintBridge::new(
        Arc::new(ports.clone()),
        radio.clone(),
        BroadcastEventPublisher::new(64),
        vec![sink.clone()],
        defaults,
    );
    let events = bridge.subscribe();
    Fixture {
        bridge,
        ports,
        radio,
        sink,
        events,
    }
}

async fn wait_for_state(
    events: &mut broadcast::Receiver<DomainEvent>,
    wanted: ConnectionState,
) -> Option<String> {
    timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(DomainEvent::ConnectionStateChanged { state, reason, .. }) = events.recv().await {
                if state == wanted {
                    return reason;
                }
            }
        }
    })
    .await
    .expect("state change not observed")
}

async fn connect(f: &mut Fixture) {
    f.bridge
        .connect(ConnectRequest::new("00:11:22:33:44:55"))
        .unwrap();
    wait_for_state(&mut f.events, ConnectionState::Connected).await;
    assert!(f.bridge.is_connected());
}

#[tokio::test]
async fn test_connect_print_disconnect() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    f.bridge
        .print(
            &json!({"feed_lines": 0}),
            &json!([{"type": "text", "content": "Hi"}]),
        )
        .unwrap();
    f.bridge.disconnect().unwrap();
    wait_for_state(&mut f.events, ConnectionState::Disconnected).await;
    assert!(!f.bridge.is_connected());

    let log = f.ports.log();
    let writes = log.writes_to(0);
    assert_eq!(writes.len(), 1);
    assert!(writes[0].starts_with(&[0x1B, 0x40, 0x1C, 0x26]));
    assert!(writes[0].windows(3).any(|w| w == b"Hi\n"));
    assert_eq!(log.close_count(0), 1);
    assert_eq!(f.ports.addresses(), vec!["00:11:22:33:44:55".to_string()]);
}

#[tokio::test]
async fn test_connect_returns_before_port_opens() {
    let mut f = fixture(Dialect::Esc);
    f.ports.set_open_delay(Duration::from_millis(100));

    f.bridge
        .connect(ConnectRequest::new("00:11:22:33:44:55"))
        .unwrap();
    assert!(!f.bridge.is_connected());

    wait_for_state(&mut f.events, ConnectionState::Connected).await;
    assert!(f.bridge.is_connected());
}

#[tokio::test]
async fn test_print_requires_connection() {
    let f = fixture(Dialect::Esc);
    let err = f
        .bridge
        .print(&json!({}), &json!([{"type": "text", "content": "x"}]))
        .unwrap_err();
    assert_eq!(err, DomainError::NotConnected(0));
    assert_eq!(f.bridge.print_test().unwrap_err(), DomainError::NotConnected(0));
    assert_eq!(f.ports.ports_created(), 0);
}

#[tokio::test]
async fn test_print_rejects_bad_requests_synchronously() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    let err = f.bridge.print(&json!({}), &json!("not a list")).unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));

    let err = f
        .bridge
        .print(&json!({}), &json!([{"type": "barcode", "content": "ünïcode"}]))
        .unwrap_err();
    assert!(matches!(err, DomainError::ContentError(_)));

    // ESC/POS has no label mode
    let err = f
        .bridge
        .print_as(PrintMode::Label, &json!({}), &json!([]))
        .unwrap_err();
    assert!(matches!(err, DomainError::ContentError(_)));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(f.ports.log().writes_to(0).is_empty());
}

#[tokio::test]
async fn test_print_test_uses_slot_dialect() {
    let mut f = fixture(Dialect::Tsc);
    connect(&mut f).await;

    f.bridge.print_test().unwrap();
    f.bridge.disconnect().unwrap();
    wait_for_state(&mut f.events, ConnectionState::Disconnected).await;

    assert_eq!(f.ports.log().writes_to(0), vec![b"SELFTEST\r\n".to_vec()]);
}

#[tokio::test]
async fn test_label_job_on_tsc() {
    let mut f = fixture(Dialect::Tsc);
    connect(&mut f).await;

    f.bridge
        .print(
            &json!({"width": 40, "height": 30}),
            &json!([{"type": "text", "content": "SKU-1", "x": 10, "y": 10}]),
        )
        .unwrap();
    f.bridge.disconnect().unwrap();
    wait_for_state(&mut f.events, ConnectionState::Disconnected).await;

    let written = String::from_utf8(f.ports.log().written_bytes()).unwrap();
    assert!(written.starts_with("SIZE 40 mm,30 mm\r\n"));
    assert!(written.contains("\"SKU-1\""));
    assert!(written.ends_with("PRINT 1,1\r\n"));
}

#[tokio::test]
async fn test_connect_gates_on_radio() {
    let mut radio = MockRadio::new();
    radio.expect_is_available().return_const(false);
    radio.expect_has_permission().never();
    let ports = MockPortFactory::default();
    let bridge = PrintBridge::new(
        Arc::new(ports.clone()),
        Arc::new(radio),
        BroadcastEventPublisher::default(),
        Vec::new(),
        BridgeDefaults::default(),
    );
    let err = bridge
        .connect(ConnectRequest::new("00:11:22:33:44:55"))
        .unwrap_err();
    assert!(matches!(err, DomainError::NotAvailable(_)));

    let mut radio = MockRadio::new();
    radio.expect_is_available().return_const(true);
    radio.expect_has_permission().return_const(false);
    let bridge = PrintBridge::new(
        Arc::new(ports.clone()),
        Arc::new(radio),
        BroadcastEventPublisher::default(),
        Vec::new(),
        BridgeDefaults::default(),
    );
    let err = bridge
        .connect(ConnectRequest::new("00:11:22:33:44:55"))
        .unwrap_err();
    assert!(matches!(err, DomainError::NoPermission(_)));
    assert_eq!(ports.ports_created(), 0);
}

#[tokio::test]
async fn test_connect_requires_address() {
    let f = fixture(Dialect::Esc);
    let err = f.bridge.connect(ConnectRequest::new("  ")).unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_connect_other_slot_closes_active() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    let request: ConnectRequest = serde_json::from_value(json!({
        "address": "192.168.1.50:9100",
        "transport": "ethernet",
        "id": 1
    }))
    .unwrap();
    f.bridge.connect(request).unwrap();
    wait_for_state(&mut f.events, ConnectionState::Connected).await;

    assert_eq!(f.bridge.active_slot().value(), 1);
    assert!(!f.bridge.factory().get_conn_state(SlotId::new(0).unwrap()));
    assert!(f.bridge.is_connected());

    let calls = f.ports.log().calls();
    let closed = calls.iter().position(|c| *c == PortCall::Close { port: 0 }).unwrap();
    let opened = calls.iter().position(|c| *c == PortCall::Open { port: 1 }).unwrap();
    assert!(closed < opened);
}

#[tokio::test]
async fn test_failed_connect_reports_reason() {
    let mut f = fixture(Dialect::Esc);
    f.ports
        .fail_next_open(DomainError::ConnError("device busy".to_string()));

    f.bridge
        .connect(ConnectRequest::new("00:11:22:33:44:55"))
        .unwrap();
    let reason = wait_for_state(&mut f.events, ConnectionState::Disconnected).await;
    assert!(reason.unwrap().contains("device busy"));
    assert!(!f.bridge.is_connected());
}

#[tokio::test]
async fn test_adapter_off_closes_slots() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    f.radio.set_state(AdapterState::Off);
    f.bridge
        .on_platform_event(PlatformEvent::AdapterState(AdapterState::Off))
        .await
        .unwrap();
    wait_for_state(&mut f.events, ConnectionState::Disconnected).await;

    assert!(!f.bridge.is_on());
    assert!(!f.bridge.is_connected());
    assert!(f.sink.types().contains(&"AdapterStateChanged".to_string()));
}

#[tokio::test]
async fn test_link_loss_closes_slots() {
    let mut f = fixture(Dialect::Cpcl);
    connect(&mut f).await;

    f.bridge
        .on_platform_event(PlatformEvent::Link { connected: false })
        .await
        .unwrap();
    wait_for_state(&mut f.events, ConnectionState::Disconnected).await;
    assert_eq!(f.ports.log().close_count(0), 1);
}

#[tokio::test]
async fn test_destroy_stops_the_bridge() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    f.bridge.destroy().unwrap();
    timeout(Duration::from_secs(1), f.bridge.shutdown())
        .await
        .unwrap();

    assert!(!f.bridge.is_connected());
    assert_eq!(f.ports.log().close_count(0), 1);
    let err = f.bridge.disconnect().unwrap_err();
    assert!(matches!(err, DomainError::NotAvailable(_)));
}

#[tokio::test]
async fn test_destroy_flushes_queued_print() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    // No await between the calls: both sit on the queue together
    f.bridge
        .print(&json!({}), &json!([{"type": "text", "content": "Hi"}]))
        .unwrap();
    f.bridge.destroy().unwrap();
    timeout(Duration::from_secs(1), f.bridge.shutdown())
        .await
        .unwrap();

    assert_eq!(f.ports.log().writes_to(0).len(), 1);
    assert_eq!(f.ports.log().close_count(0), 1);
    assert!(!f.bridge.is_connected());
}

#[tokio::test]
async fn test_rejected_connect_keeps_active_slot() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;

    let mut request = ConnectRequest::new("lp0");
    request.transport = Some(TransportKind::Usb);
    request.id = Some(1);
    let err = f.bridge.connect(request).unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));

    // Give a wrongly queued close the chance to run
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.bridge.active_slot(), SlotId::default());
    assert!(f.bridge.is_connected());
    assert_eq!(f.ports.log().close_count(0), 0);
}

#[tokio::test]
async fn test_write_failure_is_published() {
    let mut f = fixture(Dialect::Esc);
    connect(&mut f).await;
    f.ports.handle(0).unwrap().fail_writes(true);

    f.bridge
        .print(&json!({}), &json!([{"type": "text", "content": "x"}]))
        .unwrap();

    let failed = timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(DomainEvent::TaskFailed { operation, .. }) = f.events.recv().await {
                return operation;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(failed, "send_data");
    // Write errors leave the connection alone
    assert!(f.bridge.is_connected());
}
