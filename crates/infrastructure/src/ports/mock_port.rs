//! In-memory ports for tests and dry runs.
//!
//! Every port created by a [`MockPortFactory`] records its calls into one
//! shared [`PortLog`], indexed by creation order. Inbound frames and faults
//! are scripted through a [`MockPortHandle`].

use async_trait::async_trait;
use domain::DomainError;
use domain::transport::{Port, PortFactory, TransportKind};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// One observable interaction with a mock port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Open { port: usize },
    Write { port: usize, bytes: Vec<u8> },
    Close { port: usize },
}

/// Shared, ordered record of calls across all mock ports
#[derive(Debug, Clone, Default)]
pub struct PortLog {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PortLog {
    fn record(&self, call: PortCall) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<PortCall> {
        lock(&self.calls).clone()
    }

    /// Payloads written to one port, in order
    pub fn writes_to(&self, port: usize) -> Vec<Vec<u8>> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                PortCall::Write { port: p, bytes } if *p == port => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every byte written to any port, concatenated
    pub fn written_bytes(&self) -> Vec<u8> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                PortCall::Write { bytes, .. } => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn close_count(&self, port: usize) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, PortCall::Close { port: p } if *p == port))
            .count()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

#[derive(Default)]
struct Script {
    inbound: VecDeque<Result<Vec<u8>, DomainError>>,
    fail_writes: bool,
}

/// Test-side control over a mock port
#[derive(Clone)]
pub struct MockPortHandle {
    index: usize,
    script: Arc<Mutex<Script>>,
    notify: Arc<Notify>,
    open: Arc<AtomicBool>,
}

impl MockPortHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Queue bytes for the next `read`
    pub fn push_frame(&self, bytes: impl Into<Vec<u8>>) {
        lock(&self.script).inbound.push_back(Ok(bytes.into()));
        self.notify.notify_one();
    }

    /// Make the next `read` fail, as if the link dropped
    pub fn push_error(&self, reason: &str) {
        lock(&self.script)
            .inbound
            .push_back(Err(DomainError::IoError(reason.to_string())));
        self.notify.notify_one();
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.script).fail_writes = fail;
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub struct MockPort {
    index: usize,
    kind: TransportKind,
    read_window: Duration,
    open_delay: Duration,
    open_error: Option<DomainError>,
    log: PortLog,
    script: Arc<Mutex<Script>>,
    notify: Arc<Notify>,
    open: Arc<AtomicBool>,
}

impl MockPort {
    fn pop_inbound(&self) -> Option<Result<Vec<u8>, DomainError>> {
        lock(&self.script).inbound.pop_front()
    }
}

#[async_trait]
impl Port for MockPort {
    async fn open(&self) -> Result<(), DomainError> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.log.record(PortCall::Open { port: self.index });
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::IoError("port not open".to_string()));
        }
        if lock(&self.script).fail_writes {
            return Err(DomainError::IoError("write refused".to_string()));
        }
        self.log.record(PortCall::Write {
            port: self.index,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        if !self.is_open() {
            return Err(DomainError::IoError("port not open".to_string()));
        }
        if let Some(item) = self.pop_inbound() {
            return item.map(Some);
        }
        let _ = tokio::time::timeout(self.read_window, self.notify.notified()).await;
        match self.pop_inbound() {
            Some(item) => item.map(Some),
            None => Ok(None),
        }
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.log.record(PortCall::Close { port: self.index });
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}

#[derive(Default)]
struct FactoryState {
    handles: Vec<MockPortHandle>,
    addresses: Vec<String>,
    open_failures: VecDeque<DomainError>,
    open_delay: Duration,
}

/// Creates [`MockPort`]s and keeps a handle to each of them
#[derive(Clone)]
pub struct MockPortFactory {
    log: PortLog,
    read_window: Duration,
    state: Arc<Mutex<FactoryState>>,
}

impl Default for MockPortFactory {
    fn default() -> Self {
        Self::new(Duration::from_millis(20))
    }
}

impl MockPortFactory {
    pub fn new(read_window: Duration) -> Self {
        Self {
            log: PortLog::default(),
            read_window,
            state: Arc::new(Mutex::new(FactoryState::default())),
        }
    }

    pub fn log(&self) -> PortLog {
        self.log.clone()
    }

    /// The next port created fails to open with `err`
    pub fn fail_next_open(&self, err: DomainError) {
        lock(&self.state).open_failures.push_back(err);
    }

    /// Delay applied to every subsequent `open`
    pub fn set_open_delay(&self, delay: Duration) {
        lock(&self.state).open_delay = delay;
    }

    pub fn handle(&self, index: usize) -> Option<MockPortHandle> {
        lock(&self.state).handles.get(index).cloned()
    }

    pub fn last_handle(&self) -> Option<MockPortHandle> {
        lock(&self.state).handles.last().cloned()
    }

    pub fn ports_created(&self) -> usize {
        lock(&self.state).handles.len()
    }

    /// Address each port was created for, by index
    pub fn addresses(&self) -> Vec<String> {
        lock(&self.state).addresses.clone()
    }
}

impl PortFactory for MockPortFactory {
    fn create_port(
        &self,
        kind: TransportKind,
        address: &str,
    ) -> Result<Box<dyn Port>, DomainError> {
        let mut state = lock(&self.state);
        let index = state.handles.len();
        let handle = MockPortHandle {
            index,
            script: Arc::new(Mutex::new(Script::default())),
            notify: Arc::new(Notify::new()),
            open: Arc::new(AtomicBool::new(false)),
        };
        let port = MockPort {
            index,
            kind,
            read_window: self.read_window,
            open_delay: state.open_delay,
            open_error: state.open_failures.pop_front(),
            log: self.log.clone(),
            script: handle.script.clone(),
            notify: handle.notify.clone(),
            open: handle.open.clone(),
        };
        state.handles.push(handle);
        state.addresses.push(address.to_string());
        debug!(index, kind = %kind, address, "Created mock port");
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_port_records_calls() {
        let factory = MockPortFactory::default();
        let port = factory
            .create_port(TransportKind::Bluetooth, "00:11:22:33:44:55")
            .unwrap();

        port.open().await.unwrap();
        port.write(&[0x1B, 0x40]).await.unwrap();
        port.close().await;

        assert_eq!(
            factory.log().calls(),
            vec![
                PortCall::Open { port: 0 },
                PortCall::Write {
                    port: 0,
                    bytes: vec![0x1B, 0x40]
                },
                PortCall::Close { port: 0 },
            ]
        );
        assert_eq!(factory.addresses(), vec!["00:11:22:33:44:55".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_reads() {
        let factory = MockPortFactory::new(Duration::from_millis(10));
        let port = factory.create_port(TransportKind::Usb, "/dev/usb/lp0").unwrap();
        let handle = factory.handle(0).unwrap();
        port.open().await.unwrap();

        assert_eq!(port.read().await.unwrap(), None);
        handle.push_frame(vec![0x12]);
        assert_eq!(port.read().await.unwrap(), Some(vec![0x12]));
        handle.push_error("link lost");
        assert!(port.read().await.is_err());
    }

    #[tokio::test]
    async fn test_fail_next_open_only_once() {
        let factory = MockPortFactory::default();
        factory.fail_next_open(DomainError::ConnError("busy".into()));

        let first = factory.create_port(TransportKind::Ethernet, "10.0.0.1").unwrap();
        let second = factory.create_port(TransportKind::Ethernet, "10.0.0.1").unwrap();

        assert!(first.open().await.is_err());
        assert!(!first.is_open());
        assert!(second.open().await.is_ok());
    }

    #[tokio::test]
    async fn test_write_faults() {
        let factory = MockPortFactory::default();
        let port = factory.create_port(TransportKind::Ethernet, "10.0.0.1").unwrap();
        assert!(port.write(b"x").await.is_err());

        port.open().await.unwrap();
        factory.last_handle().unwrap().fail_writes(true);
        assert!(port.write(b"x").await.is_err());
        assert!(factory.log().written_bytes().is_empty());
    }
}
