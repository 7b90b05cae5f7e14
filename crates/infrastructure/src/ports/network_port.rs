use async_trait::async_trait;
use domain::DomainError;
use domain::transport::{Port, TransportKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Raw TCP printer port (usually 9100)
pub struct NetworkPort {
    address: String,
    connect_timeout: Duration,
    read_window: Duration,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    open: AtomicBool,
}

impl NetworkPort {
    pub fn new(address: impl Into<String>, connect_timeout: Duration, read_window: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            read_window,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn invalidate(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.writer.lock().await.take();
    }
}

#[async_trait]
impl Port for NetworkPort {
    async fn open(&self) -> Result<(), DomainError> {
        info!(address = %self.address, "Connecting to network printer");
        let stream = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(&self.address),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(DomainError::ConnError(format!("{}: {}", self.address, e))),
            Err(_) => {
                return Err(DomainError::ConnError(format!(
                    "{}: connection timed out",
                    self.address
                )));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        self.open.store(true, Ordering::SeqCst);
        info!(address = %self.address, "Network printer connected");
        Ok(())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| DomainError::IoError("port not open".to_string()))?;

        let result = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            error!(address = %self.address, error = %e, "Failed to write to printer");
            drop(guard);
            self.invalidate().await;
            return Err(DomainError::IoError(e.to_string()));
        }
        Ok(())
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        let mut guard = self.reader.lock().await;
        let reader = guard
            .as_mut()
            .ok_or_else(|| DomainError::IoError("port not open".to_string()))?;

        let mut buffer = vec![0u8; 1024];
        match tokio::time::timeout(self.read_window, reader.read(&mut buffer)).await {
            Ok(Ok(0)) => Err(DomainError::IoError(
                "connection closed by printer".to_string(),
            )),
            Ok(Ok(n)) => {
                buffer.truncate(n);
                Ok(Some(buffer))
            }
            Ok(Err(e)) => Err(DomainError::IoError(e.to_string())),
            Err(_) => Ok(None),
        }
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.reader.lock().await.take();
        debug!(address = %self.address, "Network port closed");
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Ethernet
    }
}
