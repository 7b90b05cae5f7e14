//! Bluetooth SPP printers reached through an RFCOMM serial device.
//!
//! The printer must be paired and bound beforehand (`rfcomm bind 0 <MAC>`),
//! which exposes `/dev/rfcommN`. A MAC address is resolved to its device via
//! the configured bindings; a device path is used as is.

use async_trait::async_trait;
use domain::DomainError;
use domain::transport::{Port, TransportKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

pub struct BluetoothPort {
    address: String,
    device: String,
    baud_rate: u32,
    read_window: Duration,
    chunk_size: usize,
    chunk_delay: Duration,
    reader: Mutex<Option<ReadHalf<SerialStream>>>,
    writer: Mutex<Option<WriteHalf<SerialStream>>>,
    open: AtomicBool,
}

impl BluetoothPort {
    pub fn new(
        address: impl Into<String>,
        device: impl Into<String>,
        baud_rate: u32,
        read_window: Duration,
        chunk_size: usize,
        chunk_delay: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            device: device.into(),
            baud_rate,
            read_window,
            chunk_size: chunk_size.max(1),
            chunk_delay,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

fn map_open_error(device: &str, e: tokio_serial::Error) -> DomainError {
    match e.kind() {
        tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            DomainError::NoPermission(format!("{}: {}", device, e))
        }
        tokio_serial::ErrorKind::NoDevice => {
            DomainError::ConnError(format!("{}: device busy or missing ({})", device, e))
        }
        _ => DomainError::ConnError(format!("{}: {}", device, e)),
    }
}

#[async_trait]
impl Port for BluetoothPort {
    async fn open(&self) -> Result<(), DomainError> {
        debug!(
            address = %self.address,
            device = %self.device,
            "Opening RFCOMM device"
        );

        let stream = tokio_serial::new(&self.device, self.baud_rate)
            .timeout(self.read_window)
            .open_native_async()
            .map_err(|e| {
                warn!(device = %self.device, error = %e, "Failed to open RFCOMM device");
                map_open_error(&self.device, e)
            })?;

        let (read_half, write_half) = tokio::io::split(stream);
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        self.open.store(true, Ordering::SeqCst);
        info!(address = %self.address, device = %self.device, "Bluetooth printer connected");
        Ok(())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| DomainError::IoError("port not open".to_string()))?;

        // The radio buffer is small; feed it in chunks
        let total = bytes.chunks(self.chunk_size).count();
        for (index, chunk) in bytes.chunks(self.chunk_size).enumerate() {
            writer.write_all(chunk).await?;
            writer.flush().await?;
            if index + 1 < total && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }
        Ok(())
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        let mut guard = self.reader.lock().await;
        let reader = guard
            .as_mut()
            .ok_or_else(|| DomainError::IoError("port not open".to_string()))?;

        let mut buffer = vec![0u8; 256];
        match tokio::time::timeout(self.read_window, reader.read(&mut buffer)).await {
            Ok(Ok(0)) => Err(DomainError::IoError("RFCOMM link closed".to_string())),
            Ok(Ok(n)) => {
                buffer.truncate(n);
                Ok(Some(buffer))
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
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
        debug!(device = %self.device, "RFCOMM device closed");
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Bluetooth
    }
}
