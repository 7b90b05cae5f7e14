use async_trait::async_trait;
use domain::DomainError;
use domain::transport::{Port, TransportKind};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncWriteExt, Interest};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// USB printer-class device (e.g. `/dev/usb/lp0`).
///
/// Reads and writes use separate handles so a pending status read never
/// holds up a print. The read handle is non-blocking and polled through
/// the reactor, so dropping a read future abandons it without leaving a
/// thread parked in `read(2)`. Devices that refuse a pollable read handle
/// are write-only.
pub struct UsbPort {
    path: PathBuf,
    read_window: Duration,
    reader: Mutex<Option<AsyncFd<std::fs::File>>>,
    writer: Mutex<Option<File>>,
    open: AtomicBool,
}

impl UsbPort {
    pub fn new(path: &str, read_window: Duration) -> Self {
        Self {
            path: PathBuf::from(path),
            read_window,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }
}

fn map_open_error(path: &Path, e: std::io::Error) -> DomainError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            DomainError::NoPermission(format!("{:?}: {}", path, e))
        }
        _ => DomainError::ConnError(format!("{:?}: {}", path, e)),
    }
}

/// Non-blocking read handle registered with the reactor
fn open_status_reader(path: &Path) -> std::io::Result<AsyncFd<std::fs::File>> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)?;
    AsyncFd::with_interest(file, Interest::READABLE)
}

#[async_trait]
impl Port for UsbPort {
    async fn open(&self) -> Result<(), DomainError> {
        info!("Opening USB printer device {:?}", self.path);
        let writer = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open USB printer {:?}: {}", self.path, e);
                map_open_error(&self.path, e)
            })?;

        // Regular files cannot be polled and land here as write-only too
        let reader = match open_status_reader(&self.path) {
            Ok(fd) => Some(fd),
            Err(e) => {
                debug!("USB printer {:?} is write-only: {}", self.path, e);
                None
            }
        };

        *self.writer.lock().await = Some(writer);
        *self.reader.lock().await = reader;
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        let mut guard = self.writer.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| DomainError::IoError("port not open".to_string()))?;

        if let Err(e) = file.write_all(bytes).await {
            error!("Failed to write to USB printer {:?}: {}", self.path, e);
            return Err(DomainError::IoError(e.to_string()));
        }
        file.flush().await?;
        Ok(())
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        if !self.is_open() {
            return Err(DomainError::IoError("port not open".to_string()));
        }

        let guard = self.reader.lock().await;
        let Some(fd) = guard.as_ref() else {
            // Write-only device: nothing will ever arrive
            drop(guard);
            tokio::time::sleep(self.read_window).await;
            return Ok(None);
        };

        let mut buffer = vec![0u8; 64];
        let pending = async {
            loop {
                let mut ready = fd.readable().await?;
                match ready.try_io(|inner| inner.get_ref().read(&mut buffer)) {
                    Ok(result) => return result,
                    Err(_would_block) => continue,
                }
            }
        };

        match tokio::time::timeout(self.read_window, pending).await {
            Ok(Ok(0)) => {
                // Printer-class devices report EOF when no status is pending
                drop(guard);
                tokio::time::sleep(self.read_window).await;
                Ok(None)
            }
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
        if let Some(mut file) = self.writer.lock().await.take() {
            let _ = file.flush().await;
        }
        self.reader.lock().await.take();
        debug!("USB printer {:?} closed", self.path);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Usb
    }
}
