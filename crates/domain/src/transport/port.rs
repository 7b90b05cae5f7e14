use async_trait::async_trait;

use super::transport_kind::TransportKind;
use crate::error::DomainError;

/// Byte-level handle to a printer over one physical channel.
///
/// Methods take `&self` so a reader task can block on `read` while the queue
/// worker writes; implementations keep read and write halves behind separate
/// locks.
#[async_trait]
pub trait Port: Send + Sync {
    /// Open the underlying channel. Fails with `ConnError`.
    async fn open(&self) -> Result<(), DomainError>;

    /// Write all bytes. Fails with `IoError` or `NotConnected`.
    async fn write(&self, bytes: &[u8]) -> Result<(), DomainError>;

    /// Wait up to the port's read window for inbound bytes.
    /// Returns None if nothing arrived in the window.
    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError>;

    /// Close the channel. Idempotent, safe on a port that was never opened.
    async fn close(&self);

    /// Check if the channel is currently open
    fn is_open(&self) -> bool;

    /// Transport this port speaks
    fn kind(&self) -> TransportKind;
}

/// Creates ports for a transport kind and address
pub trait PortFactory: Send + Sync {
    fn create_port(
        &self,
        kind: TransportKind,
        address: &str,
    ) -> Result<Box<dyn Port>, DomainError>;
}
