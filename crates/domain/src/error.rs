use thiserror::Error;

/// Domain-level errors shared by every layer of the bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// No radio or transport hardware present
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Access denied by the host platform
    #[error("No permission: {0}")]
    NoPermission(String),

    /// Opening the transport failed (bad address, unreachable, busy)
    #[error("Connection failed: {0}")]
    ConnError(String),

    /// Operation attempted on a slot without an open port
    #[error("Not connected: slot {0}")]
    NotConnected(u32),

    /// Missing or malformed request fields
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Print content violates the constraints of the active dialect
    #[error("Content error: {0}")]
    ContentError(String),

    /// Read or write failure on an open port
    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    /// Stable short code, used when errors cross the request boundary
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAvailable(_) => "not_available",
            Self::NoPermission(_) => "no_permission",
            Self::ConnError(_) => "conn_error",
            Self::NotConnected(_) => "not_connected",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::ContentError(_) => "content_error",
            Self::IoError(_) => "io_error",
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(DomainError::NotConnected(0).code(), "not_connected");
        assert_eq!(
            DomainError::ContentError("x".into()).code(),
            "content_error"
        );
        assert_eq!(DomainError::IoError("x".into()).code(), "io_error");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: DomainError = io.into();
        assert_eq!(err, DomainError::IoError("pipe closed".to_string()));
    }

    #[test]
    fn test_display_includes_slot() {
        assert_eq!(
            DomainError::NotConnected(3).to_string(),
            "Not connected: slot 3"
        );
    }
}
