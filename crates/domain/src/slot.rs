use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::printer::Dialect;
use crate::transport::TransportKind;

/// Highest slot index accepted by the registry
pub const MAX_SLOT_ID: u32 = 15;

/// Value object identifying a logical device slot
///
/// Rules:
/// - Small non-negative integer
/// - At most `MAX_SLOT_ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(u32);

impl SlotId {
    /// Create a new SlotId with validation
    pub fn new(id: u32) -> Result<Self> {
        if id > MAX_SLOT_ID {
            return Err(DomainError::InvalidArgument(format!(
                "Slot id {} out of range (max {})",
                id, MAX_SLOT_ID
            )));
        }
        Ok(Self(id))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration registered for a slot by `build`. Opening I/O is separate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub id: SlotId,
    pub transport: TransportKind,
    pub address: String,
    pub dialect: Dialect,
}

impl SlotConfig {
    pub fn new(
        id: SlotId,
        transport: TransportKind,
        address: impl Into<String>,
        dialect: Dialect,
    ) -> Result<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "address missing".to_string(),
            ));
        }
        if address.trim().chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidArgument(format!(
                "address contains whitespace: {:?}",
                address
            )));
        }
        if transport == TransportKind::Usb && !address.trim().starts_with('/') {
            return Err(DomainError::InvalidArgument(format!(
                "USB address must be a device path: {}",
                address
            )));
        }
        Ok(Self {
            id,
            transport,
            address,
            dialect,
        })
    }
}
