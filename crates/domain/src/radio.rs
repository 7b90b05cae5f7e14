use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Radio power state as reported by the host adapter.
/// Codes follow the host platform's adapter constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterState {
    Off,
    TurningOn,
    On,
    TurningOff,
}

impl AdapterState {
    pub fn code(&self) -> i32 {
        match self {
            Self::Off => 10,
            Self::TurningOn => 11,
            Self::On => 12,
            Self::TurningOff => 13,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            10 => Some(Self::Off),
            11 => Some(Self::TurningOn),
            12 => Some(Self::On),
            13 => Some(Self::TurningOff),
            _ => None,
        }
    }
}

/// Host-side radio collaborator. The core only asks questions, it never
/// drives the radio.
#[cfg_attr(test, mockall::automock)]
pub trait RadioAdapter: Send + Sync {
    /// Radio hardware present
    fn is_available(&self) -> bool;

    /// Host granted the access the bridge needs
    fn has_permission(&self) -> bool;

    /// Current power state
    fn state(&self) -> AdapterState;

    /// Radio powered on
    fn is_enabled(&self) -> bool {
        self.state() == AdapterState::On
    }
}

/// Gate used before any connect: hardware first, then permission.
pub fn ensure_ready(adapter: &dyn RadioAdapter) -> Result<()> {
    if !adapter.is_available() {
        return Err(DomainError::NotAvailable(
            "Bluetooth not available".to_string(),
        ));
    }
    if !adapter.has_permission() {
        return Err(DomainError::NoPermission(
            "Bluetooth permission denied".to_string(),
        ));
    }
    Ok(())
}
