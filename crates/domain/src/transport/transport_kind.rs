use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;

/// Physical channel used to reach a printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Bluetooth,
    Usb,
    Ethernet,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Usb => "usb",
            Self::Ethernet => "ethernet",
        }
    }
}

impl FromStr for TransportKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bluetooth" | "bt" | "ble" => Ok(Self::Bluetooth),
            "usb" => Ok(Self::Usb),
            "ethernet" | "net" | "tcp" | "wifi" => Ok(Self::Ethernet),
            other => Err(DomainError::InvalidArgument(format!(
                "Unknown transport: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
