use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;

/// Printer command language spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ESC/POS receipt printers
    #[default]
    Esc,
    /// TSC / TSPL label printers
    Tsc,
    /// CPCL mobile printers
    Cpcl,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esc => "esc",
            Self::Tsc => "tsc",
            Self::Cpcl => "cpcl",
        }
    }
}

impl FromStr for Dialect {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esc" | "escpos" | "esc/pos" => Ok(Self::Esc),
            "tsc" | "tspl" => Ok(Self::Tsc),
            "cpcl" => Ok(Self::Cpcl),
            other => Err(DomainError::InvalidArgument(format!(
                "Unknown dialect: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
