mod bluetooth_port;
mod mock_port;
mod network_port;
mod usb_port;

pub use bluetooth_port::BluetoothPort;
pub use mock_port::{MockPort, MockPortFactory, MockPortHandle, PortCall, PortLog};
pub use network_port::NetworkPort;
pub use usb_port::UsbPort;

use crate::config::{RfcommBinding, TransportSettings};
use domain::DomainError;
use domain::transport::{Port, PortFactory, TransportKind};
use std::time::Duration;
use tracing::debug;

/// Timing and addressing knobs shared by the real ports
#[derive(Debug, Clone)]
pub struct PortSettings {
    pub connect_timeout: Duration,
    pub read_window: Duration,
    pub default_tcp_port: u16,
    pub baud_rate: u32,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub bluetooth_bindings: Vec<RfcommBinding>,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self::from(&TransportSettings::default())
    }
}

impl From<&TransportSettings> for PortSettings {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            read_window: Duration::from_millis(settings.read_timeout_ms.max(1)),
            default_tcp_port: settings.default_tcp_port,
            baud_rate: settings.baud_rate,
            chunk_size: settings.chunk_size,
            chunk_delay: Duration::from_millis(settings.chunk_delay_ms),
            bluetooth_bindings: settings.bluetooth_bindings.clone(),
        }
    }
}

fn is_mac_address(address: &str) -> bool {
    let parts: Vec<&str> = address.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Factory for the physical transports
pub struct DefaultPortFactory {
    settings: PortSettings,
}

impl DefaultPortFactory {
    pub fn new(settings: PortSettings) -> Self {
        Self { settings }
    }

    /// RFCOMM device for a Bluetooth address: a device path is taken as is,
    /// a MAC must have a configured binding.
    pub fn resolve_rfcomm(&self, address: &str) -> Result<String, DomainError> {
        if address.starts_with('/') {
            return Ok(address.to_string());
        }
        if !is_mac_address(address) {
            return Err(DomainError::InvalidArgument(format!(
                "Invalid Bluetooth address: {}",
                address
            )));
        }
        self.settings
            .bluetooth_bindings
            .iter()
            .find(|b| b.address.eq_ignore_ascii_case(address))
            .map(|b| b.device.clone())
            .ok_or_else(|| {
                DomainError::ConnError(format!("No RFCOMM device bound to {}", address))
            })
    }

    /// `host` or `host:port`; the default printer port is appended when missing
    pub fn resolve_tcp(&self, address: &str) -> Result<String, DomainError> {
        let invalid = || DomainError::InvalidArgument(format!("Invalid network address: {}", address));

        if address.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        if let Some(rest) = address.strip_prefix('[') {
            // [v6]:port or [v6]
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            if host.is_empty() {
                return Err(invalid());
            }
            return match tail.strip_prefix(':') {
                Some(port) => {
                    port.parse::<u16>().map_err(|_| invalid())?;
                    Ok(address.to_string())
                }
                None if tail.is_empty() => {
                    Ok(format!("[{}]:{}", host, self.settings.default_tcp_port))
                }
                None => Err(invalid()),
            };
        }

        match address.matches(':').count() {
            0 => Ok(format!("{}:{}", address, self.settings.default_tcp_port)),
            1 => {
                let (host, port) = address.split_once(':').ok_or_else(invalid)?;
                if host.is_empty() || port.parse::<u16>().is_err() {
                    return Err(invalid());
                }
                Ok(address.to_string())
            }
            // Bare IPv6 literal
            _ => Ok(format!("[{}]:{}", address, self.settings.default_tcp_port)),
        }
    }
}

impl PortFactory for DefaultPortFactory {
    fn create_port(
        &self,
        kind: TransportKind,
        address: &str,
    ) -> Result<Box<dyn Port>, DomainError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(DomainError::InvalidArgument("address missing".to_string()));
        }
        debug!(kind = %kind, address, "Creating port");

        match kind {
            TransportKind::Bluetooth => {
                let device = self.resolve_rfcomm(address)?;
                Ok(Box::new(BluetoothPort::new(
                    address,
                    device,
                    self.settings.baud_rate,
                    self.settings.read_window,
                    self.settings.chunk_size,
                    self.settings.chunk_delay,
                )) as Box<dyn Port>)
            }
            TransportKind::Usb => {
                if !address.starts_with('/') {
                    return Err(DomainError::InvalidArgument(format!(
                        "USB address must be a device path: {}",
                        address
                    )));
                }
                Ok(Box::new(UsbPort::new(address, self.settings.read_window)) as Box<dyn Port>)
            }
            TransportKind::Ethernet => {
                let target = self.resolve_tcp(address)?;
                Ok(Box::new(NetworkPort::new(
                    target,
                    self.settings.connect_timeout,
                    self.settings.read_window,
                )) as Box<dyn Port>)
            }
        }
    }
}
