use config::{Config, ConfigError, Environment, File};
use domain::printer::Dialect;
use domain::transport::TransportKind;
use serde::{Deserialize, Serialize};

/// Which slot the bridge drives and how it talks to it by default
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeSettings {
    #[serde(default)]
    pub slot_id: u32,
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub transport: TransportKind,
    /// Capacity of the state event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            slot_id: 0,
            dialect: Dialect::default(),
            transport: TransportKind::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Maps a Bluetooth MAC to the RFCOMM device it is bound to
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RfcommBinding {
    pub address: String,
    pub device: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long a single read waits before reporting "no data"
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_tcp_port")]
    pub default_tcp_port: u16,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    #[serde(default)]
    pub bluetooth_bindings: Vec<RfcommBinding>,
}

fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_read_timeout_ms() -> u64 {
    500
}
fn default_tcp_port() -> u16 {
    9100
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_chunk_size() -> usize {
    4096
}
fn default_chunk_delay_ms() -> u64 {
    2
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            default_tcp_port: default_tcp_port(),
            baud_rate: default_baud_rate(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            bluetooth_bindings: Vec::new(),
        }
    }
}

/// Initial answers of the host radio adapter
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdapterSettings {
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub permitted: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            available: true,
            enabled: true,
            permitted: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub adapter: AdapterSettings,
}

impl BridgeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Base settings, required so a typo in the path fails loudly
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            // Per-environment overrides
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. BRIDGE__TRANSPORT__READ_TIMEOUT_MS=250)
            .add_source(Environment::with_prefix("BRIDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge.slot_id, 0);
        assert_eq!(config.bridge.dialect, Dialect::Esc);
        assert_eq!(config.transport.default_tcp_port, 9100);
        assert_eq!(config.transport.read_timeout_ms, 500);
        assert!(config.adapter.available);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("bridge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[bridge]
dialect = "tsc"
transport = "ethernet"

[transport]
read_timeout_ms = 250

[[transport.bluetooth_bindings]]
address = "00:11:22:33:44:55"
device = "/dev/rfcomm0"
"#
        )
        .unwrap();

        let config = BridgeConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.bridge.dialect, Dialect::Tsc);
        assert_eq!(config.bridge.transport, TransportKind::Ethernet);
        assert_eq!(config.transport.read_timeout_ms, 250);
        assert_eq!(config.transport.connect_timeout_ms, 5000);
        assert_eq!(
            config.transport.bluetooth_bindings,
            vec![RfcommBinding {
                address: "00:11:22:33:44:55".to_string(),
                device: "/dev/rfcomm0".to_string(),
            }]
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_default_file_fails() {
        let result = BridgeConfig::load("/nonexistent/bridge-config");
        assert!(result.is_err());
    }
}
