//! Application layer - Serial execution, slot management and the print bridge

pub mod bridge;
pub mod device;
pub mod queue;

pub use bridge::{BridgeDefaults, ConnectRequest, PlatformEvent, PrintBridge, PrintMode};
pub use device::{ConnectionFactory, Reader, ReaderState};
pub use queue::SerialQueue;
