//! Domain layer - Pure printer-bridge model with no I/O
//!
//! This crate contains:
//! - Value objects (SlotId, TransportKind, Dialect, ConnectionState)
//! - Print job descriptors (PrintConfig, ContentElement)
//! - Capability traits implemented elsewhere (Port, PortFactory, CommandEncoder,
//!   EventPublisher, RadioAdapter)
//! - Domain events
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Validation happens when values are constructed
//! - Testable in isolation

pub mod error;
pub mod event;
pub mod printer;
pub mod radio;
pub mod slot;
pub mod transport;

// Re-export commonly used types
pub use error::DomainError;
pub use event::DomainEvent;
pub use printer::{CommandEncoder, Dialect, PrintJob};
pub use slot::{SlotConfig, SlotId};
pub use transport::{ConnectionState, Port, PortFactory, TransportKind};
