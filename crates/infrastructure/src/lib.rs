//! Infrastructure layer - Transports, encoders and host integrations

pub mod config;
pub mod encoders;
pub mod messaging;
pub mod ports;
pub mod radio;

pub use encoders::encoder_for;
pub use messaging::{BroadcastEventPublisher, CompositeEventPublisher, LoggingEventPublisher};
pub use ports::{DefaultPortFactory, MockPortFactory, PortSettings};
pub use radio::HostRadioAdapter;
