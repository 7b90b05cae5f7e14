mod connection_state;
mod port;
mod transport_kind;

pub use connection_state::ConnectionState;
pub use port::{Port, PortFactory};
pub use transport_kind::TransportKind;
