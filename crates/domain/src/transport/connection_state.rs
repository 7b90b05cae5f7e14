use serde::{Deserialize, Serialize};

/// Connection state of a device slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No open port
    #[default]
    Disconnected,
    /// Port open in progress on the queue worker
    Connecting,
    /// Port open and reader running
    Connected,
}

impl ConnectionState {
    /// Check if state allows a connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    /// Integer code published to state subscribers (0 = down, 1 = up).
    /// `Connecting` is reported as down until the open completes.
    pub fn code(&self) -> i32 {
        match self {
            Self::Connected => 1,
            Self::Disconnected | Self::Connecting => 0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(state.can_connect());
        assert!(!state.is_connected());
    }

    #[test]
    fn test_transition_disconnected_to_connecting() {
        let state = ConnectionState::Disconnected;
        let next = state.to_connecting().unwrap();
        assert_eq!(next, ConnectionState::Connecting);
        assert!(next.is_transitioning());
    }

    #[test]
    fn test_transition_connecting_to_connected() {
        let state = ConnectionState::Connecting;
        let next = state.to_connected().unwrap();
        assert_eq!(next, ConnectionState::Connected);
        assert!(next.is_connected());
    }

    #[test]
    fn test_cannot_connect_from_connected() {
        assert!(ConnectionState::Connected.to_connecting().is_err());
        assert!(ConnectionState::Connecting.to_connecting().is_err());
    }

    #[test]
    fn test_cannot_complete_without_connecting() {
        assert!(ConnectionState::Disconnected.to_connected().is_err());
    }

    #[test]
    fn test_to_disconnected_from_any_state() {
        assert_eq!(
            ConnectionState::Connected.to_disconnected(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::Connecting.to_disconnected(),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(ConnectionState::Disconnected.code(), 0);
        assert_eq!(ConnectionState::Connecting.code(), 0);
        assert_eq!(ConnectionState::Connected.code(), 1);
    }
}
