//! Connection lifecycle status.

use std::fmt;

use super::state_machine::StateMachine;

/// Status of the single managed transport connection.
///
/// Exactly one value is current at any time; the connection manager
/// serializes transitions and notifies registered observers on each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection and none being attempted.
    Disconnected,

    /// A transport handshake is in flight.
    Connecting,

    /// The connection is established and the heartbeat loop is running.
    Connected,

    /// The connection was lost (or never came up) and a backoff timer is
    /// pending before the next attempt.
    Reconnecting,

    /// Retries are exhausted (or reconnection is disabled). The connection
    /// stays here until the caller explicitly connects again.
    Error,
}

impl ConnectionStatus {
    /// True while frames can be written to the transport.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// True when a fresh `connect()` call is permitted.
    pub fn can_connect(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Error)
    }

    /// Snake_case name, used for logging and status callbacks.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for ConnectionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connecting, Error)
                | (Connecting, Disconnected)
                | (Connected, Reconnecting)
                | (Connected, Disconnected)
                | (Connected, Error)
                | (Reconnecting, Connecting)
                | (Reconnecting, Disconnected)
                | (Reconnecting, Error)
                | (Error, Connecting)
                | (Error, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionStatus::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Connected, Reconnecting, Error, Disconnected],
            Connected => vec![Reconnecting, Disconnected, Error],
            Reconnecting => vec![Connecting, Disconnected, Error],
            Error => vec![Connecting, Disconnected],
        }
    }
}
