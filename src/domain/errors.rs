//! Error taxonomy for the realtime client.

use std::time::Duration;
use thiserror::Error;

use super::message::MessageId;
use crate::config::ValidationError;
use crate::ports::transport::TransportError;

/// Errors surfaced to application code.
///
/// Transport failures are recovered locally up to the configured reconnect
/// budget; only exhaustion, timeouts, and misuse reach the caller.
#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    /// A transport-level failure that local recovery could not absorb.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Every permitted connection attempt failed.
    #[error("gave up connecting after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// No acknowledgment arrived within the deadline. The pending entry is
    /// removed, so a late ack is dropped rather than treated as an error.
    #[error("no acknowledgment for message '{id}' within {timeout:?}")]
    AckTimeout { id: MessageId, timeout: Duration },

    /// A wait is already registered for this message id.
    #[error("an acknowledgment wait is already registered for message '{0}'")]
    DuplicateAckWait(MessageId),

    /// The operation requires a live connection.
    #[error("not connected")]
    NotConnected,

    /// `connect()` was called while a connection is established or being
    /// established.
    #[error("connection is already established or in progress")]
    AlreadyConnected,

    /// The connection was closed before the operation completed.
    #[error("connection closed before the operation completed")]
    Closed,

    /// The payload could not be encoded as JSON.
    #[error("failed to encode payload: {0}")]
    Payload(String),

    /// The supplied configuration failed semantic validation.
    #[error(transparent)]
    Config(#[from] ValidationError),
}

impl RealtimeError {
    /// Creates an ack-timeout error.
    pub fn ack_timeout(id: MessageId, timeout: Duration) -> Self {
        RealtimeError::AckTimeout { id, timeout }
    }

    /// True when the error is a terminal connection failure (the status is
    /// `Error` and a fresh `connect()` is required).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RealtimeError::RetriesExhausted { .. })
    }
}
