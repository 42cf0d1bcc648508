//! Transport port - the boundary to the underlying bidirectional connection.
//!
//! The client does not assume a specific wire protocol beyond frames that
//! serialize to the [`RealtimeMessage`] shape. An implementation owns the
//! socket (or in tests, a channel pair) and exposes each established
//! connection as a [`TransportLink`]: an outbound frame sender plus an
//! inbound event stream. Encoding and decoding happen behind this boundary.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::RealtimeMessage;

/// Errors raised at the transport boundary.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or refused the handshake.
    #[error("failed to reach '{url}': {reason}")]
    ConnectFailed { url: String, reason: String },

    /// Credentials could not be obtained or attached.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The link went away.
    #[error("connection closed: {reason}")]
    Closed { reason: String },
}

/// Events emitted by an established link.
#[derive(Debug)]
pub enum TransportEvent {
    /// A decoded inbound frame.
    Message(RealtimeMessage),

    /// The peer closed the connection, or the socket failed. The link emits
    /// nothing after this.
    Closed { reason: Option<String> },
}

/// A live bidirectional link produced by [`Transport::connect`].
///
/// Frames handed to `outbound` are encoded and written to the wire in order.
/// `inbound` yields decoded frames and ends with a [`TransportEvent::Closed`]
/// (or closes silently if the implementation's pump task is dropped).
pub struct TransportLink {
    pub outbound: mpsc::Sender<RealtimeMessage>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Port for establishing connections.
///
/// Implementations must be cheap to call repeatedly: the connection manager
/// calls `connect` once per attempt, including every reconnect attempt.
///
/// # Example
///
/// ```ignore
/// let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new());
/// let link = transport.connect("wss://rt.example.com/socket", token).await?;
/// link.outbound.send(RealtimeMessage::ping()).await?;
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a new link. `token` carries resolved bearer credentials
    /// when the caller configured authentication.
    async fn connect(
        &self,
        url: &str,
        token: Option<String>,
    ) -> Result<TransportLink, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that the trait is object-safe
    #[allow(dead_code)]
    fn assert_transport_object_safe(_: &dyn Transport) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn transport_is_send_sync() {
        fn check<T: Transport>() {
            assert_send_sync::<T>();
        }
    }

    #[test]
    fn connect_failed_displays_url_and_reason() {
        let err = TransportError::ConnectFailed {
            url: "ws://localhost:9".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to reach 'ws://localhost:9': connection refused"
        );
    }
}
