//! In-memory transport implementation for testing.
//!
//! Provides deterministic connections without sockets: every established
//! link hands the test a [`MemoryPeer`] playing the server side, and
//! connect attempts can be scripted to fail to exercise the reconnect
//! path. Frames cross the boundary untouched; JSON encoding is a concern
//! of the wire adapters, not of this one.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::RealtimeMessage;
use crate::ports::transport::{Transport, TransportError, TransportEvent, TransportLink};

const CHANNEL_CAPACITY: usize = 64;

/// Server side of one established in-memory link.
pub struct MemoryPeer {
    to_client: mpsc::Sender<TransportEvent>,
    from_client: mpsc::Receiver<RealtimeMessage>,
    token: Option<String>,
}

impl MemoryPeer {
    /// Deliver a frame to the client.
    pub async fn send(&self, message: RealtimeMessage) {
        let _ = self
            .to_client
            .send(TransportEvent::Message(message))
            .await;
    }

    /// Close the link from the server side.
    pub async fn close(&self, reason: Option<String>) {
        let _ = self.to_client.send(TransportEvent::Closed { reason }).await;
    }

    /// Next frame the client wrote, or `None` once the client dropped the
    /// link.
    pub async fn recv(&mut self) -> Option<RealtimeMessage> {
        self.from_client.recv().await
    }

    /// Bearer token the client presented during the handshake.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

struct MemoryState {
    fail_budget: u32,
    connect_attempts: u32,
    peer_tx: mpsc::UnboundedSender<MemoryPeer>,
}

/// In-memory [`Transport`] with scriptable connect failures.
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    /// Create a transport plus the stream of server-side peers, one per
    /// established link (reconnects included).
    pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let transport = std::sync::Arc::new(Self {
            state: Mutex::new(MemoryState {
                fail_budget: 0,
                connect_attempts: 0,
                peer_tx,
            }),
        });
        (transport, peer_rx)
    }

    /// Make the next `count` connect attempts fail with a refused error.
    /// Use `u32::MAX` for a transport that never connects.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().fail_budget = count;
    }

    /// Total connect attempts observed, successful or not.
    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().connect_attempts
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(
        &self,
        url: &str,
        token: Option<String>,
    ) -> Result<TransportLink, TransportError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        if state.fail_budget > 0 {
            state.fail_budget = state.fail_budget.saturating_sub(1);
            return Err(TransportError::ConnectFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let peer = MemoryPeer {
            to_client: event_tx,
            from_client: outbound_rx,
            token,
        };
        // the test may not be holding the receiver; that is fine
        let _ = state.peer_tx.send(peer);

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frames_cross_the_link_in_both_directions() {
        let (transport, mut peers) = MemoryTransport::new();
        let mut link = transport.connect("ws://test", None).await.unwrap();
        let mut peer = peers.recv().await.unwrap();

        link.outbound
            .send(RealtimeMessage::event("chat", json!({ "text": "up" })))
            .await
            .unwrap();
        assert_eq!(peer.recv().await.unwrap().topic(), Some("chat"));

        peer.send(RealtimeMessage::event("chat", json!({ "text": "down" })))
            .await;
        match link.inbound.recv().await.unwrap() {
            TransportEvent::Message(msg) => assert_eq!(msg.topic(), Some("chat")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let (transport, mut peers) = MemoryTransport::new();
        transport.fail_next(2);

        assert!(transport.connect("ws://test", None).await.is_err());
        assert!(transport.connect("ws://test", None).await.is_err());
        assert!(transport.connect("ws://test", None).await.is_ok());
        assert_eq!(transport.connect_attempts(), 3);
        assert!(peers.recv().await.is_some());
    }

    #[tokio::test]
    async fn peer_records_the_presented_token() {
        let (transport, mut peers) = MemoryTransport::new();
        let _link = transport
            .connect("ws://test", Some("tok-1".to_string()))
            .await
            .unwrap();
        let peer = peers.recv().await.unwrap();
        assert_eq!(peer.token(), Some("tok-1"));
    }

    #[tokio::test]
    async fn close_surfaces_as_a_closed_event() {
        let (transport, mut peers) = MemoryTransport::new();
        let mut link = transport.connect("ws://test", None).await.unwrap();
        let peer = peers.recv().await.unwrap();

        peer.close(Some("bye".to_string())).await;
        match link.inbound.recv().await.unwrap() {
            TransportEvent::Closed { reason } => assert_eq!(reason.as_deref(), Some("bye")),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
