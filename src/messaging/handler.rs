//! Per-connection message dispatch.
//!
//! The `MessageHandler` pairs the topic listener registry with the pending
//! acknowledgment table and a slot for the live outbound channel. It does
//! not own the connection: the manager attaches it to each established
//! link and detaches it when the link goes away.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{MessageId, RealtimeError, RealtimeMessage};

use super::acks::AckTable;
use super::registry::{ListenerId, TopicListener, TopicRegistry};

/// Topic dispatch and ack correlation for a single connection.
pub struct MessageHandler {
    registry: TopicRegistry,
    acks: AckTable,
    outbound: Mutex<Option<mpsc::Sender<RealtimeMessage>>>,
}

impl MessageHandler {
    pub fn new() -> Self {
        Self {
            registry: TopicRegistry::new(),
            acks: AckTable::new(),
            outbound: Mutex::new(None),
        }
    }

    /// Bind the handler to a live link's outbound channel.
    pub(crate) fn attach(&self, sender: mpsc::Sender<RealtimeMessage>) {
        *self.outbound.lock() = Some(sender);
    }

    /// Unbind from the link and reject every outstanding ack wait — a
    /// confirmation for a frame sent on a dead link can never arrive.
    pub(crate) fn detach(&self) {
        *self.outbound.lock() = None;
        self.acks.reject_all();
    }

    /// True while the handler is bound to a live link.
    pub fn is_attached(&self) -> bool {
        self.outbound.lock().is_some()
    }

    /// Hand a frame to the transport.
    ///
    /// Delivery is not guaranteed by this call; reliability is layered on
    /// top via [`MessageHandler::wait_for_ack`].
    pub async fn send(&self, message: RealtimeMessage) -> Result<(), RealtimeError> {
        let sender = self
            .outbound
            .lock()
            .clone()
            .ok_or(RealtimeError::NotConnected)?;
        sender
            .send(message)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Inbound dispatch.
    ///
    /// Acks resolve their pending wait (late or duplicate acks are silently
    /// dropped). Frames with a topic fan out to that topic's listeners.
    /// Anything else is a no-op.
    pub fn handle_message(&self, message: RealtimeMessage) {
        if let RealtimeMessage::Ack { id, .. } = &message {
            if !self.acks.resolve(id) {
                tracing::trace!(id = %id, "late or duplicate ack dropped");
            }
            return;
        }

        if let RealtimeMessage::Error { code, message: text, .. } = &message {
            tracing::warn!(code = %code, message = %text, "server error frame");
            return;
        }

        match message.topic() {
            Some(topic) => {
                let delivered = self.registry.dispatch(&message);
                if delivered == 0 {
                    tracing::trace!(topic = %topic, "no listeners for topic, frame dropped");
                }
            }
            None => {
                tracing::trace!(kind = message.kind(), "frame without topic dropped");
            }
        }
    }

    /// Register a listener for a topic. See [`TopicRegistry::add`] for the
    /// set semantics.
    pub fn add_listener(&self, topic: &str, listener: TopicListener) -> ListenerId {
        self.registry.add(topic, listener)
    }

    /// Remove a listener. Returns true when the topic's listener set became
    /// empty and the topic entry was garbage-collected.
    pub fn remove_listener(&self, topic: &str, id: ListenerId) -> bool {
        self.registry.remove(topic, id)
    }

    /// Wait for the ack of the given message id.
    ///
    /// Fulfills when the matching ack arrives via `handle_message`, fails
    /// with [`RealtimeError::AckTimeout`] once the deadline elapses (the
    /// stale entry is removed so a late ack is harmlessly dropped), and
    /// fails with [`RealtimeError::Closed`] if the connection is torn down
    /// first.
    pub async fn wait_for_ack(
        &self,
        id: &MessageId,
        timeout: Duration,
    ) -> Result<(), RealtimeError> {
        let rx = self.register_ack(id)?;
        self.await_ack(id, rx, timeout).await
    }

    /// Register the pending entry without awaiting it. The facade registers
    /// before sending so an ack racing the send cannot be lost.
    pub(crate) fn register_ack(
        &self,
        id: &MessageId,
    ) -> Result<oneshot::Receiver<Result<(), RealtimeError>>, RealtimeError> {
        self.acks.register(id)
    }

    /// Await a previously registered pending entry.
    pub(crate) async fn await_ack(
        &self,
        id: &MessageId,
        rx: oneshot::Receiver<Result<(), RealtimeError>>,
        timeout: Duration,
    ) -> Result<(), RealtimeError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // Slot dropped without completion: the table went away with the
            // connection.
            Ok(Err(_)) => Err(RealtimeError::Closed),
            Err(_) => {
                self.acks.cancel(id);
                Err(RealtimeError::ack_timeout(id.clone(), timeout))
            }
        }
    }

    /// Drop a registered pending entry (used when the send itself failed).
    pub(crate) fn cancel_ack(&self, id: &MessageId) {
        self.acks.cancel(id);
    }

    /// Topics with at least one local listener.
    pub fn active_topics(&self) -> Vec<String> {
        self.registry.topics()
    }

    /// Number of acknowledgment waits currently in flight.
    pub fn pending_ack_count(&self) -> usize {
        self.acks.len()
    }
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}
