//! Application-facing realtime client.
//!
//! `RealtimeClient` composes a [`ConnectionManager`] and a
//! [`MessageHandler`] behind a single entry point and manages the
//! per-connection sequence numbering and subscription bookkeeping. It is an
//! explicit instance with constructor-injected collaborators: applications
//! build one per connection they want, and tests swap the transport for the
//! in-memory adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     RealtimeClient                       │
//! │   publish/subscribe · sequence numbers · subscriptions   │
//! └─────────────────────────────────────────────────────────┘
//!            │ outbound frames              │ listener registry
//!            ▼                              ▼
//! ┌─────────────────────┐        ┌─────────────────────────┐
//! │  ConnectionManager  │──────▶│     MessageHandler       │
//! │  status · heartbeat │inbound │  topic fan-out · acks    │
//! │  reconnect/backoff  │frames  └─────────────────────────┘
//! └─────────────────────┘
//!            │
//!            ▼
//!      dyn Transport (websocket, in-memory)
//! ```

pub mod subscription;

pub use subscription::Subscription;

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, DEFAULT_ACK_TIMEOUT_MS};
use crate::connection::manager::{ConnectionManager, StatusListener, StatusListenerId};
use crate::domain::{ConnectionStatus, MessageId, RealtimeError, RealtimeMessage};
use crate::messaging::{MessageHandler, TopicListener};
use crate::ports::transport::Transport;

/// Options for a single publish call.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Wait for the server to acknowledge the frame.
    pub ack_required: bool,

    /// Acknowledgment deadline; falls back to the configured
    /// `ack_timeout_ms` when unset.
    pub timeout: Option<Duration>,
}

impl PublishOptions {
    /// Fire-and-forget delivery (the default).
    pub fn fire_and_forget() -> Self {
        Self::default()
    }

    /// Acknowledged delivery with the configured default deadline.
    pub fn with_ack() -> Self {
        Self {
            ack_required: true,
            timeout: None,
        }
    }

    /// Acknowledged delivery with an explicit deadline.
    pub fn with_ack_timeout(timeout: Duration) -> Self {
        Self {
            ack_required: true,
            timeout: Some(timeout),
        }
    }
}

/// Capability to stop observing connection status changes.
pub struct StatusSubscription {
    manager: Arc<ConnectionManager>,
    id: StatusListenerId,
}

impl StatusSubscription {
    /// Remove the status listener.
    pub fn unsubscribe(self) {
        self.manager.remove_status_listener(self.id);
    }
}

/// The single application-facing entry point.
pub struct RealtimeClient {
    manager: Arc<ConnectionManager>,
    handler: Arc<MessageHandler>,
    seq: AtomicU64,
    config: Mutex<Option<ClientConfig>>,
}

impl RealtimeClient {
    /// Build a client over the given transport with a fresh handler and
    /// manager.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let handler = Arc::new(MessageHandler::new());
        let manager = ConnectionManager::new(transport, Arc::clone(&handler));
        Self::with_parts(manager, handler)
    }

    /// Build a client from pre-assembled collaborators. The manager and
    /// handler must be the pair created together, so inbound frames reach
    /// the same registry this client registers listeners in.
    pub fn with_parts(manager: Arc<ConnectionManager>, handler: Arc<MessageHandler>) -> Self {
        Self {
            manager,
            handler,
            seq: AtomicU64::new(0),
            config: Mutex::new(None),
        }
    }

    /// Establish the connection. Suspends until the handshake completes or
    /// the retry budget is exhausted.
    pub async fn connect(&self, config: ClientConfig) -> Result<(), RealtimeError> {
        config.validate()?;
        self.manager.connect(config.clone()).await?;
        *self.config.lock() = Some(config);
        // sequence numbers are per connection instance
        self.seq.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Tear the connection down. No automatic reconnection afterwards;
    /// outstanding acknowledgment waits are rejected.
    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    /// Subscribe a listener to a topic.
    ///
    /// The listener is registered locally first, then a subscribe control
    /// frame is sent to the server — fire-and-forget by default, or
    /// acknowledged when the configuration sets `subscribe_ack`. On any
    /// send failure the local registration is rolled back.
    pub async fn subscribe(
        &self,
        topic: impl Into<String>,
        listener: TopicListener,
    ) -> Result<Subscription, RealtimeError> {
        let topic = topic.into();
        let listener_id = self.handler.add_listener(&topic, listener);

        let (subscribe_ack, ack_timeout) = self.subscribe_settings();
        let announced = if subscribe_ack {
            let id = MessageId::new();
            let frame = RealtimeMessage::subscribe(topic.clone(), Some(id.clone()));
            match self.handler.register_ack(&id) {
                Ok(rx) => match self.handler.send(frame).await {
                    Ok(()) => self.handler.await_ack(&id, rx, ack_timeout).await,
                    Err(err) => {
                        self.handler.cancel_ack(&id);
                        Err(err)
                    }
                },
                Err(err) => Err(err),
            }
        } else {
            self.handler
                .send(RealtimeMessage::subscribe(topic.clone(), None))
                .await
        };

        match announced {
            Ok(()) => Ok(Subscription::new(
                topic,
                listener_id,
                Arc::clone(&self.handler),
            )),
            Err(err) => {
                self.handler.remove_listener(&topic, listener_id);
                Err(err)
            }
        }
    }

    /// Publish a payload to a topic.
    ///
    /// The frame carries a fresh message id and the next sequence number
    /// for this connection instance; frames are handed to the transport in
    /// call order. With `ack_required`, the returned future resolves once
    /// the server acknowledges the frame or fails with
    /// [`RealtimeError::AckTimeout`].
    pub async fn publish<P: Serialize>(
        &self,
        topic: impl Into<String>,
        payload: P,
        options: PublishOptions,
    ) -> Result<(), RealtimeError> {
        let topic = topic.into();
        let payload =
            serde_json::to_value(payload).map_err(|e| RealtimeError::Payload(e.to_string()))?;
        let id = MessageId::new();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = RealtimeMessage::publish(topic, id.clone(), seq, payload);

        if options.ack_required {
            let timeout = options.timeout.unwrap_or_else(|| self.ack_timeout());
            // register before sending so an ack racing the send cannot be
            // lost
            let rx = self.handler.register_ack(&id)?;
            if let Err(err) = self.handler.send(frame).await {
                self.handler.cancel_ack(&id);
                return Err(err);
            }
            self.handler.await_ack(&id, rx, timeout).await
        } else {
            self.handler.send(frame).await
        }
    }

    /// Observe connection status changes. The listener receives the new
    /// status and, for failure transitions, the triggering error.
    pub fn on_connection_change(&self, listener: StatusListener) -> StatusSubscription {
        let id = self.manager.add_status_listener(listener);
        StatusSubscription {
            manager: Arc::clone(&self.manager),
            id,
        }
    }

    /// The paired message handler, for direct `wait_for_ack` use and
    /// introspection in tests.
    pub fn handler(&self) -> &Arc<MessageHandler> {
        &self.handler
    }

    fn subscribe_settings(&self) -> (bool, Duration) {
        let config = self.config.lock();
        match config.as_ref() {
            Some(config) => (config.subscribe_ack, config.ack_timeout()),
            None => (false, Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS)),
        }
    }

    fn ack_timeout(&self) -> Duration {
        self.config
            .lock()
            .as_ref()
            .map(ClientConfig::ack_timeout)
            .unwrap_or(Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS))
    }
}
