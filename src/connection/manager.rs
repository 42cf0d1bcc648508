//! Connection lifecycle management.
//!
//! The `ConnectionManager` owns exactly one transport connection and hides
//! reconnect and heartbeat complexity from the rest of the system. It runs
//! one background task per established connection, selecting over shutdown,
//! heartbeat ticks, and inbound transport events; inbound frames are routed
//! to the paired `MessageHandler`.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::connection::heartbeat::HeartbeatMonitor;
use crate::domain::{ConnectionStatus, RealtimeError, RealtimeMessage, StateMachine};
use crate::messaging::MessageHandler;
use crate::ports::transport::{Transport, TransportError, TransportEvent, TransportLink};

/// Callback invoked on every status transition.
pub type StatusListener = Arc<dyn Fn(ConnectionStatus, Option<&RealtimeError>) + Send + Sync>;

/// Identifier for one registered status listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusListenerId(Uuid);

impl StatusListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Why an established session ended.
enum SessionEnd {
    /// The caller asked for a shutdown.
    Shutdown,

    /// The link failed or went silently dead.
    Lost(TransportError),
}

/// Result of a bounded retry episode.
enum RetryOutcome {
    Connected(TransportLink),
    Exhausted(RealtimeError),
    Cancelled,
}

struct Shared {
    status: ConnectionStatus,
    shutdown: Option<watch::Sender<bool>>,
    run_task: Option<JoinHandle<()>>,
}

/// Owns the lifecycle of one transport connection.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    handler: Arc<MessageHandler>,
    shared: Mutex<Shared>,
    listeners: Mutex<Vec<(StatusListenerId, StatusListener)>>,
}

impl ConnectionManager {
    /// Create a manager over the given transport, paired with the handler
    /// that will receive inbound frames.
    pub fn new(transport: Arc<dyn Transport>, handler: Arc<MessageHandler>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            handler,
            shared: Mutex::new(Shared {
                status: ConnectionStatus::Disconnected,
                shutdown: None,
                run_task: None,
            }),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status
    }

    /// Register a status listener. Listeners are invoked in registration
    /// order on every transition; a panicking listener is contained and
    /// never aborts the transition or the other listeners.
    pub fn add_status_listener(&self, listener: StatusListener) -> StatusListenerId {
        let id = StatusListenerId::new();
        self.listeners.lock().push((id, listener));
        id
    }

    /// Remove a status listener.
    pub fn remove_status_listener(&self, id: StatusListenerId) {
        self.listeners.lock().retain(|(entry, _)| *entry != id);
    }

    /// Establish the connection.
    ///
    /// Suspends until the transport handshake completes, retrying failed
    /// attempts per the reconnect policy. On success the heartbeat loop is
    /// running and the handler is attached to the live link. On exhaustion
    /// the status is `Error` and the caller must connect again explicitly.
    pub async fn connect(self: &Arc<Self>, config: ClientConfig) -> Result<(), RealtimeError> {
        config.validate()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        {
            let mut shared = self.shared.lock();
            if !shared.status.can_connect() {
                return Err(RealtimeError::AlreadyConnected);
            }
            shared.status = ConnectionStatus::Connecting;
            shared.shutdown = Some(shutdown_tx);
        }
        self.notify(ConnectionStatus::Connecting, None);

        let link = match self.establish(&config).await {
            Ok(link) => link,
            Err(err) => {
                warn!(error = %err, attempt = 1, "connection attempt failed");
                match self.retry(&config, &mut shutdown_rx, 1, err).await {
                    RetryOutcome::Connected(link) => link,
                    RetryOutcome::Exhausted(err) => {
                        self.transition(ConnectionStatus::Error, Some(&err));
                        return Err(err);
                    }
                    RetryOutcome::Cancelled => {
                        self.transition(ConnectionStatus::Disconnected, None);
                        return Err(RealtimeError::Closed);
                    }
                }
            }
        };

        self.handler.attach(link.outbound.clone());
        self.transition(ConnectionStatus::Connected, None);

        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.run(config, link, shutdown_rx).await });
        self.shared.lock().run_task = Some(task);
        Ok(())
    }

    /// Tear the connection down.
    ///
    /// Honored even mid-backoff: the pending reconnect timer is cancelled,
    /// the heartbeat loop stops, outstanding ack waits are rejected, and
    /// no automatic reconnection happens afterwards.
    pub async fn disconnect(&self) {
        let (shutdown, task) = {
            let mut shared = self.shared.lock();
            (shared.shutdown.take(), shared.run_task.take())
        };
        if let Some(tx) = shutdown {
            let _ = tx.send(true);
        }
        if let Some(task) = task {
            let _ = task.await;
        }
        self.handler.detach();
        if self.status() != ConnectionStatus::Disconnected {
            self.transition(ConnectionStatus::Disconnected, None);
        }
    }

    /// Resolve credentials and open a transport link.
    async fn establish(&self, config: &ClientConfig) -> Result<TransportLink, TransportError> {
        let token = match &config.auth {
            None => None,
            Some(auth) => Some(
                auth.resolve()
                    .await
                    .map_err(|e| TransportError::Auth(e.to_string()))?,
            ),
        };
        self.transport.connect(&config.url, token).await
    }

    /// Bounded retry episode.
    ///
    /// `attempts_used` counts establishment calls already consumed this
    /// episode (1 after a failed initial connect, 0 after a drop). Backoff
    /// delays follow the policy schedule; the shutdown signal cancels a
    /// pending delay immediately.
    async fn retry(
        &self,
        config: &ClientConfig,
        shutdown: &mut watch::Receiver<bool>,
        attempts_used: u32,
        last_err: TransportError,
    ) -> RetryOutcome {
        let policy = &config.reconnect;
        let mut attempts = attempts_used;
        let mut retry_no: u32 = 0;
        let mut last_err = last_err;

        loop {
            if !policy.enabled || attempts >= policy.max_attempts {
                return RetryOutcome::Exhausted(RealtimeError::RetriesExhausted {
                    attempts,
                    source: last_err,
                });
            }
            retry_no += 1;

            let trigger = RealtimeError::Transport(last_err.clone());
            self.transition(ConnectionStatus::Reconnecting, Some(&trigger));

            let delay = policy.delay(retry_no);
            debug!(
                attempt = attempts + 1,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnect attempt"
            );
            if !wait_or_shutdown(shutdown, delay).await {
                return RetryOutcome::Cancelled;
            }

            self.transition(ConnectionStatus::Connecting, None);
            attempts += 1;
            match self.establish(config).await {
                Ok(link) => return RetryOutcome::Connected(link),
                Err(err) => {
                    warn!(error = %err, attempt = attempts, "connection attempt failed");
                    last_err = err;
                }
            }
        }
    }

    /// Session loop for an established connection. One task per `connect()`
    /// call; survives reconnects by looping over sessions.
    async fn run(
        self: Arc<Self>,
        config: ClientConfig,
        mut link: TransportLink,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut first_session = true;
        loop {
            if !first_session {
                self.handler.attach(link.outbound.clone());
                self.transition(ConnectionStatus::Connected, None);
                self.resubscribe(&link).await;
            }
            first_session = false;

            let end = self.drive_session(&config, &mut link, &mut shutdown).await;
            self.handler.detach();

            match end {
                SessionEnd::Shutdown => {
                    self.transition(ConnectionStatus::Disconnected, None);
                    return;
                }
                SessionEnd::Lost(err) => {
                    warn!(error = %err, "connection lost");
                    match self.retry(&config, &mut shutdown, 0, err).await {
                        RetryOutcome::Connected(new_link) => {
                            link = new_link;
                        }
                        RetryOutcome::Exhausted(err) => {
                            self.transition(ConnectionStatus::Error, Some(&err));
                            return;
                        }
                        RetryOutcome::Cancelled => {
                            self.transition(ConnectionStatus::Disconnected, None);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Pump one session until shutdown or link loss.
    async fn drive_session(
        &self,
        config: &ClientConfig,
        link: &mut TransportLink,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let period = config.heartbeat.interval();
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut monitor = HeartbeatMonitor::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    return SessionEnd::Shutdown;
                }

                event = link.inbound.recv() => match event {
                    Some(TransportEvent::Message(message)) => {
                        monitor.record_activity();
                        match message {
                            RealtimeMessage::Pong { id, .. } => {
                                tracing::trace!(id = %id, "heartbeat pong");
                            }
                            other => self.handler.handle_message(other),
                        }
                    }
                    Some(TransportEvent::Closed { reason }) => {
                        return SessionEnd::Lost(TransportError::Closed {
                            reason: reason.unwrap_or_else(|| "closed by peer".to_string()),
                        });
                    }
                    None => {
                        return SessionEnd::Lost(TransportError::Closed {
                            reason: "transport task ended".to_string(),
                        });
                    }
                },

                _ = ticks.tick() => {
                    if monitor.is_dead(config.heartbeat.max_missed) {
                        warn!(
                            missed = monitor.missed(),
                            idle_for = ?monitor.idle_for(),
                            "heartbeat lost, treating connection as dead"
                        );
                        return SessionEnd::Lost(TransportError::Closed {
                            reason: "heartbeat lost".to_string(),
                        });
                    }
                    monitor.record_ping();
                    if link.outbound.send(RealtimeMessage::ping()).await.is_err() {
                        return SessionEnd::Lost(TransportError::Closed {
                            reason: "outbound channel closed".to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Re-announce locally-active topics on a fresh link.
    async fn resubscribe(&self, link: &TransportLink) {
        for topic in self.handler.active_topics() {
            let frame = RealtimeMessage::subscribe(topic.clone(), None);
            if link.outbound.send(frame).await.is_err() {
                warn!("link closed while resubscribing");
                return;
            }
            debug!(topic = %topic, "resubscribed after reconnect");
        }
    }

    /// Serialized status update plus observer notification.
    fn transition(&self, next: ConnectionStatus, error: Option<&RealtimeError>) {
        {
            let mut shared = self.shared.lock();
            if shared.status == next {
                return;
            }
            debug_assert!(
                shared.status.can_transition_to(&next),
                "illegal status transition {:?} -> {:?}",
                shared.status,
                next
            );
            shared.status = next;
        }
        self.notify(next, error);
    }

    fn notify(&self, status: ConnectionStatus, error: Option<&RealtimeError>) {
        debug!(status = %status, "connection status changed");
        let snapshot: Vec<StatusListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| listener(status, error)));
            if result.is_err() {
                tracing::error!(status = %status, "status listener panicked");
            }
        }
    }
}

/// Sleep that loses the race against the shutdown signal.
///
/// Returns false when the shutdown fired (or its sender disappeared)
/// before the delay elapsed.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: std::time::Duration) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}
