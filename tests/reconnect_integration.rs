//! Integration tests for the connection lifecycle.
//!
//! These tests script the in-memory transport to refuse or drop
//! connections and verify:
//! 1. Bounded backoff with the exact status sequence and attempt count
//! 2. Reconnection after a drop, including topic re-announcement
//! 3. Heartbeat-driven detection of silently dead connections
//! 4. Shutdown semantics mid-backoff and credential re-resolution

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

use pulsewire::adapters::{MemoryPeer, MemoryTransport};
use pulsewire::config::{TokenError, TokenProvider};
use pulsewire::connection::StatusListener;
use pulsewire::{
    Auth, ClientConfig, ConnectionStatus, PublishOptions, RealtimeClient, RealtimeError,
    RealtimeMessage, TopicListener,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn fast_config() -> ClientConfig {
    let mut config = ClientConfig::new("ws://rt.test/socket");
    config.heartbeat.interval_ms = 60_000;
    config.reconnect.max_attempts = 3;
    config.reconnect.base_ms = 10;
    config.reconnect.cap_ms = 40;
    config.reconnect.jitter = false;
    config.ack_timeout_ms = 200;
    config
}

fn status_recorder(log: Arc<StdMutex<Vec<ConnectionStatus>>>) -> StatusListener {
    Arc::new(move |status, _error| {
        log.lock().unwrap().push(status);
    })
}

fn forwarding_listener() -> (TopicListener, mpsc::UnboundedReceiver<RealtimeMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener: TopicListener = Arc::new(move |message| {
        let _ = tx.send(message);
    });
    (listener, rx)
}

async fn next_peer(peers: &mut mpsc::UnboundedReceiver<MemoryPeer>) -> MemoryPeer {
    timeout(Duration::from_secs(2), peers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("transport dropped")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn wait_for_status(client: &RealtimeClient, expected: ConnectionStatus) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while client.status() != expected {
        assert!(
            Instant::now() < deadline,
            "status never reached {:?}, stuck at {:?}",
            expected,
            client.status()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Retry exhaustion
// =============================================================================

#[tokio::test]
async fn exhausted_retries_follow_the_specified_status_sequence() {
    let (transport, _peers) = MemoryTransport::new();
    transport.fail_next(u32::MAX);
    let client = RealtimeClient::new(transport.clone());

    let statuses = Arc::new(StdMutex::new(Vec::new()));
    let watch = client.on_connection_change(status_recorder(Arc::clone(&statuses)));

    let err = client.connect(fast_config()).await.unwrap_err();
    assert!(matches!(
        err,
        RealtimeError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(transport.connect_attempts(), 3, "no fourth attempt");
    assert_eq!(client.status(), ConnectionStatus::Error);

    use ConnectionStatus::*;
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![Connecting, Reconnecting, Connecting, Reconnecting, Connecting, Error]
    );

    // a removed observer sees nothing further
    watch.unsubscribe();
    client.connect(fast_config()).await.unwrap_err();
    assert_eq!(statuses.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn disabled_reconnect_fails_on_the_first_refusal() {
    let (transport, _peers) = MemoryTransport::new();
    transport.fail_next(u32::MAX);
    let client = RealtimeClient::new(transport.clone());

    let mut config = fast_config();
    config.reconnect.enabled = false;

    let err = client.connect(config).await.unwrap_err();
    assert!(matches!(
        err,
        RealtimeError::RetriesExhausted { attempts: 1, .. }
    ));
    assert_eq!(transport.connect_attempts(), 1);
    assert_eq!(client.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn error_status_allows_an_explicit_reconnect() {
    let (transport, mut peers) = MemoryTransport::new();
    transport.fail_next(u32::MAX);
    let client = RealtimeClient::new(transport.clone());

    client.connect(fast_config()).await.unwrap_err();
    assert_eq!(client.status(), ConnectionStatus::Error);

    transport.fail_next(0);
    client.connect(fast_config()).await.unwrap();
    assert_eq!(client.status(), ConnectionStatus::Connected);
    let _peer = next_peer(&mut peers).await;
    client.disconnect().await;
}

#[tokio::test]
async fn connect_while_connected_is_rejected() {
    let (transport, mut peers) = MemoryTransport::new();
    let client = RealtimeClient::new(transport);

    client.connect(fast_config()).await.unwrap();
    let _peer = next_peer(&mut peers).await;

    let err = client.connect(fast_config()).await.unwrap_err();
    assert!(matches!(err, RealtimeError::AlreadyConnected));

    client.disconnect().await;
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

// =============================================================================
// Reconnection after a drop
// =============================================================================

#[tokio::test]
async fn dropped_connection_reconnects_and_resubscribes() {
    let (transport, mut peers) = MemoryTransport::new();
    let client = Arc::new(RealtimeClient::new(transport));

    let mut config = fast_config();
    config.reconnect.max_attempts = 5;
    client.connect(config).await.unwrap();
    let mut first = next_peer(&mut peers).await;

    let (listener, mut events) = forwarding_listener();
    client.subscribe("chat", listener).await.unwrap();
    let announce = first.recv().await.unwrap();
    assert!(matches!(announce, RealtimeMessage::Subscribe { .. }));

    first.close(Some("server restart".to_string())).await;

    let mut second = next_peer(&mut peers).await;
    wait_for_status(&client, ConnectionStatus::Connected).await;

    // the new link is re-announced before any traffic
    let reannounce = timeout(Duration::from_secs(1), second.recv())
        .await
        .expect("no resubscribe frame")
        .unwrap();
    assert!(matches!(reannounce, RealtimeMessage::Subscribe { .. }));
    assert_eq!(reannounce.topic(), Some("chat"));

    // and dispatch still works end to end
    second
        .send(RealtimeMessage::event("chat", json!({ "text": "back" })))
        .await;
    let received = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("listener was not invoked after reconnect")
        .unwrap();
    assert_eq!(received.payload(), Some(&json!({ "text": "back" })));

    client.disconnect().await;
}

#[tokio::test]
async fn drop_with_dead_server_parks_the_connection_in_error() {
    let (transport, mut peers) = MemoryTransport::new();
    let client = Arc::new(RealtimeClient::new(transport.clone()));

    let mut config = fast_config();
    config.reconnect.max_attempts = 2;
    client.connect(config).await.unwrap();
    let peer = next_peer(&mut peers).await;

    let statuses = Arc::new(StdMutex::new(Vec::new()));
    let _watch = client.on_connection_change(status_recorder(Arc::clone(&statuses)));

    transport.fail_next(u32::MAX);
    peer.close(None).await;

    wait_for_status(&client, ConnectionStatus::Error).await;
    // initial connect plus two re-attempts
    assert_eq!(transport.connect_attempts(), 3);

    let result = client
        .publish("chat", json!({}), PublishOptions::fire_and_forget())
        .await;
    assert!(matches!(result, Err(RealtimeError::NotConnected)));

    use ConnectionStatus::*;
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![Reconnecting, Connecting, Reconnecting, Connecting, Error]
    );
}

// =============================================================================
// Heartbeat
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn silent_peer_forces_a_reconnect() {
    init_tracing();
    let (transport, mut peers) = MemoryTransport::new();
    let client = Arc::new(RealtimeClient::new(transport));

    let mut config = fast_config();
    config.heartbeat.interval_ms = 30;
    config.heartbeat.max_missed = 2;
    config.reconnect.max_attempts = 5;
    client.connect(config).await.unwrap();

    let mut first = next_peer(&mut peers).await;
    let ping_counter = tokio::spawn(async move {
        let mut pings = 0u32;
        while let Some(frame) = first.recv().await {
            if matches!(frame, RealtimeMessage::Ping { .. }) {
                pings += 1;
            }
        }
        pings
    });

    // the silent peer is declared dead and a new link is established
    let second = next_peer(&mut peers).await;
    wait_for_status(&client, ConnectionStatus::Connected).await;

    let pings = ping_counter.await.unwrap();
    assert!(pings >= 2, "expected at least two probes, saw {}", pings);
    client.disconnect().await;
    drop(second);
}

#[tokio::test(flavor = "multi_thread")]
async fn answered_heartbeats_keep_the_connection_alive() {
    init_tracing();
    let (transport, mut peers) = MemoryTransport::new();
    let client = Arc::new(RealtimeClient::new(transport.clone()));

    let mut config = fast_config();
    config.heartbeat.interval_ms = 20;
    config.heartbeat.max_missed = 2;
    client.connect(config).await.unwrap();

    let mut peer = next_peer(&mut peers).await;
    let responder = tokio::spawn(async move {
        while let Some(frame) = peer.recv().await {
            if let RealtimeMessage::Ping { id, .. } = frame {
                peer.send(RealtimeMessage::pong(id)).await;
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(transport.connect_attempts(), 1, "no reconnect happened");

    client.disconnect().await;
    responder.await.unwrap();
}

// =============================================================================
// Shutdown semantics
// =============================================================================

#[tokio::test]
async fn disconnect_cancels_a_pending_backoff_timer() {
    let (transport, _peers) = MemoryTransport::new();
    transport.fail_next(u32::MAX);
    let client = Arc::new(RealtimeClient::new(transport));

    let mut config = fast_config();
    config.reconnect.max_attempts = 50;
    config.reconnect.base_ms = 5_000;
    config.reconnect.cap_ms = 30_000;

    let connecting = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect(config).await }
    });
    wait_for_status(&client, ConnectionStatus::Reconnecting).await;

    let started = Instant::now();
    client.disconnect().await;
    let result = timeout(Duration::from_secs(1), connecting)
        .await
        .expect("connect was not cancelled by disconnect")
        .unwrap();

    assert!(matches!(result, Err(RealtimeError::Closed)));
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "disconnect had to wait out the backoff timer"
    );
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn disconnect_without_a_connection_is_a_noop() {
    let (transport, _peers) = MemoryTransport::new();
    let client = RealtimeClient::new(transport);
    client.disconnect().await;
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

// =============================================================================
// Credentials
// =============================================================================

struct CountingProvider {
    mints: AtomicU32,
}

#[async_trait]
impl TokenProvider for CountingProvider {
    async fn token(&self) -> Result<String, TokenError> {
        let n = self.mints.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("tok-{n}"))
    }
}

#[tokio::test]
async fn static_token_is_presented_to_the_transport() {
    let (transport, mut peers) = MemoryTransport::new();
    let client = RealtimeClient::new(transport);

    let config = fast_config().with_auth(Auth::token("secret-token"));
    client.connect(config).await.unwrap();

    let peer = next_peer(&mut peers).await;
    assert_eq!(peer.token(), Some("secret-token"));
    client.disconnect().await;
}

#[tokio::test]
async fn provider_mints_a_fresh_token_per_attempt() {
    let (transport, mut peers) = MemoryTransport::new();
    let client = Arc::new(RealtimeClient::new(transport));

    let provider = Arc::new(CountingProvider {
        mints: AtomicU32::new(0),
    });
    let mut config = fast_config();
    config.reconnect.max_attempts = 5;
    let config = config.with_auth(Auth::provider(provider));

    client.connect(config).await.unwrap();
    let first = next_peer(&mut peers).await;
    assert_eq!(first.token(), Some("tok-1"));

    first.close(None).await;
    let second = next_peer(&mut peers).await;
    assert_eq!(second.token(), Some("tok-2"));

    client.disconnect().await;
}
