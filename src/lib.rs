//! Pulsewire - Reliable realtime messaging client
//!
//! This crate implements the reliability layer for a topic-based realtime
//! connection: lifecycle management with heartbeat supervision and
//! bounded-backoff reconnection, ack-confirmed delivery, and ordered
//! topic dispatch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulsewire::adapters::WebSocketTransport;
//! use pulsewire::{ClientConfig, PublishOptions, RealtimeClient, RealtimeMessage};
//!
//! # async fn run() -> Result<(), pulsewire::RealtimeError> {
//! let client = RealtimeClient::new(Arc::new(WebSocketTransport::new()));
//! client
//!     .connect(ClientConfig::new("wss://rt.example.com/socket"))
//!     .await?;
//!
//! let _subscription = client
//!     .subscribe(
//!         "chat",
//!         Arc::new(|message: RealtimeMessage| {
//!             println!("chat event: {:?}", message.payload());
//!         }),
//!     )
//!     .await?;
//!
//! client
//!     .publish("chat", serde_json::json!({ "text": "hi" }), PublishOptions::with_ack())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod client;
pub mod config;
pub mod connection;
pub mod domain;
pub mod messaging;
pub mod ports;

pub use client::{PublishOptions, RealtimeClient, StatusSubscription, Subscription};
pub use config::{Auth, ClientConfig, HeartbeatConfig, ReconnectPolicy, TokenProvider};
pub use connection::{ConnectionManager, StatusListener};
pub use domain::{ConnectionStatus, MessageId, RealtimeError, RealtimeMessage};
pub use messaging::{MessageHandler, TopicListener};
pub use ports::{Transport, TransportError, TransportEvent, TransportLink};
