//! Client configuration module
//!
//! Provides type-safe configuration with environment loading via the
//! `config` and `dotenvy` crates. Values are read with the `PULSEWIRE`
//! prefix and nested values use `__` (double underscore) as separator.
//!
//! # Example
//!
//! ```no_run
//! use pulsewire::config::ClientConfig;
//!
//! let config = ClientConfig::load().expect("failed to load configuration");
//! config.validate().expect("invalid configuration");
//! ```

mod auth;
mod error;
mod heartbeat;
mod reconnect;

pub use auth::{Auth, TokenError, TokenProvider};
pub use error::{ConfigError, ValidationError};
pub use heartbeat::HeartbeatConfig;
pub use reconnect::ReconnectPolicy;

use serde::Deserialize;
use std::time::Duration;

/// Default deadline for acknowledgment waits, in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 5_000;

/// Root client configuration.
///
/// Construct programmatically with [`ClientConfig::new`] or load from the
/// environment with [`ClientConfig::load`]. Credentials carrying a provider
/// callback cannot come from the environment; attach them with
/// [`ClientConfig::with_auth`] after loading.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Realtime endpoint (`ws://` or `wss://`).
    pub url: String,

    /// Heartbeat policy for established connections.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    /// Default deadline for acknowledgment waits, in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    /// Require server acknowledgment of subscribe control frames.
    #[serde(default)]
    pub subscribe_ack: bool,

    /// Connection credentials. Not read from the environment.
    #[serde(skip)]
    pub auth: Option<Auth>,
}

fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

impl ClientConfig {
    /// Configuration for the given endpoint with default policies.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectPolicy::default(),
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            subscribe_ack: false,
            auth: None,
        }
    }

    /// Attach connection credentials.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file when present, then environment variables with
    /// the `PULSEWIRE` prefix:
    ///
    /// - `PULSEWIRE__URL=wss://rt.example.com/socket`
    /// - `PULSEWIRE__HEARTBEAT__INTERVAL_MS=25000`
    /// - `PULSEWIRE__RECONNECT__MAX_ATTEMPTS=10`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = ::config::Config::builder()
            .add_source(
                ::config::Environment::default()
                    .prefix("PULSEWIRE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Default acknowledgment deadline as a `Duration`.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        let parsed =
            url::Url::parse(&self.url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
        if self.ack_timeout_ms == 0 {
            return Err(ValidationError::zero_field("ack_timeout_ms"));
        }
        self.heartbeat.validate()?;
        self.reconnect.validate()?;
        Ok(())
    }
}
