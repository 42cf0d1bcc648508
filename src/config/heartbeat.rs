//! Heartbeat configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Heartbeat policy for an established connection.
///
/// While connected, the client sends a ping every `interval_ms` and treats
/// the connection as silently dead once `max_missed` consecutive pings go
/// unanswered. Any inbound traffic counts as liveness, so a busy server that
/// skips pongs does not trip the detector.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Milliseconds between heartbeat probes.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive unanswered probes before the connection is treated as
    /// dead and a reconnect is forced.
    #[serde(default = "default_max_missed")]
    pub max_missed: u32,
}

fn default_interval_ms() -> u64 {
    25_000
}

fn default_max_missed() -> u32 {
    3
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_missed: default_max_missed(),
        }
    }
}

impl HeartbeatConfig {
    /// Probe interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate heartbeat configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_ms == 0 {
            return Err(ValidationError::zero_field("heartbeat.interval_ms"));
        }
        if self.max_missed == 0 {
            return Err(ValidationError::zero_field("heartbeat.max_missed"));
        }
        Ok(())
    }
}
