//! Reconnect policy and backoff schedule.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Reconnection policy for a managed connection.
///
/// An episode (the initial `connect()` call, or a drop while connected)
/// permits `max_attempts` establishment calls. The delay before re-attempt
/// `n` (1-based within the episode) is `min(base_ms * 2^(n-1), cap_ms)`,
/// optionally jittered. Exhausting the budget parks the connection in the
/// `Error` status until the caller connects again.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectPolicy {
    /// Whether failed connections are retried at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Establishment calls permitted per episode.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay in milliseconds.
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,

    /// Upper bound on any retry delay in milliseconds.
    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,

    /// Spread each delay over `[d/2, d]` to decorrelate clients
    /// reconnecting after a shared outage.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_ms() -> u64 {
    1_000
}

fn default_cap_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            base_ms: default_base_ms(),
            cap_ms: default_cap_ms(),
            jitter: default_jitter(),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never retries; the first failure is terminal.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Backoff delay before retry `attempt` (1-based within an episode).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let capped = self
            .base_ms
            .saturating_mul(1u64 << exp)
            .min(self.cap_ms.max(self.base_ms));
        let millis = if self.jitter && capped > 1 {
            let half = capped / 2;
            half + rand::thread_rng().gen_range(0..=capped - half)
        } else {
            capped
        };
        Duration::from_millis(millis)
    }

    /// Validate reconnect configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.max_attempts == 0 {
            return Err(ValidationError::zero_field("reconnect.max_attempts"));
        }
        if self.base_ms == 0 {
            return Err(ValidationError::zero_field("reconnect.base_ms"));
        }
        if self.base_ms > self.cap_ms {
            return Err(ValidationError::BackoffRange {
                base_ms: self.base_ms,
                cap_ms: self.cap_ms,
            });
        }
        Ok(())
    }
}
