//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The loaded values failed semantic validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised by semantic validation of configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint url cannot be empty")]
    EmptyUrl,

    #[error("endpoint url is invalid: {0}")]
    InvalidUrl(String),

    #[error("endpoint scheme '{0}' is not supported (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("'{field}' must be greater than zero")]
    ZeroField { field: &'static str },

    #[error("reconnect base_ms ({base_ms}) cannot exceed cap_ms ({cap_ms})")]
    BackoffRange { base_ms: u64, cap_ms: u64 },
}

impl ValidationError {
    /// Creates a zero-field validation error.
    pub fn zero_field(field: &'static str) -> Self {
        ValidationError::ZeroField { field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_field_displays_the_field_name() {
        let err = ValidationError::zero_field("heartbeat.interval_ms");
        assert_eq!(
            err.to_string(),
            "'heartbeat.interval_ms' must be greater than zero"
        );
    }

    #[test]
    fn backoff_range_displays_both_bounds() {
        let err = ValidationError::BackoffRange {
            base_ms: 5000,
            cap_ms: 1000,
        };
        assert!(err.to_string().contains("5000"));
        assert!(err.to_string().contains("1000"));
    }
}
