//! Authentication configuration.
//!
//! Credentials are either a static secret token or a provider callback for
//! deployments that mint short-lived tokens. The static form is
//! `secrecy`-wrapped so a debug-printed config never leaks it.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by a token provider.
#[derive(Debug, Clone, Error)]
#[error("token provider failed: {0}")]
pub struct TokenError(pub String);

impl TokenError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Port for minting connection tokens on demand.
///
/// Called once per establishment attempt, so a provider backed by an
/// expiring credential always hands the transport a fresh token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, TokenError>;
}

/// Connection credentials.
#[derive(Clone)]
pub enum Auth {
    /// A static secret token.
    Token(SecretString),

    /// A callback invoked per connection attempt.
    Provider(Arc<dyn TokenProvider>),
}

impl Auth {
    /// Credentials from a static token.
    pub fn token(token: impl Into<String>) -> Self {
        Auth::Token(SecretString::new(token.into()))
    }

    /// Credentials from a provider callback.
    pub fn provider(provider: Arc<dyn TokenProvider>) -> Self {
        Auth::Provider(provider)
    }

    /// Resolve the credentials to a plain token for the transport handshake.
    pub(crate) async fn resolve(&self) -> Result<String, TokenError> {
        match self {
            Auth::Token(secret) => Ok(secret.expose_secret().clone()),
            Auth::Provider(provider) => provider.token().await,
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Token(_) => f.write_str("Auth::Token([REDACTED])"),
            Auth::Provider(_) => f.write_str("Auth::Provider(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;

    #[async_trait]
    impl TokenProvider for FixedProvider {
        async fn token(&self) -> Result<String, TokenError> {
            Ok("minted".to_string())
        }
    }

    #[tokio::test]
    async fn static_token_resolves_to_its_value() {
        let auth = Auth::token("s3cret");
        assert_eq!(auth.resolve().await.unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn provider_is_invoked_for_each_resolution() {
        let auth = Auth::provider(Arc::new(FixedProvider));
        assert_eq!(auth.resolve().await.unwrap(), "minted");
        assert_eq!(auth.resolve().await.unwrap(), "minted");
    }

    #[test]
    fn debug_output_never_contains_the_token() {
        let auth = Auth::token("s3cret");
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("REDACTED"));
    }
}
