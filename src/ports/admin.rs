//! AdminApi port - Interface for the administrative REST collaborator.
//!
//! A deployment usually exposes a small HTTP API next to the realtime
//! endpoint for operational actions: reading connection statistics and
//! pushing a system-wide broadcast. That API is consumed by operators, not
//! by the reliability core, so this crate defines only the contract and
//! ships no implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot of server-side connection statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// Currently open connections.
    pub active_connections: u64,

    /// Distinct topics with at least one subscriber.
    pub active_topics: u64,

    /// Messages delivered since the server started.
    pub messages_delivered: u64,
}

/// Errors raised by admin API implementations.
#[derive(Debug, Clone, Error)]
pub enum AdminApiError {
    /// The request could not be completed.
    #[error("admin request failed: {0}")]
    Request(String),

    /// The caller lacks administrative credentials.
    #[error("administrative credentials rejected")]
    Unauthorized,
}

/// Port for administrative actions against the realtime deployment.
///
/// # Example
///
/// ```ignore
/// let stats = admin.connection_stats().await?;
/// if stats.active_connections > 0 {
///     admin.broadcast("system", json!({ "notice": "maintenance at 02:00" })).await?;
/// }
/// ```
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Fetch current connection statistics.
    async fn connection_stats(&self) -> Result<ConnectionStats, AdminApiError>;

    /// Push a payload to every subscriber of a topic, bypassing any single
    /// client connection.
    async fn broadcast(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<(), AdminApiError>;
}
