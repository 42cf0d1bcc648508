//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the reliability core and the outside world. Adapters implement them.
//!
//! - `Transport` - The bidirectional message-oriented connection the
//!   client rides on (implemented by the websocket and in-memory adapters)
//! - `AdminApi` - The administrative stats/broadcast REST collaborator
//!   (consumed interface only, no bundled implementation)

pub mod admin;
pub mod transport;

pub use admin::{AdminApi, AdminApiError, ConnectionStats};
pub use transport::{Transport, TransportError, TransportEvent, TransportLink};
