//! Adapters - Implementations of port interfaces.
//!
//! - `websocket` - Production transport over tokio-tungstenite
//! - `memory` - Deterministic in-process transport for tests and examples

pub mod memory;
pub mod websocket;

pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;
