//! Topic-based pub/sub dispatch and ack correlation for one connection.
//!
//! # Components
//!
//! - [`registry`] - Topic → listener-set registry with empty-topic cleanup
//! - [`acks`] - Pending acknowledgment table (at-most-once resolution)
//! - [`handler`] - The `MessageHandler` composing both over the live link

pub mod acks;
pub mod handler;
pub mod registry;

pub use acks::AckTable;
pub use handler::MessageHandler;
pub use registry::{ListenerId, TopicListener, TopicRegistry};
