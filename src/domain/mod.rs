//! Domain layer containing the protocol types and lifecycle rules.
//!
//! # Module Organization
//!
//! - `message` - Wire envelope (`RealtimeMessage`) and message ids
//! - `status` - Connection lifecycle status and its transition matrix
//! - `state_machine` - Validated-transition trait for status enums
//! - `errors` - Client-facing error taxonomy

pub mod errors;
pub mod message;
pub mod state_machine;
pub mod status;

pub use errors::RealtimeError;
pub use message::{MessageId, RealtimeMessage};
pub use state_machine::{InvalidTransition, StateMachine};
pub use status::ConnectionStatus;
