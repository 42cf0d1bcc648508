//! Wire envelope for the realtime protocol.
//!
//! Every frame exchanged with the server is one `RealtimeMessage` variant,
//! tagged by a `type` field in its JSON form. The variant shapes encode the
//! protocol invariants directly: events and publishes always carry a topic
//! and payload, acks always carry the id they confirm, and error frames
//! always carry a code and a human-readable message.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a frame that may be acknowledged.
///
/// Generated client-side (UUID v4) so ids are unique per in-flight
/// acknowledgment request without server coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new random message id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Wire-level message envelope.
///
/// `T` is the payload type carried by `Event` and `Publish` frames. It
/// defaults to [`serde_json::Value`]; applications working with a known
/// schema can deserialize through [`RealtimeMessage::payload_as`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeMessage<T = Value> {
    /// Server-originated event on a topic.
    Event {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<MessageId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        payload: T,
        ts: i64,
    },

    /// Client-originated message on a topic. Carries the per-connection
    /// sequence number and an id the server can acknowledge.
    Publish {
        topic: String,
        id: MessageId,
        seq: u64,
        payload: T,
        ts: i64,
    },

    /// Register interest in a topic. Carries an id when the caller wants
    /// the registration acknowledged.
    Subscribe {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<MessageId>,
        ts: i64,
    },

    /// Drop interest in a topic.
    Unsubscribe {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<MessageId>,
        ts: i64,
    },

    /// Confirmation of the frame with the given id.
    Ack { id: MessageId, ts: i64 },

    /// Server-reported failure.
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<MessageId>,
        ts: i64,
    },

    /// Heartbeat probe.
    Ping { id: MessageId, ts: i64 },

    /// Heartbeat answer, echoing the probe id.
    Pong { id: MessageId, ts: i64 },
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl<T> RealtimeMessage<T> {
    /// Build an event frame.
    pub fn event(topic: impl Into<String>, payload: T) -> Self {
        RealtimeMessage::Event {
            topic: topic.into(),
            id: None,
            seq: None,
            payload,
            ts: now_ms(),
        }
    }

    /// Build a publish frame with an explicit id and sequence number.
    pub fn publish(topic: impl Into<String>, id: MessageId, seq: u64, payload: T) -> Self {
        RealtimeMessage::Publish {
            topic: topic.into(),
            id,
            seq,
            payload,
            ts: now_ms(),
        }
    }

    /// Build a subscribe control frame.
    pub fn subscribe(topic: impl Into<String>, id: Option<MessageId>) -> Self {
        RealtimeMessage::Subscribe {
            topic: topic.into(),
            id,
            ts: now_ms(),
        }
    }

    /// Build an unsubscribe control frame.
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        RealtimeMessage::Unsubscribe {
            topic: topic.into(),
            id: None,
            ts: now_ms(),
        }
    }

    /// Build an acknowledgment for the frame with the given id.
    pub fn ack(id: MessageId) -> Self {
        RealtimeMessage::Ack { id, ts: now_ms() }
    }

    /// Build an error frame.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        RealtimeMessage::Error {
            code: code.into(),
            message: message.into(),
            id: None,
            ts: now_ms(),
        }
    }

    /// Build a heartbeat probe with a fresh id.
    pub fn ping() -> Self {
        RealtimeMessage::Ping {
            id: MessageId::new(),
            ts: now_ms(),
        }
    }

    /// Build a heartbeat answer for the given probe id.
    pub fn pong(id: MessageId) -> Self {
        RealtimeMessage::Pong { id, ts: now_ms() }
    }

    /// Topic this frame routes on, when it has one.
    pub fn topic(&self) -> Option<&str> {
        match self {
            RealtimeMessage::Event { topic, .. }
            | RealtimeMessage::Publish { topic, .. }
            | RealtimeMessage::Subscribe { topic, .. }
            | RealtimeMessage::Unsubscribe { topic, .. } => Some(topic),
            _ => None,
        }
    }

    /// Message id, when present.
    pub fn id(&self) -> Option<&MessageId> {
        match self {
            RealtimeMessage::Event { id, .. }
            | RealtimeMessage::Subscribe { id, .. }
            | RealtimeMessage::Unsubscribe { id, .. }
            | RealtimeMessage::Error { id, .. } => id.as_ref(),
            RealtimeMessage::Publish { id, .. }
            | RealtimeMessage::Ack { id, .. }
            | RealtimeMessage::Ping { id, .. }
            | RealtimeMessage::Pong { id, .. } => Some(id),
        }
    }

    /// Sequence number, when present.
    pub fn seq(&self) -> Option<u64> {
        match self {
            RealtimeMessage::Event { seq, .. } => *seq,
            RealtimeMessage::Publish { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Creation timestamp in unix milliseconds.
    pub fn ts(&self) -> i64 {
        match self {
            RealtimeMessage::Event { ts, .. }
            | RealtimeMessage::Publish { ts, .. }
            | RealtimeMessage::Subscribe { ts, .. }
            | RealtimeMessage::Unsubscribe { ts, .. }
            | RealtimeMessage::Ack { ts, .. }
            | RealtimeMessage::Error { ts, .. }
            | RealtimeMessage::Ping { ts, .. }
            | RealtimeMessage::Pong { ts, .. } => *ts,
        }
    }

    /// Payload reference for frames that carry one.
    pub fn payload(&self) -> Option<&T> {
        match self {
            RealtimeMessage::Event { payload, .. } | RealtimeMessage::Publish { payload, .. } => {
                Some(payload)
            }
            _ => None,
        }
    }

    /// Variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeMessage::Event { .. } => "event",
            RealtimeMessage::Publish { .. } => "publish",
            RealtimeMessage::Subscribe { .. } => "subscribe",
            RealtimeMessage::Unsubscribe { .. } => "unsubscribe",
            RealtimeMessage::Ack { .. } => "ack",
            RealtimeMessage::Error { .. } => "error",
            RealtimeMessage::Ping { .. } => "ping",
            RealtimeMessage::Pong { .. } => "pong",
        }
    }
}

impl RealtimeMessage<Value> {
    /// Deserialize the payload into a concrete type.
    ///
    /// Returns `Ok(None)` for frames without a payload.
    pub fn payload_as<P: DeserializeOwned>(&self) -> Result<Option<P>, serde_json::Error> {
        self.payload()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serializes_with_type_tag() {
        let msg = RealtimeMessage::event("chat", json!({ "text": "hi" }));
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains(r#""type":"event""#));
        assert!(encoded.contains(r#""topic":"chat""#));
        assert!(encoded.contains(r#""text":"hi""#));
        // optional fields are omitted, not null
        assert!(!encoded.contains("null"));
    }

    #[test]
    fn ack_roundtrips_through_json() {
        let id = MessageId::new();
        let msg: RealtimeMessage = RealtimeMessage::ack(id.clone());
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: RealtimeMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id(), Some(&id));
        assert_eq!(decoded.kind(), "ack");
    }

    #[test]
    fn inbound_event_deserializes_from_wire_shape() {
        let raw = r#"{"type":"event","topic":"chat","seq":7,"payload":{"text":"hi"},"ts":1700000000000}"#;
        let msg: RealtimeMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.topic(), Some("chat"));
        assert_eq!(msg.seq(), Some(7));
        assert_eq!(msg.ts(), 1_700_000_000_000);
    }

    #[test]
    fn publish_always_carries_topic_id_and_seq() {
        let id = MessageId::new();
        let msg = RealtimeMessage::publish("orders", id.clone(), 3, json!({ "qty": 2 }));
        assert_eq!(msg.topic(), Some("orders"));
        assert_eq!(msg.id(), Some(&id));
        assert_eq!(msg.seq(), Some(3));
        assert!(msg.payload().is_some());
    }

    #[test]
    fn error_frame_carries_code_and_message() {
        let msg: RealtimeMessage = RealtimeMessage::error("FORBIDDEN", "not allowed");
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains(r#""code":"FORBIDDEN""#));
        assert!(encoded.contains(r#""message":"not allowed""#));
        assert!(msg.topic().is_none());
    }

    #[test]
    fn pong_echoes_ping_id() {
        let ping: RealtimeMessage = RealtimeMessage::ping();
        let ping_id = ping.id().unwrap().clone();
        let pong: RealtimeMessage = RealtimeMessage::pong(ping_id.clone());
        assert_eq!(pong.id(), Some(&ping_id));
    }

    #[test]
    fn payload_as_deserializes_known_schema() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Chat {
            text: String,
        }

        let msg = RealtimeMessage::event("chat", json!({ "text": "hi" }));
        let chat: Option<Chat> = msg.payload_as().unwrap();
        assert_eq!(chat, Some(Chat { text: "hi".into() }));

        let ack: RealtimeMessage = RealtimeMessage::ack(MessageId::new());
        let none: Option<Chat> = ack.payload_as().unwrap();
        assert!(none.is_none());
    }
}
