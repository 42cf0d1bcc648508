//! Topic listener registry.
//!
//! Maps topic names to sets of listener callbacks. Entries are created
//! lazily on first registration and removed once the last listener for a
//! topic is gone, so the registry only ever holds live topics.
//!
//! # Thread Safety
//!
//! The map is mutated under a mutex with short critical sections; dispatch
//! snapshots the listener set before invoking callbacks, so a listener may
//! freely subscribe or unsubscribe from inside its own invocation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::RealtimeMessage;

/// Callback invoked for every message dispatched to a subscribed topic.
pub type TopicListener = Arc<dyn Fn(RealtimeMessage) + Send + Sync>;

/// Identifier for one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registry of topic listeners.
pub struct TopicRegistry {
    topics: Mutex<HashMap<String, Vec<(ListenerId, TopicListener)>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Register a listener for a topic, creating the topic entry if absent.
    ///
    /// Registration has set semantics: adding the same `Arc` twice for the
    /// same topic returns the existing id and the listener is invoked once
    /// per dispatched message.
    pub fn add(&self, topic: &str, listener: TopicListener) -> ListenerId {
        let mut topics = self.topics.lock();
        let entry = topics.entry(topic.to_string()).or_default();
        if let Some((id, _)) = entry.iter().find(|(_, l)| Arc::ptr_eq(l, &listener)) {
            return *id;
        }
        let id = ListenerId::new();
        entry.push((id, listener));
        id
    }

    /// Remove one listener.
    ///
    /// Returns true when the topic entry was deleted because its set became
    /// empty (the caller uses this to decide whether to tell the server).
    pub fn remove(&self, topic: &str, id: ListenerId) -> bool {
        let mut topics = self.topics.lock();
        let Some(entry) = topics.get_mut(topic) else {
            return false;
        };
        entry.retain(|(listener_id, _)| *listener_id != id);
        if entry.is_empty() {
            topics.remove(topic);
            true
        } else {
            false
        }
    }

    /// Invoke every listener registered for the message's topic.
    ///
    /// Listeners run synchronously in registration order. A panicking
    /// listener is contained and logged; the remaining listeners still run.
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, message: &RealtimeMessage) -> usize {
        let Some(topic) = message.topic() else {
            return 0;
        };
        let snapshot: Vec<TopicListener> = {
            let topics = self.topics.lock();
            match topics.get(topic) {
                Some(entry) => entry.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return 0,
            }
        };
        for listener in &snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| listener(message.clone())));
            if result.is_err() {
                tracing::error!(topic = %topic, "topic listener panicked; continuing dispatch");
            }
        }
        snapshot.len()
    }

    /// Topics with at least one listener.
    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().keys().cloned().collect()
    }

    /// Number of listeners for a topic (0 when the topic is absent).
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, Vec::len)
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
