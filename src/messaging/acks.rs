//! Pending acknowledgment table.
//!
//! Tracks in-flight frames awaiting server confirmation. Each entry holds a
//! oneshot completion slot; the table guarantees at-most-once resolution
//! per message id, and a second wait for an id already in flight is
//! rejected rather than silently clobbering the first waiter.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

use crate::domain::{MessageId, RealtimeError};

type AckSlot = oneshot::Sender<Result<(), RealtimeError>>;

/// Table of in-flight acknowledgment waits.
pub struct AckTable {
    pending: Mutex<HashMap<MessageId, AckSlot>>,
}

impl AckTable {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Register a wait for the given id.
    ///
    /// Fails with [`RealtimeError::DuplicateAckWait`] when a wait for this
    /// id is already in flight; callers must use unique ids per request.
    pub fn register(
        &self,
        id: &MessageId,
    ) -> Result<oneshot::Receiver<Result<(), RealtimeError>>, RealtimeError> {
        let mut pending = self.pending.lock();
        if pending.contains_key(id) {
            return Err(RealtimeError::DuplicateAckWait(id.clone()));
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id.clone(), tx);
        Ok(rx)
    }

    /// Fulfill the wait for the given id.
    ///
    /// Returns false when no entry exists (late or duplicate ack), which
    /// callers treat as a silent drop, not an error. Resolution is
    /// idempotent: the entry is removed on the first call, so a second
    /// call with the same id is a no-op.
    pub fn resolve(&self, id: &MessageId) -> bool {
        let slot = self.pending.lock().remove(id);
        match slot {
            Some(tx) => {
                // The waiter may have raced its timeout and gone away.
                let _ = tx.send(Ok(()));
                true
            }
            None => false,
        }
    }

    /// Remove a wait without completing it (the timeout path).
    pub fn cancel(&self, id: &MessageId) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    /// Reject every outstanding wait. Used on disconnect and link loss:
    /// an ack for a frame sent on a dead link can never arrive.
    pub fn reject_all(&self) {
        let drained: Vec<AckSlot> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, slot)| slot).collect()
        };
        let rejected = drained.len();
        for slot in drained {
            let _ = slot.send(Err(RealtimeError::Closed));
        }
        if rejected > 0 {
            tracing::debug!(rejected, "rejected outstanding acknowledgment waits");
        }
    }

    /// Number of waits currently in flight.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AckTable {
    fn default() -> Self {
        Self::new()
    }
}
