//! Reference allocation and in-flight request correlation.
//!
//! Each outgoing request gets the next reference from a counter that starts
//! at 1 and never repeats within a session. A reply resolves the slot
//! registered under its reference exactly once; teardown fails every
//! remaining slot with `SessionClosed`.

use std::collections::HashMap;
use std::sync::Mutex;

use log::warn;
use tokio::sync::oneshot;

use crate::error::ComfoError;
use crate::proto::OperationType;

/// Outcome delivered to the waiting caller: the raw inner payload segment
/// of the reply, or a typed error.
pub(crate) type Outcome = Result<Vec<u8>, ComfoError>;

struct PendingSlot {
    expected: OperationType,
    tx: oneshot::Sender<Outcome>,
}

struct PendingInner {
    next_reference: u32,
    slots: HashMap<u32, PendingSlot>,
}

/// Per-connection pending request table.
pub(crate) struct PendingMap {
    inner: Mutex<PendingInner>,
}

impl PendingMap {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(PendingInner {
                next_reference: 1,
                slots: HashMap::new(),
            }),
        }
    }

    /// Allocates the next reference and registers a slot expecting the
    /// given reply operation.
    pub(crate) fn register(
        &self,
        expected: OperationType,
    ) -> (u32, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        let reference = inner.next_reference;
        inner.next_reference += 1;
        inner.slots.insert(reference, PendingSlot { expected, tx });
        (reference, rx)
    }

    /// Registers a follow-up slot under an already-allocated reference
    /// (asynchronous RMI delivers its response under the request's
    /// reference after the confirm). Fails if a slot is still pending.
    pub(crate) fn register_at(
        &self,
        reference: u32,
        expected: OperationType,
    ) -> Result<oneshot::Receiver<Outcome>, ComfoError> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        if inner.slots.contains_key(&reference) {
            return Err(ComfoError::ProtocolViolation("reference already pending"));
        }
        inner.slots.insert(reference, PendingSlot { expected, tx });
        Ok(rx)
    }

    /// Resolves the slot registered under `reference` with a reply of
    /// operation `op`. A mismatched operation resolves the slot with
    /// `ProtocolViolation`. Returns false when no slot is registered.
    pub(crate) fn complete(&self, reference: u32, op: OperationType, outcome: Outcome) -> bool {
        let slot = { self.inner.lock().unwrap().slots.remove(&reference) };
        let Some(slot) = slot else {
            return false;
        };
        let outcome = if slot.expected == op || outcome.is_err() {
            outcome
        } else {
            warn!(
                "[SESSION] Reply {:?} for ref {} does not match expected {:?}",
                op, reference, slot.expected
            );
            Err(ComfoError::ProtocolViolation("unexpected reply operation"))
        };
        // The receiver may be gone when the caller timed out or cancelled.
        let _ = slot.tx.send(outcome);
        true
    }

    /// Removes a slot without resolving it (request timed out or the
    /// caller cancelled). A later reply will find no slot and be dropped.
    pub(crate) fn discard(&self, reference: u32) {
        self.inner.lock().unwrap().slots.remove(&reference);
    }

    /// Fails every pending slot, in reference order for determinism.
    pub(crate) fn fail_all(&self, err: ComfoError) {
        let slots = {
            let mut inner = self.inner.lock().unwrap();
            std::mem::take(&mut inner.slots)
        };
        let mut slots: Vec<_> = slots.into_iter().collect();
        slots.sort_by_key(|(reference, _)| *reference);
        for (_, slot) in slots {
            let _ = slot.tx.send(Err(err));
        }
    }
}
