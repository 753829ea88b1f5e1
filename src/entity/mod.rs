//! Note and list item entities.
//!
//! Both entities follow the same save protocol: field edits are applied
//! optimistically to local state, announced through the store dispatch
//! contract, and then flushed to the remote API behind a debounce timer.
//! The shared pieces of that protocol live here.

pub mod co_author;
pub mod list_item;
pub mod note;

pub use co_author::{CoAuthor, User};
pub use list_item::{ListItem, ListItemData, ListItemPatch};
pub use note::{Note, NoteData, NotePatch};

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Debounce window for text edits.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(400);

/// Result of an (eventual) save, delivered to everyone who awaited it.
///
/// Optimistic local state is never rolled back here; when a remote operation
/// fails, `reconciliation_needed` tells a higher layer that local and remote
/// state have diverged and it may retry or revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub persisted: bool,
    pub reconciliation_needed: bool,
}

impl SaveOutcome {
    pub(crate) fn persisted() -> Self {
        Self {
            persisted: true,
            reconciliation_needed: false,
        }
    }

    pub(crate) fn failed() -> Self {
        Self {
            persisted: false,
            reconciliation_needed: true,
        }
    }

    /// The armed save was cancelled before firing (e.g. the note was emptied).
    pub(crate) fn cancelled() -> Self {
        Self {
            persisted: false,
            reconciliation_needed: false,
        }
    }
}

/// Handle on a scheduled save; awaiting it yields the outcome of the final
/// coalesced flush, even if the timer that produced this handle was
/// superseded by later edits.
#[derive(Debug)]
pub struct SaveRequest {
    rx: oneshot::Receiver<SaveOutcome>,
}

impl SaveRequest {
    pub(crate) fn new(rx: oneshot::Receiver<SaveOutcome>) -> Self {
        Self { rx }
    }

    pub async fn wait(self) -> SaveOutcome {
        // The sender only disappears if the owning entity is dropped with a
        // save still armed; treat that as a cancellation.
        self.rx.await.unwrap_or_else(|_| SaveOutcome::cancelled())
    }
}

/// Per-entity debounce bookkeeping. Invariant: at most one armed, unfired
/// timer at any time.
#[derive(Debug, Default)]
pub(crate) struct SaveState {
    pending: Option<PendingSave>,
    generation: u64,
}

#[derive(Debug)]
struct PendingSave {
    generation: u64,
    handle: JoinHandle<()>,
    waiters: Vec<oneshot::Sender<SaveOutcome>>,
}

impl SaveState {
    /// Abort the armed timer, if any, and take over its waiters so they can
    /// be resolved by whatever supersedes it.
    pub(crate) fn cancel(&mut self) -> Vec<oneshot::Sender<SaveOutcome>> {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                pending.waiters
            }
            None => Vec::new(),
        }
    }

    /// Reserve the generation for a new timer.
    pub(crate) fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn arm(
        &mut self,
        generation: u64,
        handle: JoinHandle<()>,
        waiters: Vec<oneshot::Sender<SaveOutcome>>,
    ) {
        self.pending = Some(PendingSave {
            generation,
            handle,
            waiters,
        });
    }

    /// Called by the timer task when it fires. Yields the waiters only if this
    /// timer is still the current one; a stale task gets `None` and must not
    /// flush.
    pub(crate) fn claim(&mut self, generation: u64) -> Option<Vec<oneshot::Sender<SaveOutcome>>> {
        if self.pending.as_ref().map(|p| p.generation) == Some(generation) {
            self.pending.take().map(|p| p.waiters)
        } else {
            None
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

/// Parse a wire timestamp; unparseable input leaves the field unset.
pub(crate) fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_accepts_rfc3339_and_rejects_garbage() {
        let parsed = parse_timestamp(Some("2024-05-01T12:30:00Z"));
        assert!(parsed.is_some());
        assert!(parse_timestamp(Some("yesterday")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[tokio::test]
    async fn cancel_adopts_waiters_and_claim_guards_generation() {
        let mut state = SaveState::default();
        let (tx, rx) = oneshot::channel();

        let generation = state.bump();
        let handle = tokio::spawn(async {});
        state.arm(generation, handle, vec![tx]);
        assert!(state.is_armed());

        // A stale generation must not claim the pending save.
        assert!(state.claim(generation - 1).is_none());
        assert!(state.is_armed());

        let waiters = state.cancel();
        assert_eq!(waiters.len(), 1);
        assert!(!state.is_armed());
        assert!(state.claim(generation).is_none());

        for w in waiters {
            let _ = w.send(SaveOutcome::cancelled());
        }
        assert_eq!(rx.await.unwrap(), SaveOutcome::cancelled());
    }
}
