//! Undo/redo over whole-state snapshots.
//!
//! The engine treats [`GraphState`] as a value, so history is a linear
//! list of snapshots with a cursor. After an undo the caller restores
//! the returned snapshot into the engine; the restore itself must not
//! be recorded as a new edit, so the manager suppresses the next push
//! while a restore is in flight.

use crate::domain::GraphState;
use tracing::debug;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded linear undo/redo stack.
#[derive(Debug)]
pub struct HistoryManager {
    snapshots: Vec<GraphState>,
    /// Index of the snapshot currently reflected in the engine.
    /// Meaningful only when `snapshots` is non-empty.
    cursor: usize,
    capacity: usize,
    /// Set by `undo`/`redo`; the next `push_state` is the engine
    /// re-recording the restored snapshot and is swallowed.
    restoring: bool,
}

impl HistoryManager {
    /// Create a manager retaining at most `capacity` snapshots.
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
            restoring: false,
        }
    }

    /// Record a snapshot after a mutation.
    ///
    /// Any redo branch beyond the cursor is discarded. When capacity is
    /// exceeded the oldest snapshot is evicted and the cursor shifted
    /// so the current snapshot is preserved. Suppressed (and the
    /// suppression cleared) while a restore is in flight.
    pub fn push_state(&mut self, state: GraphState) {
        if self.restoring {
            self.restoring = false;
            return;
        }

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(state);
        self.cursor = self.snapshots.len() - 1;

        if self.snapshots.len() > self.capacity {
            let excess = self.snapshots.len() - self.capacity;
            self.snapshots.drain(..excess);
            self.cursor -= excess;
            debug!(evicted = excess, "history capacity reached");
        }
    }

    /// Step back one snapshot, returning the state to restore.
    /// `None` when already at the oldest snapshot (or empty).
    pub fn undo(&mut self) -> Option<GraphState> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.restoring = true;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward one snapshot, returning the state to restore.
    /// `None` when already at the newest snapshot.
    pub fn redo(&mut self) -> Option<GraphState> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.restoring = true;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Whether an older snapshot exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor > 0
    }

    /// Whether a newer snapshot exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor + 1 < self.snapshots.len()
    }

    /// Clear the restore-in-flight flag without recording anything.
    ///
    /// For callers that restore a snapshot without funneling the change
    /// back through `push_state`.
    pub fn finish_restore(&mut self) {
        self.restoring = false;
    }

    /// Number of snapshots currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn named(name: &str) -> GraphState {
        GraphState::new(name)
    }

    #[test]
    fn undo_on_empty_history_returns_none() {
        let mut history = HistoryManager::new(10);
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
    }

    #[test]
    fn undo_returns_previous_snapshot() {
        let mut history = HistoryManager::new(10);
        history.push_state(named("first"));
        history.push_state(named("second"));

        let restored = history.undo().expect("one step back available");
        assert_eq!(restored.meta.name, "first");
        assert!(!history.can_undo());
        assert!(history.can_redo());
    }

    #[test]
    fn redo_returns_the_undone_snapshot() {
        let mut history = HistoryManager::new(10);
        history.push_state(named("first"));
        history.push_state(named("second"));
        history.undo();
        history.finish_restore();

        let restored = history.redo().expect("redo available");
        assert_eq!(restored.meta.name, "second");
        assert!(!history.can_redo());
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = HistoryManager::new(10);
        history.push_state(named("first"));
        history.push_state(named("second"));
        history.undo();
        history.finish_restore();

        history.push_state(named("third"));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);

        let restored = history.undo().expect("undo available");
        assert_eq!(restored.meta.name, "first");
    }

    #[test]
    fn push_during_restore_is_swallowed_once() {
        let mut history = HistoryManager::new(10);
        history.push_state(named("first"));
        history.push_state(named("second"));

        let restored = history.undo().expect("undo available");
        // The engine re-records the restored state; this must not
        // create a new entry or kill the redo branch.
        history.push_state(restored);
        assert_eq!(history.len(), 2);
        assert!(history.can_redo());

        // Subsequent pushes are recorded normally.
        history.push_state(named("third"));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn capacity_evicts_oldest_and_preserves_current() {
        let mut history = HistoryManager::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            history.push_state(named(name));
        }
        assert_eq!(history.len(), 3);

        let restored = history.undo().expect("undo available");
        assert_eq!(restored.meta.name, "d");
        history.finish_restore();
        let restored = history.undo().expect("undo available");
        assert_eq!(restored.meta.name, "c");
        assert!(!history.can_undo());
    }

    #[test]
    fn zero_capacity_is_treated_as_one() {
        let mut history = HistoryManager::new(0);
        history.push_state(named("only"));
        history.push_state(named("newer"));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    proptest! {
        /// The cursor stays in bounds and undo/redo stay symmetric
        /// under arbitrary interleavings of push, undo, and redo.
        #[test]
        fn cursor_stays_in_bounds(
            capacity in 1usize..8,
            ops in proptest::collection::vec(0u8..3, 0..64),
        ) {
            let mut history = HistoryManager::new(capacity);
            let mut counter = 0u32;
            for op in ops {
                match op {
                    0 => {
                        counter += 1;
                        history.push_state(named(&format!("s{counter}")));
                    }
                    1 => {
                        let could = history.can_undo();
                        let result = history.undo();
                        prop_assert_eq!(could, result.is_some());
                        history.finish_restore();
                    }
                    _ => {
                        let could = history.can_redo();
                        let result = history.redo();
                        prop_assert_eq!(could, result.is_some());
                        history.finish_restore();
                    }
                }
                prop_assert!(history.len() <= capacity);
                if !history.is_empty() {
                    prop_assert!(history.cursor < history.len());
                }
            }
        }
    }
}
