// ABOUTME: Bounded linear undo/redo buffer over full-document snapshots.
// ABOUTME: set() truncates the redo tail and evicts the oldest entry past capacity.

use std::collections::VecDeque;

use thiserror::Error;

/// Number of snapshots kept per editing session unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history must contain at least one entry")]
    Empty,
}

/// Linear undo/redo history. Always holds at least one entry, and
/// `index < len() <= capacity()`.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: VecDeque<T>,
    index: usize,
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// Start a history with a single entry. A capacity of zero is treated as one.
    pub fn new(initial: T, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.clamp(1, DEFAULT_HISTORY_CAPACITY));
        entries.push_back(initial);
        Self {
            entries,
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a history from persisted parts. Oldest entries beyond
    /// `capacity` are dropped and the index is re-based and clamped.
    pub fn from_parts(entries: Vec<T>, index: usize, capacity: usize) -> Result<Self, HistoryError> {
        if entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        let capacity = capacity.max(1);
        let mut entries: VecDeque<T> = entries.into();
        let overflow = entries.len().saturating_sub(capacity);
        entries.drain(..overflow);
        let index = index.saturating_sub(overflow).min(entries.len() - 1);
        Ok(Self {
            entries,
            index,
            capacity,
        })
    }

    /// Record a new state: discard anything redoable, append, evict the
    /// oldest entry if over capacity, and point at the new tail.
    pub fn set(&mut self, state: T) {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(state);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back one entry. Returns false (and does nothing) at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one entry. Returns false (and does nothing) at the newest entry.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Discard all history and start over from `state`.
    pub fn reset(&mut self, state: T) {
        self.entries.clear();
        self.entries.push_back(state);
        self.index = 0;
    }

    pub fn current(&self) -> &T {
        &self.entries[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest-first, for persistence.
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_has_one_entry_and_cannot_move() {
        let mut h = HistoryBuffer::new("a", 10);
        assert_eq!(h.len(), 1);
        assert_eq!(h.index(), 0);
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(*h.current(), "a");
    }

    #[test]
    fn undo_then_redo_returns_to_prior_state() {
        for cap in 1..8 {
            for pushes in 0..cap {
                let mut h = HistoryBuffer::new(0, cap);
                for v in 1..=pushes {
                    h.set(v);
                }
                let before = *h.current();
                let moved = h.undo();
                if moved {
                    assert!(h.redo());
                }
                assert_eq!(*h.current(), before, "cap {} pushes {}", cap, pushes);
            }
        }
    }

    #[test]
    fn length_never_exceeds_capacity_and_evicts_oldest() {
        let mut h = HistoryBuffer::new(0, 3);
        h.set(1);
        h.set(2);
        assert_eq!(h.entries().copied().collect::<Vec<_>>(), vec![0, 1, 2]);

        h.set(3);
        assert_eq!(h.len(), 3);
        assert_eq!(h.entries().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(h.index(), 2);

        for v in 4..20 {
            h.set(v);
            assert!(h.len() <= 3);
            assert_eq!(h.index(), h.len() - 1);
        }
        assert_eq!(h.entries().copied().collect::<Vec<_>>(), vec![17, 18, 19]);
    }

    #[test]
    fn set_after_undo_discards_redo_tail() {
        let mut h = HistoryBuffer::new("a", 10);
        h.set("b");
        h.set("c");
        assert!(h.undo());
        assert!(h.undo());
        assert_eq!(*h.current(), "a");

        h.set("d");
        assert_eq!(h.entries().copied().collect::<Vec<_>>(), vec!["a", "d"]);
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_and_redo_clamp_at_bounds() {
        let mut h = HistoryBuffer::new(1, 5);
        h.set(2);
        assert!(h.undo());
        assert!(!h.undo());
        assert_eq!(*h.current(), 1);
        assert!(h.redo());
        assert!(!h.redo());
        assert_eq!(*h.current(), 2);
    }

    #[test]
    fn reset_discards_everything() {
        let mut h = HistoryBuffer::new(1, 5);
        h.set(2);
        h.set(3);
        h.undo();
        h.reset(9);
        assert_eq!(h.len(), 1);
        assert_eq!(h.index(), 0);
        assert_eq!(*h.current(), 9);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn zero_capacity_behaves_as_one() {
        let mut h = HistoryBuffer::new(1, 0);
        h.set(2);
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.len(), 1);
        assert_eq!(*h.current(), 2);
    }

    #[test]
    fn from_parts_trims_and_rebases() {
        let h = HistoryBuffer::from_parts(vec![1, 2, 3, 4, 5], 3, 3).unwrap();
        assert_eq!(h.entries().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(h.index(), 1);
        assert_eq!(*h.current(), 4);

        let clamped = HistoryBuffer::from_parts(vec![1, 2], 7, 10).unwrap();
        assert_eq!(clamped.index(), 1);

        assert_eq!(
            HistoryBuffer::<i32>::from_parts(vec![], 0, 3).unwrap_err(),
            HistoryError::Empty
        );
    }
}
