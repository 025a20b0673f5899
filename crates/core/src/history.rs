//! Bounded undo history for the labeling session.
//!
//! The session keeps exactly [`HISTORY_DEPTH`] previously worked chips.
//! Pushing beyond the depth evicts the oldest entry; popping an empty
//! history yields `None`.

use std::collections::VecDeque;

/// Number of chips the annotator can step back through.
pub const HISTORY_DEPTH: usize = 1;

/// A fixed-capacity stack; the newest entry is on top.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    /// Create a history holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry, evicting the oldest one when full.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::with_capacity(HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_depth_keeps_only_latest() {
        let mut history = History::default();
        history.push("a");
        history.push("b");
        assert_eq!(history.len(), 1);
        assert_eq!(history.pop(), Some("b"));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn pop_on_empty_is_none() {
        let mut history: History<u32> = History::default();
        assert!(history.is_empty());
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn deeper_history_is_lifo() {
        let mut history = History::with_capacity(3);
        for n in 1..=4 {
            history.push(n);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.peek(), Some(&4));
        assert_eq!(history.pop(), Some(4));
        assert_eq!(history.pop(), Some(3));
        assert_eq!(history.pop(), Some(2));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let history: History<u8> = History::with_capacity(0);
        assert_eq!(history.capacity(), 1);
    }
}
