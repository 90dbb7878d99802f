//! Bounded undo/redo history of immutable snapshots.

use std::collections::VecDeque;

#[cfg(test)]
mod tests;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Two-sided snapshot stack with FIFO eviction at capacity.
///
/// `undo` and `redo` exchange snapshots with the caller: the state being
/// replaced goes onto the opposite stack, so an undo immediately followed by a
/// redo reinstalls exactly what was current before the undo. Together the two
/// stacks never hold more than `max_size` entries.
#[derive(Debug, Clone)]
pub struct HistoryStack<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    max_size: usize,
}

impl<T> Default for HistoryStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<T> HistoryStack<T> {
    /// A capacity of zero is raised to one.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            undo: VecDeque::with_capacity(max_size),
            redo: Vec::new(),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records `state` as the newest undo entry. Returns the evicted oldest
    /// entry when the stack was full. Always clears the redo side.
    pub fn push(&mut self, state: T) -> Option<T> {
        let evicted = if self.undo.len() >= self.max_size {
            self.undo.pop_front()
        } else {
            None
        };
        self.undo.push_back(state);
        self.redo.clear();
        evicted
    }

    /// Pops the most recent undo entry, parking `current` on the redo side.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Pops the most recent redo entry, parking `current` on the undo side.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &T> {
        self.undo.iter()
    }
}
