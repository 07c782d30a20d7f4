//! Undo/redo stack

use crate::entry::HistoryEntry;

pub const DEFAULT_CAPACITY: usize = 100;

/// Executes the commands stored in history entries.
pub trait Dispatch<C> {
    fn dispatch(&mut self, command: &C);
}

#[derive(Debug, Clone)]
pub struct HistoryStack<C> {
    entries: Vec<HistoryEntry<C>>,
    /// Index of the entry that produced the current state
    cursor: Option<usize>,
    capacity: usize,
}

impl<C> HistoryStack<C> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Record an entry whose forward command has already been applied.
    pub fn push(&mut self, entry: HistoryEntry<C>) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.entries.len() {
            tracing::debug!(
                discarded = self.entries.len() - keep,
                "Discarding redo entries"
            );
            self.entries.truncate(keep);
        }

        tracing::debug!(name = %entry.name, "History push");
        self.entries.push(entry);

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Undo one step. Returns `false` when already at the oldest entry.
    pub fn backward<D: Dispatch<C>>(&mut self, dispatcher: &mut D) -> bool {
        let cursor = match self.cursor {
            Some(c) if c > 0 => c,
            _ => return false,
        };

        let current = &self.entries[cursor];
        tracing::debug!(name = %current.name, "History backward");
        if let Some(command) = &current.backward {
            dispatcher.dispatch(command);
        }

        let previous = cursor - 1;
        self.cursor = Some(previous);

        let previous = &self.entries[previous];
        if previous.should_call_forward {
            if let Some(command) = &previous.forward {
                dispatcher.dispatch(command);
            }
        }

        true
    }

    /// Redo one step. Returns `false` when already at the newest entry.
    pub fn forward<D: Dispatch<C>>(&mut self, dispatcher: &mut D) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        let Some(entry) = self.entries.get(next) else {
            return false;
        };

        tracing::debug!(name = %entry.name, "History forward");
        if let Some(command) = &entry.forward {
            dispatcher.dispatch(command);
        }
        self.cursor = Some(next);

        true
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&HistoryEntry<C>> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn entries(&self) -> &[HistoryEntry<C>] {
        &self.entries
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

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

impl<C> Default for HistoryStack<C> {
    fn default() -> Self {
        Self::new()
    }
}
