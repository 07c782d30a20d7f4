//! History entry

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<C> {
    /// Human-readable label, used for logging
    pub name: String,
    /// Replay `forward` when undo lands on this entry
    pub should_call_forward: bool,
    pub forward: Option<C>,
    pub backward: Option<C>,
}

impl<C> HistoryEntry<C> {
    pub fn new(name: impl Into<String>, forward: C, backward: C) -> Self {
        Self {
            name: name.into(),
            should_call_forward: false,
            forward: Some(forward),
            backward: Some(backward),
        }
    }

    /// An entry that can be redone but has no inverse of its own.
    pub fn forward_only(name: impl Into<String>, forward: C) -> Self {
        Self {
            name: name.into(),
            should_call_forward: false,
            forward: Some(forward),
            backward: None,
        }
    }

    /// Mark the entry so that undoing the entry after it re-applies this one.
    pub fn replay_on_undo(mut self) -> Self {
        self.should_call_forward = true;
        self
    }
}
