//! Drag gesture state

use serde::{Deserialize, Serialize};

use quill_tabs::{GroupId, TabId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { tab_id: TabId, origin_group: GroupId },
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    /// Take the current state, leaving `Idle` behind
    pub fn take(&mut self) -> DragState {
        std::mem::take(self)
    }
}

/// Where a dragged tab was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropTarget {
    /// Left edge of a pane: split to its left
    Left(GroupId),
    /// Right edge of a pane: split to its right
    Right(GroupId),
    /// Body of a pane: join it
    Center(GroupId),
    /// Tab strip of a pane at a position
    Index { group_id: GroupId, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_resets_to_idle() {
        let mut state = DragState::Dragging {
            tab_id: "t1".to_string(),
            origin_group: "g1".to_string(),
        };
        assert!(state.is_dragging());

        let taken = state.take();
        assert!(taken.is_dragging());
        assert_eq!(state, DragState::Idle);
    }
}
