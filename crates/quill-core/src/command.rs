//! Layout commands
//!
//! History entries store commands as plain values. Each command names the
//! tabs and groups it touches and carries full snapshots where it may need
//! to recreate them, so replaying it later rebuilds the same ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use quill_tabs::{EntityId, GroupId, Tab, TabData, TabGroup, TabId};

/// Enough of a group to recreate it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: GroupId,
    pub order: f64,
    pub width: u32,
    #[serde(default)]
    pub group_data: HashMap<EntityId, TabData>,
}

impl GroupSpec {
    pub fn of(group: &TabGroup) -> Self {
        Self {
            id: group.id.clone(),
            order: group.order,
            width: group.width,
            group_data: group.group_data.clone(),
        }
    }

    pub fn to_group(&self) -> TabGroup {
        let mut group = TabGroup::with_id(self.id.clone(), self.order, self.width);
        group.group_data = self.group_data.clone();
        group
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum LayoutCommand {
    /// Recreate a group if it no longer exists
    EnsureGroup { group: GroupSpec },
    /// Insert a tab at a position. `activate` makes it the group's active tab.
    InsertTab {
        tab: Tab,
        group_id: GroupId,
        index: usize,
        activate: bool,
    },
    RemoveTab { tab_id: TabId, group_id: GroupId },
    /// Swap one member for another in the same slot
    ReplaceTab {
        group_id: GroupId,
        old_tab_id: TabId,
        tab: Tab,
    },
    MoveTab {
        tab_id: TabId,
        source_id: GroupId,
        destination_id: GroupId,
        index: usize,
    },
    /// Make a tab its group's active tab and focus the group
    ActivateTab { tab_id: TabId, group_id: GroupId },
    FocusGroup { group_id: GroupId },
    SetWidths { widths: Vec<(GroupId, u32)> },
    SetOrders { orders: Vec<(GroupId, f64)> },
    /// Replace a group's remembered per-entity data
    SetGroupData {
        group_id: GroupId,
        group_data: HashMap<EntityId, TabData>,
    },
    UpdateTabData { tab_id: TabId, data: TabData },
    ReplaceTabData { tab_id: TabId, data: TabData },
    Batch(Vec<LayoutCommand>),
}

impl LayoutCommand {
    pub fn batch(commands: impl IntoIterator<Item = LayoutCommand>) -> Self {
        let mut commands: Vec<LayoutCommand> = commands.into_iter().collect();
        if commands.len() == 1 {
            return commands.remove(0);
        }
        LayoutCommand::Batch(commands)
    }

    pub fn activate(tab_id: impl Into<TabId>, group_id: impl Into<GroupId>) -> Self {
        LayoutCommand::ActivateTab {
            tab_id: tab_id.into(),
            group_id: group_id.into(),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutCommand::EnsureGroup { .. } => "ensure_group",
            LayoutCommand::InsertTab { .. } => "insert_tab",
            LayoutCommand::RemoveTab { .. } => "remove_tab",
            LayoutCommand::ReplaceTab { .. } => "replace_tab",
            LayoutCommand::MoveTab { .. } => "move_tab",
            LayoutCommand::ActivateTab { .. } => "activate_tab",
            LayoutCommand::FocusGroup { .. } => "focus_group",
            LayoutCommand::SetWidths { .. } => "set_widths",
            LayoutCommand::SetOrders { .. } => "set_orders",
            LayoutCommand::SetGroupData { .. } => "set_group_data",
            LayoutCommand::UpdateTabData { .. } => "update_tab_data",
            LayoutCommand::ReplaceTabData { .. } => "replace_tab_data",
            LayoutCommand::Batch(_) => "batch",
        }
    }
}
