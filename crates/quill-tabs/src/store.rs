//! Tab store
//!
//! Owns every tab and group and keeps them consistent: each tab belongs to
//! exactly one group, members are kept sorted by order, emptied groups are
//! deleted and a group's active tab is one of its members.
//!
//! The store never records history. Callers that need undo capture the
//! inverse before mutating.

use std::collections::HashMap;

use crate::data::TabData;
use crate::error::TabError;
use crate::group::{GroupId, GroupUpdate, TabGroup};
use crate::kind::TabType;
use crate::order::{is_collapsed, order_at, renumbered, ORDER_STEP};
use crate::tab::{Tab, TabId};
use crate::Result;

/// Midpoint insertions into one group before its tabs are renumbered
pub const DEFAULT_RENORMALIZE_AFTER: usize = 32;

#[derive(Debug, Clone)]
pub struct TabStore {
    tabs: HashMap<TabId, Tab>,
    groups: HashMap<GroupId, TabGroup>,
    /// Members of each group, sorted by tab order
    members: HashMap<GroupId, Vec<TabId>>,
    active_group: Option<GroupId>,
    midpoint_inserts: HashMap<GroupId, usize>,
    renormalize_after: usize,
}

impl TabStore {
    pub fn new() -> Self {
        Self::with_renormalize_after(DEFAULT_RENORMALIZE_AFTER)
    }

    pub fn with_renormalize_after(renormalize_after: usize) -> Self {
        Self {
            tabs: HashMap::new(),
            groups: HashMap::new(),
            members: HashMap::new(),
            active_group: None,
            midpoint_inserts: HashMap::new(),
            renormalize_after: renormalize_after.max(1),
        }
    }

    // ---- queries ----

    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.get(tab_id)
    }

    pub fn group(&self, group_id: &str) -> Option<&TabGroup> {
        self.groups.get(group_id)
    }

    pub fn contains_tab(&self, tab_id: &str) -> bool {
        self.tabs.contains_key(tab_id)
    }

    pub fn contains_group(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.values()
    }

    /// Member ids of a group in display order
    pub fn tab_ids(&self, group_id: &str) -> &[TabId] {
        self.members.get(group_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_tabs(&self, group_id: &str) -> Vec<&Tab> {
        self.tab_ids(group_id)
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .collect()
    }

    pub fn group_of(&self, tab_id: &str) -> Option<&GroupId> {
        self.members
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| id == tab_id))
            .map(|(group_id, _)| group_id)
    }

    pub fn tab_index(&self, group_id: &str, tab_id: &str) -> Option<usize> {
        self.tab_ids(group_id).iter().position(|id| id == tab_id)
    }

    /// First tab in the group displaying the given entity
    pub fn find_entity(&self, group_id: &str, entity_id: &str) -> Option<&Tab> {
        self.group_tabs(group_id)
            .into_iter()
            .find(|tab| tab.entity_id == entity_id)
    }

    /// Tabs of one kind, in group then tab order
    pub fn tabs_of_type(&self, tab_type: TabType) -> Vec<&Tab> {
        self.groups()
            .into_iter()
            .flat_map(|group| self.group_tabs(&group.id))
            .filter(|tab| tab.tab_type == tab_type)
            .collect()
    }

    /// Every group sorted by order, including ones that are momentarily empty
    pub fn all_groups(&self) -> Vec<&TabGroup> {
        let mut groups: Vec<&TabGroup> = self.groups.values().collect();
        groups.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        groups
    }

    /// Groups with at least one tab, sorted by order
    pub fn groups(&self) -> Vec<&TabGroup> {
        self.all_groups()
            .into_iter()
            .filter(|g| !self.tab_ids(&g.id).is_empty())
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups().len()
    }

    /// The group with focus. Falls back to the leftmost non-empty group.
    pub fn active_group(&self) -> Option<&TabGroup> {
        self.active_group
            .as_ref()
            .and_then(|id| self.groups.get(id))
            .or_else(|| self.groups().into_iter().next())
    }

    pub fn active_group_id(&self) -> Option<&GroupId> {
        self.active_group().map(|g| &g.id)
    }

    /// Active tab of a group, healing a stale pointer to the first member
    pub fn active_tab_in(&self, group_id: &str) -> Option<&TabId> {
        let ids = self.members.get(group_id)?;
        let group = self.groups.get(group_id)?;
        match &group.active_tab {
            Some(id) if ids.contains(id) => Some(id),
            _ => ids.first(),
        }
    }

    /// The focused tab, always the active tab of the active group
    pub fn active_tab_id(&self) -> Option<&TabId> {
        let group = self.active_group()?;
        self.active_tab_in(&group.id)
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id().and_then(|id| self.tabs.get(id))
    }

    pub fn is_single_tab_open(&self) -> bool {
        self.tabs.len() == 1
    }

    pub fn left_group(&self, group_id: &str) -> Option<&TabGroup> {
        let groups = self.all_groups();
        let pos = groups.iter().position(|g| g.id == group_id)?;
        pos.checked_sub(1).map(|i| groups[i])
    }

    pub fn right_group(&self, group_id: &str) -> Option<&TabGroup> {
        let groups = self.all_groups();
        let pos = groups.iter().position(|g| g.id == group_id)?;
        groups.get(pos + 1).copied()
    }

    // ---- groups ----

    pub fn insert_group(&mut self, group: TabGroup) -> bool {
        if self.groups.contains_key(&group.id) {
            tracing::warn!(group_id = %group.id, "Group already exists");
            return false;
        }

        tracing::debug!(group_id = %group.id, order = group.order, width = group.width, "Inserted group");
        self.members.insert(group.id.clone(), Vec::new());
        self.groups.insert(group.id.clone(), group);
        true
    }

    pub fn create_group(&mut self, order: f64, width: u32) -> GroupId {
        let group = TabGroup::new(order, width);
        let group_id = group.id.clone();
        self.insert_group(group);
        group_id
    }

    /// Sets the focused group. Unknown ids are ignored.
    pub fn set_active_group(&mut self, group_id: &str) -> bool {
        if !self.groups.contains_key(group_id) {
            tracing::debug!(group_id, "Ignoring focus of unknown group");
            return false;
        }
        self.active_group = Some(group_id.to_string());
        true
    }

    pub fn update_group(&mut self, group_id: &str, update: GroupUpdate) -> bool {
        if !self.groups.contains_key(group_id) {
            return false;
        }

        if let Some(tabs) = update.tabs {
            let current = self.members.get(group_id).cloned().unwrap_or_default();
            let mut sequence: Vec<TabId> = Vec::with_capacity(tabs.len());
            for id in tabs {
                if current.contains(&id) && !sequence.contains(&id) {
                    sequence.push(id);
                } else if !current.contains(&id) {
                    tracing::warn!(group_id, tab_id = %id, "Ignoring tab that is not a member");
                }
            }
            for dropped in current.iter().filter(|id| !sequence.contains(id)) {
                self.tabs.remove(dropped);
            }

            if sequence.is_empty() {
                self.delete_group(group_id);
                return true;
            }

            for (id, order) in sequence.iter().zip(renumbered(sequence.len())) {
                if let Some(tab) = self.tabs.get_mut(id) {
                    tab.order = order;
                }
            }
            self.members.insert(group_id.to_string(), sequence);
            self.midpoint_inserts.remove(group_id);
        }

        let members = self.tab_ids(group_id).to_vec();
        if let Some(group) = self.groups.get_mut(group_id) {
            if let Some(order) = update.order {
                group.order = order;
            }
            if let Some(width) = update.width {
                group.width = width;
            }
            if let Some(group_data) = update.group_data {
                group.group_data = group_data;
            }
            if let Some(active) = update.active_tab {
                if members.contains(&active) {
                    group.active_tab = Some(active);
                }
            }
        }
        self.heal_active_tab(group_id);
        true
    }

    /// Deep merge into the state a group remembers for an entity
    pub fn update_group_data(&mut self, group_id: &str, entity_id: &str, data: &TabData) -> bool {
        match self.groups.get_mut(group_id) {
            Some(group) => {
                group.merge_entity_data(entity_id, data);
                true
            }
            None => false,
        }
    }

    /// Remove a group and hand focus to its left neighbour, or the right one
    /// when it was leftmost.
    pub fn delete_group(&mut self, group_id: &str) {
        if !self.groups.contains_key(group_id) {
            return;
        }

        let sibling = {
            let groups = self.all_groups();
            let pos = groups.iter().position(|g| g.id == group_id);
            pos.and_then(|p| {
                if p > 0 {
                    groups.get(p - 1)
                } else {
                    groups.get(p + 1)
                }
            })
            .map(|g| g.id.clone())
        };

        self.remove_group(group_id);

        match sibling {
            Some(sibling) => {
                self.heal_active_tab(&sibling);
                self.active_group = Some(sibling);
            }
            None => self.active_group = None,
        }
    }

    /// Remove a group and its tabs without reassigning focus.
    pub fn remove_group(&mut self, group_id: &str) -> Option<TabGroup> {
        let group = self.groups.remove(group_id)?;
        for tab_id in self.members.remove(group_id).unwrap_or_default() {
            self.tabs.remove(&tab_id);
        }
        self.midpoint_inserts.remove(group_id);
        if self.active_group.as_deref() == Some(group_id) {
            self.active_group = None;
        }

        tracing::debug!(group_id, "Removed group");
        Some(group)
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.groups.clear();
        self.members.clear();
        self.midpoint_inserts.clear();
        self.active_group = None;
    }

    // ---- tabs ----

    /// Append a tab to a group. Duplicate ids are ignored.
    pub fn add_tab(&mut self, mut tab: Tab, group_id: &str, activate: bool) -> bool {
        if self.tabs.contains_key(&tab.id) {
            tracing::debug!(tab_id = %tab.id, "Tab already exists");
            return false;
        }
        let Some(members) = self.members.get_mut(group_id) else {
            tracing::warn!(group_id, "Cannot add tab to unknown group");
            return false;
        };

        let mut order = members.len() as f64 * ORDER_STEP;
        if let Some(last) = members.last().and_then(|id| self.tabs.get(id)) {
            if order <= last.order {
                order = last.order + ORDER_STEP;
            }
        }
        tab.order = order;

        let tab_id = tab.id.clone();
        members.push(tab_id.clone());
        self.tabs.insert(tab_id.clone(), tab);

        if activate {
            self.activate_tab_in_group(&tab_id, group_id);
            self.set_active_group(group_id);
        }
        true
    }

    /// Add a tab at a position within a group
    pub fn insert_tab_at(&mut self, tab: Tab, group_id: &str, index: usize, activate: bool) -> bool {
        let tab_id = tab.id.clone();
        if !self.add_tab(tab, group_id, activate) {
            return false;
        }
        self.update_tab_order(&tab_id, group_id, index);
        true
    }

    /// Move a member to `index` among the group's other tabs
    pub fn update_tab_order(&mut self, tab_id: &str, group_id: &str, index: usize) {
        let Some(members) = self.members.get(group_id) else {
            return;
        };
        if !members.iter().any(|id| id == tab_id) {
            return;
        }

        let mut sequence: Vec<TabId> = members.iter().filter(|id| *id != tab_id).cloned().collect();
        let others: Vec<f64> = sequence.iter().map(|id| self.order_of(id)).collect();
        let index = index.min(sequence.len());
        let order = order_at(&others, index);
        let prev = index.checked_sub(1).map(|i| others[i]);
        let next = others.get(index).copied();
        sequence.insert(index, tab_id.to_string());

        let inserts = self.midpoint_inserts.entry(group_id.to_string()).or_insert(0);
        if prev.is_some() && next.is_some() {
            *inserts += 1;
        }
        let renumber = is_collapsed(prev, order, next) || *inserts >= self.renormalize_after;

        if renumber {
            *inserts = 0;
            tracing::debug!(group_id, tabs = sequence.len(), "Renumbering tab order");
            for (id, order) in sequence.iter().zip(renumbered(sequence.len())) {
                if let Some(tab) = self.tabs.get_mut(id) {
                    tab.order = order;
                }
            }
        } else if let Some(tab) = self.tabs.get_mut(tab_id) {
            tab.order = order;
        }

        self.members.insert(group_id.to_string(), sequence);
    }

    /// Remove a tab. Closing the last tab of a group deletes the group.
    pub fn close(&mut self, tab_id: &str, group_id: &str) -> Option<Tab> {
        let members = self.members.get(group_id)?;
        let index = members.iter().position(|id| id == tab_id)?;

        if members.len() == 1 {
            let tab = self.tabs.remove(tab_id);
            if let Some(members) = self.members.get_mut(group_id) {
                members.clear();
            }
            self.delete_group(group_id);
            tracing::debug!(tab_id, group_id, "Closed last tab of group");
            return tab;
        }

        let was_active = self.active_tab_in(group_id).is_some_and(|id| id == tab_id);
        self.detach(tab_id, group_id, index, was_active);
        tracing::debug!(tab_id, group_id, "Closed tab");
        self.tabs.remove(tab_id)
    }

    /// Move a tab to `index` in another group. Emptied source groups are
    /// deleted. The active tab of the source stays active in the destination,
    /// which takes focus.
    pub fn move_tab(&mut self, tab_id: &str, source_id: &str, destination_id: &str, index: usize) -> bool {
        if source_id == destination_id {
            self.update_tab_order(tab_id, destination_id, index);
            return true;
        }
        if !self.groups.contains_key(destination_id) {
            return false;
        }
        let Some(position) = self.tab_index(source_id, tab_id) else {
            return false;
        };

        let was_active = self.active_tab_in(source_id).is_some_and(|id| id == tab_id);

        if self.tab_ids(source_id).len() == 1 {
            if let Some(members) = self.members.get_mut(source_id) {
                members.clear();
            }
            self.delete_group(source_id);
        } else {
            self.detach(tab_id, source_id, position, was_active);
        }

        self.members
            .entry(destination_id.to_string())
            .or_default()
            .push(tab_id.to_string());
        self.update_tab_order(tab_id, destination_id, index);

        let destination_has_active = self
            .groups
            .get(destination_id)
            .and_then(|g| g.active_tab.as_ref())
            .is_some_and(|id| id != tab_id && self.tab_ids(destination_id).contains(id));
        if was_active || !destination_has_active {
            self.activate_tab_in_group(tab_id, destination_id);
        }
        if was_active {
            self.active_group = Some(destination_id.to_string());
        }

        tracing::debug!(tab_id, source_id, destination_id, index, "Moved tab");
        true
    }

    /// Replace the active tab of a group in place, keeping its position
    pub fn replace_active_tab(&mut self, mut tab: Tab, group_id: &str) -> bool {
        if !self.groups.contains_key(group_id) || self.tabs.contains_key(&tab.id) {
            return false;
        }
        let Some(old_id) = self.active_tab_in(group_id).cloned() else {
            return self.add_tab(tab, group_id, true);
        };
        let Some(old) = self.tabs.remove(&old_id) else {
            return false;
        };

        tab.order = old.order;
        let new_id = tab.id.clone();
        if let Some(members) = self.members.get_mut(group_id) {
            for id in members.iter_mut().filter(|id| **id == old_id) {
                *id = new_id.clone();
            }
        }
        self.tabs.insert(new_id.clone(), tab);
        if let Some(group) = self.groups.get_mut(group_id) {
            group.active_tab = Some(new_id);
        }
        self.active_group = Some(group_id.to_string());
        true
    }

    /// Focus a tab wherever it lives
    pub fn activate_tab(&mut self, tab_id: &str) -> bool {
        let Some(group_id) = self.group_of(tab_id).cloned() else {
            return false;
        };
        self.activate_tab_in_group(tab_id, &group_id);
        self.active_group = Some(group_id);
        true
    }

    /// Make a member the group's active tab without moving focus
    pub fn activate_tab_in_group(&mut self, tab_id: &str, group_id: &str) -> bool {
        if !self.tab_ids(group_id).iter().any(|id| id == tab_id) {
            return false;
        }
        match self.groups.get_mut(group_id) {
            Some(group) => {
                group.active_tab = Some(tab_id.to_string());
                true
            }
            None => false,
        }
    }

    pub fn update_tab_data(&mut self, tab_id: &str, patch: &TabData) -> bool {
        match self.tabs.get_mut(tab_id) {
            Some(tab) => {
                tab.merge_data(patch);
                true
            }
            None => false,
        }
    }

    pub fn replace_tab_data(&mut self, tab_id: &str, data: TabData) -> bool {
        match self.tabs.get_mut(tab_id) {
            Some(tab) => {
                tab.data = data;
                true
            }
            None => false,
        }
    }

    /// Check every structural invariant of the store
    pub fn validate(&self) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for (group_id, ids) in &self.members {
            let group = self
                .groups
                .get(group_id)
                .ok_or_else(|| integrity(format!("membership for unknown group {group_id}")))?;
            if ids.is_empty() {
                return Err(integrity(format!("group {group_id} is empty")));
            }

            let mut last: Option<f64> = None;
            for id in ids {
                let tab = self
                    .tabs
                    .get(id)
                    .ok_or_else(|| integrity(format!("group {group_id} lists missing tab {id}")))?;
                if let Some(other) = owners.insert(id.as_str(), group_id.as_str()) {
                    return Err(integrity(format!(
                        "tab {id} belongs to {other} and {group_id}"
                    )));
                }
                if last.is_some_and(|l| tab.order <= l) {
                    return Err(integrity(format!("tabs of {group_id} are out of order")));
                }
                last = Some(tab.order);
            }

            if let Some(active) = &group.active_tab {
                if !ids.contains(active) {
                    return Err(integrity(format!(
                        "active tab {active} is not a member of {group_id}"
                    )));
                }
            }
        }

        if let Some(group_id) = self.groups.keys().find(|id| !self.members.contains_key(*id)) {
            return Err(integrity(format!("group {group_id} has no membership")));
        }
        if owners.len() != self.tabs.len() {
            return Err(integrity("tab without a group".to_string()));
        }
        if let Some(active) = &self.active_group {
            if !self.groups.contains_key(active) {
                return Err(integrity(format!("active group {active} does not exist")));
            }
        }

        Ok(())
    }

    fn order_of(&self, tab_id: &str) -> f64 {
        self.tabs.get(tab_id).map_or(0.0, |tab| tab.order)
    }

    /// Drop a member from a group that keeps other tabs, passing the active
    /// pointer to the previous tab (or the next one when it was first).
    fn detach(&mut self, tab_id: &str, group_id: &str, index: usize, was_active: bool) {
        let Some(members) = self.members.get_mut(group_id) else {
            return;
        };
        if members.get(index).map(String::as_str) != Some(tab_id) {
            return;
        }
        members.remove(index);
        let successor = members.get(index.saturating_sub(1)).cloned();

        if let Some(group) = self.groups.get_mut(group_id) {
            if was_active || group.active_tab.as_deref() == Some(tab_id) {
                group.active_tab = successor;
            }
        }
    }

    fn heal_active_tab(&mut self, group_id: &str) {
        let healed = self.active_tab_in(group_id).cloned();
        if let Some(group) = self.groups.get_mut(group_id) {
            group.active_tab = healed;
        }
    }
}

impl Default for TabStore {
    fn default() -> Self {
        Self::new()
    }
}

fn integrity(message: String) -> TabError {
    TabError::Integrity(message)
}
