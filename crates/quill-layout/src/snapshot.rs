//! Persisted layout shape

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use quill_tabs::{EntityId, GroupId, Tab, TabData, TabGroup, TabId, TabStore, TabType};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedLayout {
    /// Groups in left-to-right order
    pub groups: Vec<PersistedGroup>,
    #[serde(default)]
    pub active_group: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGroup {
    pub id: GroupId,
    pub order: f64,
    pub width: u32,
    #[serde(default)]
    pub active_tab: Option<TabId>,
    #[serde(default)]
    pub group_data: HashMap<EntityId, TabData>,
    /// Tabs in display order
    #[serde(default)]
    pub tabs: Vec<PersistedTab>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTab {
    pub id: TabId,
    pub entity_id: EntityId,
    #[serde(rename = "type")]
    pub tab_type: TabType,
    #[serde(default)]
    pub data: TabData,
}

impl From<&Tab> for PersistedTab {
    fn from(tab: &Tab) -> Self {
        Self {
            id: tab.id.clone(),
            entity_id: tab.entity_id.clone(),
            tab_type: tab.tab_type,
            data: tab.data.clone(),
        }
    }
}

impl PersistedTab {
    pub fn into_tab(self) -> Tab {
        Tab::with_id(self.id, self.entity_id, self.tab_type).with_data(self.data)
    }
}

impl PersistedLayout {
    /// Capture the non-empty groups of a store
    pub fn capture(store: &TabStore) -> Self {
        let groups = store
            .groups()
            .into_iter()
            .map(|group| PersistedGroup {
                id: group.id.clone(),
                order: group.order,
                width: group.width,
                active_tab: store.active_tab_in(&group.id).cloned(),
                group_data: group.group_data.clone(),
                tabs: store
                    .group_tabs(&group.id)
                    .into_iter()
                    .map(PersistedTab::from)
                    .collect(),
            })
            .collect();

        Self {
            groups,
            active_group: store.active_group_id().cloned(),
        }
    }

    /// A layout can be restored when its first group has tabs.
    pub fn is_restorable(&self) -> bool {
        self.groups.first().is_some_and(|g| !g.tabs.is_empty())
    }

    pub fn tab_count(&self) -> usize {
        self.groups.iter().map(|g| g.tabs.len()).sum()
    }

    /// Rebuild the layout into an empty store. Groups without tabs are
    /// skipped. Returns the number of groups restored.
    pub fn restore_into(&self, store: &mut TabStore) -> usize {
        let mut restored = 0;

        for persisted in &self.groups {
            if persisted.tabs.is_empty() {
                tracing::debug!(group_id = %persisted.id, "Skipping empty persisted group");
                continue;
            }

            let mut group = TabGroup::with_id(persisted.id.clone(), persisted.order, persisted.width);
            group.group_data = persisted.group_data.clone();
            if !store.insert_group(group) {
                continue;
            }

            for tab in &persisted.tabs {
                store.add_tab(tab.clone().into_tab(), &persisted.id, false);
            }
            if store.tab_ids(&persisted.id).is_empty() {
                // every tab id was a duplicate of one restored earlier
                store.remove_group(&persisted.id);
                continue;
            }

            if let Some(active) = &persisted.active_tab {
                store.activate_tab_in_group(active, &persisted.id);
            }
            restored += 1;
        }

        let focus = self
            .active_group
            .clone()
            .filter(|id| store.contains_group(id))
            .or_else(|| store.groups().first().map(|g| g.id.clone()));
        if let Some(group_id) = focus {
            store.set_active_group(&group_id);
        }

        restored
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_store() -> TabStore {
        let mut store = TabStore::new();
        store.insert_group(TabGroup::with_id("g1", 0.0, 600));
        store.insert_group(TabGroup::with_id("g2", 500.0, 420));
        store.add_tab(Tab::with_id("a", "doc-a", TabType::Document), "g1", false);
        store.add_tab(Tab::with_id("b", "doc-b", TabType::Document), "g1", false);
        store.add_tab(Tab::with_id("c", "day", TabType::MyDay), "g2", false);
        store.activate_tab_in_group("b", "g1");
        store.update_tab_order("b", "g1", 0);
        store.update_group_data("g1", "doc-a", json!({"panelOpen": true}).as_object().unwrap());
        store.set_active_group("g2");
        store
    }

    #[test]
    fn test_capture_and_restore_round_trip() {
        let store = sample_store();
        let layout = PersistedLayout::capture(&store);

        assert_eq!(layout.groups.len(), 2);
        assert_eq!(layout.groups[0].active_tab.as_deref(), Some("b"));
        let order: Vec<&str> = layout.groups[0].tabs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(layout.active_group.as_deref(), Some("g2"));

        let mut restored = TabStore::new();
        assert_eq!(layout.restore_into(&mut restored), 2);
        assert_eq!(PersistedLayout::capture(&restored), layout);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn test_restore_skips_empty_groups() {
        let layout: PersistedLayout = serde_json::from_value(json!({
            "groups": [
                {"id": "g1", "order": 0.0, "width": 600, "tabs": []},
                {"id": "g2", "order": 500.0, "width": 600, "tabs": [
                    {"id": "t1", "entity_id": "e1", "type": "view"}
                ]}
            ]
        }))
        .unwrap();
        assert!(!layout.is_restorable());

        let mut store = TabStore::new();
        assert_eq!(layout.restore_into(&mut store), 1);
        assert!(!store.contains_group("g1"));
        assert_eq!(store.active_group_id().unwrap(), "g2");
        assert_eq!(store.active_tab_id().unwrap(), "t1");
    }

    #[test]
    fn test_json_round_trip_defaults_optional_fields() {
        let json = r#"{"groups":[{"id":"g1","order":0,"width":600,
            "tabs":[{"id":"t1","entity_id":"e1","type":"document"}]}]}"#;
        let layout = PersistedLayout::from_json(json).unwrap();
        assert_eq!(layout.active_group, None);
        assert_eq!(layout.groups[0].active_tab, None);
        assert_eq!(layout.tab_count(), 1);

        let again = PersistedLayout::from_json(&layout.to_json().unwrap()).unwrap();
        assert_eq!(again, layout);
    }
}
