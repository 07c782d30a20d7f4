//! Tab groups (panes)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::data::{merge_deep, TabData};
use crate::tab::{EntityId, TabId};

pub type GroupId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: GroupId,
    /// Left-to-right position among groups
    pub order: f64,
    /// Pane width in pixels
    pub width: u32,
    /// Tab shown in this pane
    #[serde(default)]
    pub active_tab: Option<TabId>,
    /// Display state remembered per entity, used to seed tabs opened here
    #[serde(default)]
    pub group_data: HashMap<EntityId, TabData>,
}

impl TabGroup {
    pub fn new(order: f64, width: u32) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), order, width)
    }

    pub fn with_id(id: impl Into<GroupId>, order: f64, width: u32) -> Self {
        Self {
            id: id.into(),
            order,
            width,
            active_tab: None,
            group_data: HashMap::new(),
        }
    }

    pub fn entity_data(&self, entity_id: &str) -> Option<&TabData> {
        self.group_data.get(entity_id)
    }

    /// Deep merge into the remembered state of one entity
    pub fn merge_entity_data(&mut self, entity_id: &str, data: &TabData) {
        let entry = self.group_data.entry(entity_id.to_string()).or_default();
        merge_deep(entry, data);
    }
}

/// Partial update applied with [`crate::TabStore::update_group`].
///
/// Setting `tabs` replaces the membership wholesale, in the given sequence.
/// An empty list deletes the group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub order: Option<f64>,
    pub width: Option<u32>,
    pub active_tab: Option<TabId>,
    pub group_data: Option<HashMap<EntityId, TabData>>,
    pub tabs: Option<Vec<TabId>>,
}

impl GroupUpdate {
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            ..Default::default()
        }
    }

    pub fn tabs(tabs: Vec<TabId>) -> Self {
        Self {
            tabs: Some(tabs),
            ..Default::default()
        }
    }

    pub fn active_tab(tab_id: impl Into<TabId>) -> Self {
        Self {
            active_tab: Some(tab_id.into()),
            ..Default::default()
        }
    }
}
