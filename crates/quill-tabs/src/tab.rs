//! Tab data structure
//!
//! A tab points at an entity (document, view, project...) and carries the
//! display state its renderer needs to restore it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{defaults_deep, merge_data, TabData};
use crate::kind::TabType;

pub type TabId = String;
pub type EntityId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    /// Unique identifier
    pub id: TabId,
    /// Entity this tab displays
    pub entity_id: EntityId,
    #[serde(rename = "type")]
    pub tab_type: TabType,
    /// Renderer state (scroll position, open panels, filters...)
    #[serde(default)]
    pub data: TabData,
    /// Baseline used to seed `data` when the tab is opened
    #[serde(default, skip_serializing_if = "TabData::is_empty")]
    pub default_data: TabData,
    /// Sparse sort key within the owning group
    #[serde(default)]
    pub order: f64,
}

impl Tab {
    pub fn new(entity_id: impl Into<EntityId>, tab_type: TabType) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), entity_id, tab_type)
    }

    pub fn with_id(id: impl Into<TabId>, entity_id: impl Into<EntityId>, tab_type: TabType) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            tab_type,
            data: TabData::new(),
            default_data: TabData::new(),
            order: 0.0,
        }
    }

    pub fn with_data(mut self, data: TabData) -> Self {
        self.data = data;
        self
    }

    pub fn with_default_data(mut self, default_data: TabData) -> Self {
        self.default_data = default_data;
        self
    }

    /// Fill in display state before the tab is shown. Precedence is the
    /// tab's own data, then state remembered by the group for the entity,
    /// then the tab's defaults.
    pub fn seed_data(&mut self, remembered: Option<&TabData>) {
        if let Some(remembered) = remembered {
            defaults_deep(&mut self.data, remembered);
        }
        defaults_deep(&mut self.data, &self.default_data);
    }

    pub fn merge_data(&mut self, patch: &TabData) {
        merge_data(&mut self.data, patch);
    }

    /// Whether the side panel of this tab is open
    pub fn panel_open(&self) -> bool {
        self.data
            .get("panelOpen")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> TabData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_tab_has_unique_id() {
        let a = Tab::new("doc-1", TabType::Document);
        let b = Tab::new("doc-1", TabType::Document);
        assert_ne!(a.id, b.id);
        assert!(a.data.is_empty());
    }

    #[test]
    fn test_seed_data_precedence() {
        let mut tab = Tab::new("view-1", TabType::View)
            .with_data(obj(json!({"sort": "title"})))
            .with_default_data(obj(json!({"sort": "date", "grouping": "none", "panelOpen": false})));

        let remembered = obj(json!({"sort": "priority", "grouping": "status"}));
        tab.seed_data(Some(&remembered));

        assert_eq!(
            serde_json::Value::Object(tab.data.clone()),
            json!({"sort": "title", "grouping": "status", "panelOpen": false})
        );
        assert!(!tab.panel_open());
    }

    #[test]
    fn test_serialized_shape() {
        let tab = Tab::with_id("t1", "doc-1", TabType::Document);
        let value = serde_json::to_value(&tab).unwrap();
        assert_eq!(value["type"], json!("document"));
        assert_eq!(value["entity_id"], json!("doc-1"));
        assert!(value.get("default_data").is_none());

        let back: Tab = serde_json::from_value(json!({
            "id": "t1",
            "entity_id": "doc-1",
            "type": "document"
        }))
        .unwrap();
        assert_eq!(back.order, 0.0);
    }
}
