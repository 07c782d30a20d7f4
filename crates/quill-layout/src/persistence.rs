//! Layout storage backends

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quill_storage::Database;

use crate::snapshot::PersistedLayout;
use crate::Result;

/// Durable home for the workspace layout
pub trait LayoutPersistence: Send + Sync {
    fn load(&self) -> Result<Option<PersistedLayout>>;
    fn store(&self, layout: &PersistedLayout) -> Result<()>;
}

/// Keeps the last stored layout in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    layout: Arc<RwLock<Option<PersistedLayout>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: PersistedLayout) -> Self {
        let persistence = Self::default();
        *persistence.layout.write() = Some(layout);
        persistence
    }

    pub fn layout(&self) -> Option<PersistedLayout> {
        self.layout.read().clone()
    }

    /// Number of `store` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LayoutPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<PersistedLayout>> {
        Ok(self.layout())
    }

    fn store(&self, layout: &PersistedLayout) -> Result<()> {
        *self.layout.write() = Some(layout.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stores the layout as JSON in the `workspace_layouts` table
#[derive(Clone)]
pub struct SqlitePersistence {
    db: Database,
    workspace_id: String,
}

impl SqlitePersistence {
    pub fn new(db: Database, workspace_id: impl Into<String>) -> Self {
        Self {
            db,
            workspace_id: workspace_id.into(),
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }
}

impl LayoutPersistence for SqlitePersistence {
    fn load(&self) -> Result<Option<PersistedLayout>> {
        let Some(stored) = self.db.load_layout(&self.workspace_id)? else {
            return Ok(None);
        };

        tracing::debug!(
            workspace_id = %self.workspace_id,
            updated_at = %stored.updated_at,
            "Loaded layout"
        );
        Ok(Some(PersistedLayout::from_json(&stored.tab_groups)?))
    }

    fn store(&self, layout: &PersistedLayout) -> Result<()> {
        let json = layout.to_json()?;
        self.db.save_layout(&self.workspace_id, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{PersistedGroup, PersistedTab};
    use quill_tabs::{TabData, TabType};
    use std::collections::HashMap;

    fn layout() -> PersistedLayout {
        PersistedLayout {
            groups: vec![PersistedGroup {
                id: "g1".to_string(),
                order: 0.0,
                width: 600,
                active_tab: Some("t1".to_string()),
                group_data: HashMap::new(),
                tabs: vec![PersistedTab {
                    id: "t1".to_string(),
                    entity_id: "day".to_string(),
                    tab_type: TabType::MyDay,
                    data: TabData::new(),
                }],
            }],
            active_group: Some("g1".to_string()),
        }
    }

    #[test]
    fn test_memory_clones_share_state() {
        let persistence = MemoryPersistence::new();
        let observer = persistence.clone();
        assert!(persistence.load().unwrap().is_none());

        persistence.store(&layout()).unwrap();
        assert_eq!(observer.layout(), Some(layout()));
        assert_eq!(observer.writes(), 1);
    }

    #[test]
    fn test_sqlite_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let persistence = SqlitePersistence::new(db.clone(), "vault-1");
        assert!(persistence.load().unwrap().is_none());

        persistence.store(&layout()).unwrap();
        assert_eq!(persistence.load().unwrap(), Some(layout()));

        let other = SqlitePersistence::new(db, "vault-2");
        assert!(other.load().unwrap().is_none());
    }

    #[test]
    fn test_sqlite_rejects_corrupt_document() {
        let db = Database::open_in_memory().unwrap();
        db.save_layout("vault-1", "not json").unwrap();
        let persistence = SqlitePersistence::new(db, "vault-1");
        assert!(matches!(
            persistence.load(),
            Err(crate::LayoutError::Json(_))
        ));
    }
}
