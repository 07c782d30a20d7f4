//! Workspace state container
//!
//! Owns the database, the configuration and the tab manager. The layout is
//! written back to the database after every change, through a debounced
//! writer when a tokio runtime is available.

use std::sync::Arc;
use std::time::Duration;

use quill_layout::{DebouncedPersistence, LayoutPersistence, SqlitePersistence};
use quill_storage::Database;

use crate::config::Config;
use crate::manager::TabManager;
use crate::resolver::{EntityResolver, Notification};
use crate::Result;

/// Settings read from the database on startup
const PERSISTED_SETTINGS: [&str; 2] = ["min_pane_width", "rebalance_widths"];

pub struct Workspace {
    config: Config,
    db: Database,
    tabs: TabManager,
    writer: Option<Arc<DebouncedPersistence<SqlitePersistence>>>,
}

impl Workspace {
    /// Open the workspace database at `config.database_path`
    pub fn open(config: Config, resolver: Arc<dyn EntityResolver>) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.database_path)?;

        Ok(Self::with_database(db, config, resolver))
    }

    pub fn with_database(db: Database, config: Config, resolver: Arc<dyn EntityResolver>) -> Self {
        let sqlite = SqlitePersistence::new(db.clone(), config.workspace_id.clone());

        let debounce = config.persist_debounce_ms > 0
            && tokio::runtime::Handle::try_current().is_ok();
        let mut writer = None;
        let persistence: Arc<dyn LayoutPersistence> = if debounce {
            let debounced = Arc::new(DebouncedPersistence::spawn(
                sqlite,
                Duration::from_millis(config.persist_debounce_ms),
            ));
            writer = Some(Arc::clone(&debounced));
            debounced
        } else {
            Arc::new(sqlite)
        };

        let tabs = TabManager::new(config.clone(), resolver, persistence);

        Self {
            config,
            db,
            tabs,
            writer,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notification>) -> Self {
        self.tabs = self.tabs.with_notifier(notifier);
        self
    }

    /// Apply stored settings and restore the saved layout
    pub fn initialize(&mut self) -> Result<()> {
        for key in PERSISTED_SETTINGS {
            if let Some(value) = self.db.get_setting(key)? {
                if let Err(e) = self.config.apply_setting(key, &value) {
                    tracing::warn!(key, error = %e, "Ignoring stored setting");
                }
            }
        }
        self.tabs.set_config(self.config.clone());
        self.tabs.restore();

        tracing::info!(
            workspace_id = %self.config.workspace_id,
            groups = self.tabs.groups().len(),
            "Workspace initialized"
        );
        Ok(())
    }

    /// Change a setting and remember it
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.apply_setting(key, value)?;
        self.db.set_setting(key, value)?;
        self.tabs.set_config(self.config.clone());
        Ok(())
    }

    pub fn tabs(&self) -> &TabManager {
        &self.tabs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flush the pending layout write
    pub async fn shutdown(self) {
        let Self { tabs, writer, .. } = self;
        drop(tabs);

        let Some(writer) = writer else {
            return;
        };
        match Arc::try_unwrap(writer) {
            Ok(writer) => writer.shutdown().await,
            Err(_) => tracing::debug!("Layout writer still shared, flushing on last drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::OpenOptions;
    use crate::resolver::EmptyDefaults;
    use quill_tabs::{Tab, TabType};
    use std::path::PathBuf;

    fn config() -> Config {
        Config::new(PathBuf::from("/tmp/quill-test"))
    }

    #[test]
    fn test_layout_survives_reopen() {
        let db = Database::open_in_memory().unwrap();

        let mut workspace = Workspace::with_database(db.clone(), config(), Arc::new(EmptyDefaults));
        workspace.initialize().unwrap();
        let tab_id = workspace.tabs().open_tab(
            Tab::new("doc-1", TabType::Document),
            None,
            OpenOptions::new_tab().activate(true),
        );
        let right = workspace
            .tabs()
            .split_right(Tab::new("doc-2", TabType::Document), None, None)
            .unwrap();
        let before = workspace.tabs().snapshot();

        let mut reopened = Workspace::with_database(db, config(), Arc::new(EmptyDefaults));
        reopened.initialize().unwrap();
        assert_eq!(reopened.tabs().snapshot(), before);
        assert_eq!(reopened.tabs().active_group_id().unwrap(), right);
        assert!(reopened.tabs().tab(&tab_id).is_some());
        assert!(!reopened.tabs().can_go_back());
    }

    #[test]
    fn test_stored_settings_applied() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("rebalance_widths", "true").unwrap();
        db.set_setting("min_pane_width", "wide").unwrap();

        let mut workspace = Workspace::with_database(db, config(), Arc::new(EmptyDefaults));
        workspace.initialize().unwrap();
        assert!(workspace.config().rebalance_widths);
        assert!(workspace.tabs().config().rebalance_widths);
        assert_eq!(workspace.config().min_pane_width, 380);

        workspace.set_setting("min_pane_width", "200").unwrap();
        assert_eq!(workspace.tabs().config().min_pane_width, 200);
        assert_eq!(
            workspace.database().get_setting("min_pane_width").unwrap(),
            Some("200".to_string())
        );
        assert!(workspace.set_setting("min_pane_width", "-1").is_err());
    }

    #[tokio::test]
    async fn test_debounced_writes_flush_on_shutdown() {
        let db = Database::open_in_memory().unwrap();
        let mut config = config();
        config.persist_debounce_ms = 10_000;

        let mut workspace = Workspace::with_database(db.clone(), config, Arc::new(EmptyDefaults));
        workspace.initialize().unwrap();
        workspace
            .tabs()
            .open_tab(Tab::new("doc-1", TabType::Document), None, OpenOptions::new_tab());
        let expected = workspace.tabs().snapshot();
        workspace.shutdown().await;

        let stored = SqlitePersistence::new(db, "default").load().unwrap();
        assert_eq!(stored, Some(expected));
    }
}
