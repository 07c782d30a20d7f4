//! Database connection and operations

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;
use crate::migrations::run_migrations;
use crate::Result;

/// A saved layout document as it sits in the `workspace_layouts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLayout {
    pub workspace_id: String,
    /// Serialized tab groups (JSON)
    pub tab_groups: String,
    pub updated_at: DateTime<Utc>,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })?;

        Ok(())
    }

    /// Load the saved layout document for a workspace
    pub fn load_layout(&self, workspace_id: &str) -> Result<Option<StoredLayout>> {
        let row: Option<(String, String)> = self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT tab_groups, updated_at FROM workspace_layouts WHERE workspace_id = ?1",
                    [workspace_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row)
        })?;

        let Some((tab_groups, updated_str)) = row else {
            return Ok(None);
        };

        let updated_at = DateTime::parse_from_rfc3339(&updated_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| StorageError::InvalidTimestamp {
                column: "updated_at",
                value: updated_str.clone(),
            })?;

        Ok(Some(StoredLayout {
            workspace_id: workspace_id.to_string(),
            tab_groups,
            updated_at,
        }))
    }

    /// Replace the saved layout document for a workspace
    pub fn save_layout(&self, workspace_id: &str, tab_groups: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.transaction(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO workspace_layouts (workspace_id, tab_groups, updated_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![workspace_id, tab_groups, updated_at],
            )?;
            Ok(())
        })?;

        tracing::debug!(workspace_id = %workspace_id, bytes = tab_groups.len(), "Saved layout");

        Ok(())
    }

    pub fn delete_layout(&self, workspace_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM workspace_layouts WHERE workspace_id = ?1",
                [workspace_id],
            )?;
            Ok(())
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 = conn.query_row(
                "SELECT COUNT(*) FROM workspace_layouts",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("min_pane_width").unwrap(), None);

        db.set_setting("min_pane_width", "420").unwrap();
        db.set_setting("min_pane_width", "400").unwrap();
        assert_eq!(
            db.get_setting("min_pane_width").unwrap(),
            Some("400".to_string())
        );
    }

    #[test]
    fn test_layout_is_replaced_per_workspace() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_layout("vault-1").unwrap().is_none());

        db.save_layout("vault-1", "[]").unwrap();
        db.save_layout("vault-1", r#"[{"id":"g1"}]"#).unwrap();
        db.save_layout("vault-2", "[]").unwrap();

        let stored = db.load_layout("vault-1").unwrap().unwrap();
        assert_eq!(stored.workspace_id, "vault-1");
        assert_eq!(stored.tab_groups, r#"[{"id":"g1"}]"#);

        db.delete_layout("vault-1").unwrap();
        assert!(db.load_layout("vault-1").unwrap().is_none());
        assert!(db.load_layout("vault-2").unwrap().is_some());
    }
}
