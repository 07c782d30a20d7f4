//! Workspace configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use quill_history::DEFAULT_CAPACITY;
use quill_tabs::DEFAULT_RENORMALIZE_AFTER;

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_GROUP_WIDTH: u32 = 600;
/// Narrowest a pane may become when widths are rebalanced
pub const MIN_PANE_WIDTH: u32 = 380;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Key of the saved layout in the database
    pub workspace_id: String,
    /// Width of the first pane
    pub default_group_width: u32,
    pub min_pane_width: u32,
    /// Undo steps kept
    pub history_capacity: usize,
    /// Midpoint insertions into a pane before its tabs are renumbered
    pub renormalize_after: usize,
    /// Quiet period before a layout change is written
    pub persist_debounce_ms: u64,
    /// Rescale pane widths when the container is resized
    pub rebalance_widths: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("quill.db"),
            workspace_id: "default".to_string(),
            default_group_width: DEFAULT_GROUP_WIDTH,
            min_pane_width: MIN_PANE_WIDTH,
            history_capacity: DEFAULT_CAPACITY,
            renormalize_after: DEFAULT_RENORMALIZE_AFTER,
            persist_debounce_ms: 250,
            rebalance_widths: false,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Quill"))
            .unwrap_or_else(|| PathBuf::from(".quill"))
    }

    /// Apply a persisted setting. Unknown keys are ignored.
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "min_pane_width" => {
                self.min_pane_width = value
                    .parse()
                    .map_err(|_| invalid(key, value))?;
            }
            "rebalance_widths" => {
                self.rebalance_widths = value
                    .parse()
                    .map_err(|_| invalid(key, value))?;
            }
            _ => tracing::debug!(key, "Ignoring unknown setting"),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace_id.is_empty() {
            return Err(CoreError::Config("workspace_id cannot be empty".to_string()));
        }
        if self.default_group_width == 0 {
            return Err(CoreError::Config(
                "default_group_width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

fn invalid(key: &str, value: &str) -> CoreError {
    CoreError::Config(format!("invalid value for {key}: {value:?}"))
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
