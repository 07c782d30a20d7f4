//! Quill Core
//!
//! Pane and tab layout for the Quill workspace. The layout is a row of panes
//! (tab groups), each holding an ordered strip of tabs. Every user-facing
//! change goes through [`TabManager`], which records an inverse for undo and
//! writes the layout back to storage.

mod command;
mod config;
mod drag;
mod engine;
mod error;
mod manager;
mod resolver;
mod workspace;

pub use command::{GroupSpec, LayoutCommand};
pub use config::{Config, DEFAULT_GROUP_WIDTH, MIN_PANE_WIDTH};
pub use drag::{DragState, DropTarget};
pub use engine::LayoutEngine;
pub use error::CoreError;
pub use manager::{OpenIntent, OpenOptions, TabManager};
pub use resolver::{
    ChannelNotifier, EmptyDefaults, EntityResolver, LayoutEvent, Notification, SplitSide,
};
pub use workspace::Workspace;

// Re-export core components
pub use quill_history::{Dispatch, HistoryEntry, HistoryStack};
pub use quill_layout::{
    DebouncedPersistence, LayoutError, LayoutPersistence, MemoryPersistence, PersistedGroup,
    PersistedLayout, PersistedTab, SqlitePersistence,
};
pub use quill_storage::{Database, StorageError};
pub use quill_tabs::{
    EntityId, GroupId, Tab, TabData, TabError, TabGroup, TabId, TabStore, TabType,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
