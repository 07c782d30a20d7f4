//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] quill_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] quill_tabs::TabError),

    #[error("Layout error: {0}")]
    Layout(#[from] quill_layout::LayoutError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
