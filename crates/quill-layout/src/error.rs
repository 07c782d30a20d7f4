//! Layout persistence error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Storage error: {0}")]
    Storage(#[from] quill_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layout writer has shut down")]
    WriterClosed,
}
