//! Quill Layout Persistence
//!
//! The layout is the ordered set of panes and their tabs. It is written after
//! every mutation and read back once at startup:
//! - `PersistedLayout` is the durable shape
//! - `LayoutPersistence` is the storage seam (memory, SQLite, debounced)
//! - restoring filters out empty panes instead of failing

mod debounce;
mod error;
mod persistence;
mod snapshot;

pub use debounce::DebouncedPersistence;
pub use error::LayoutError;
pub use persistence::{LayoutPersistence, MemoryPersistence, SqlitePersistence};
pub use snapshot::{PersistedGroup, PersistedLayout, PersistedTab};

pub type Result<T> = std::result::Result<T, LayoutError>;
