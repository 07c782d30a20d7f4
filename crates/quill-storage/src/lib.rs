//! Quill Storage Layer
//!
//! SQLite-backed persistence for settings and saved workspace layouts.
//! Layouts are stored as opaque JSON documents; this crate does not interpret them.

mod database;
mod error;
mod migrations;

pub use database::{Database, StoredLayout};
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
