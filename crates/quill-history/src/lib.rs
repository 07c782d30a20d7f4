//! Quill History
//!
//! A linear undo/redo engine. Entries pair an optional forward command with an
//! optional backward command; the stack never interprets them and hands them to
//! a [`Dispatch`] implementation instead.
//!
//! Pushing a new entry while the cursor is behind the tail discards the
//! abandoned future, as in any editor.

mod entry;
mod history;

pub use entry::HistoryEntry;
pub use history::{Dispatch, HistoryStack, DEFAULT_CAPACITY};
