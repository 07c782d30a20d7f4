//! Quill Tab Store
//!
//! Tabs live in groups (side-by-side panes). The store owns both and keeps
//! the structural invariants; it knows nothing about history, persistence
//! or what a tab displays.

mod data;
mod error;
mod group;
mod kind;
mod order;
mod store;
mod tab;

pub use data::{defaults_deep, merge_data, merge_deep, TabData};
pub use error::TabError;
pub use group::{GroupId, GroupUpdate, TabGroup};
pub use kind::TabType;
pub use order::{is_collapsed, midpoint, order_at, renumbered, ORDER_STEP};
pub use store::{TabStore, DEFAULT_RENORMALIZE_AFTER};
pub use tab::{EntityId, Tab, TabId};

pub type Result<T> = std::result::Result<T, TabError>;
