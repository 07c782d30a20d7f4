//! Tab error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabError {
    #[error("Unknown tab type: {0}")]
    UnknownType(String),

    #[error("Layout integrity violated: {0}")]
    Integrity(String),
}
