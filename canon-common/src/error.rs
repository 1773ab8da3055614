//! Common error types for canonical composition

use thiserror::Error;

/// Common result type for composition operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the composition crates
#[derive(Error, Debug)]
pub enum Error {
    /// A precondition on the caller's input was violated (empty group, wrong item type)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required attribute is not declared for the item type
    #[error("{attribute} does not exist on {item_type}, cannot {context}")]
    SchemaMismatch {
        item_type: String,
        attribute: String,
        context: String,
    },

    /// Item type is not declared in the schema registry
    #[error("Unknown item type: {0}")]
    UnknownItemType(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by the schema and the rule being out of sync
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. } | Error::UnknownItemType(_))
    }
}
