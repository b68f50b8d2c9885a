//! Error type for tool operations.

use kingdom_core::error::GameError;
use kingdom_core::persistence::PersistError;
use thiserror::Error;

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// File or directory not found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse content: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The content parsed but is inconsistent, or the core rejected it.
    #[error(transparent)]
    Game(#[from] GameError),
    /// A save file could not be loaded.
    #[error("Failed to load save: {0}")]
    Save(#[from] PersistError),
    /// A report could not be rendered.
    #[error("Failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}
