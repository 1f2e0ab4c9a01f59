//! Error types for encore-core

use thiserror::Error;

/// Result type alias using encore-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in encore-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event or resolution not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resolution request rejected
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Engine configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
