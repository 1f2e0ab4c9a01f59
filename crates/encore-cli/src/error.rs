use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] encore_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No owner given. Pass --owner or set ENCORE_OWNER")]
    MissingOwner,
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error("Nothing to update. Pass at least one field")]
    NothingToUpdate,
    #[error("Invalid timestamp '{0}'. Expected RFC 3339, e.g. 2025-08-02T18:00:00Z")]
    InvalidTimestamp(String),
}
