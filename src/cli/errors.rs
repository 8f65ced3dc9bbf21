//! CLI error types

use thiserror::Error;

use crate::document::DocumentError;
use crate::store::StoreError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by the demonstration driver.
#[derive(Debug, Error)]
pub enum CliError {
    /// Store operation failed
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Document conversion failed
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    /// Input was not valid JSON
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}
