//! Store error types.

use nexus_core::GatewayError;

/// Errors raised by the administration store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite reported a failure.
    #[error("database error: {0}")]
    Database(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A route was submitted with a kind other than EXACT or PREFIX.
    #[error("invalid match_type: {0}")]
    InvalidMatchKind(String),

    /// Filesystem failure while opening the database.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        GatewayError::Lookup(e.to_string())
    }
}
