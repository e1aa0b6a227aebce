//! Error types shared across the ledgersync crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Database-level errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to get a connection from the pool
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// A query failed for a reason other than a constraint violation
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    /// An unexpected constraint violation (expected duplicates are absorbed
    /// by insert-or-ignore and never reach this variant)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The write lock could not be acquired within the retry budget
    #[error("Write lock timed out after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    /// Schema migration failure
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Catch-all for internal storage invariant violations
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors that can occur during ledger synchronization.
#[derive(Debug, Error)]
pub enum Error {
    /// Local store error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Remote source unreachable or refused the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Remote call or lock wait exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Missing/invalid driver or connector configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or contract-violating data from the remote source
    #[error("Data error: {0}")]
    Data(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A sync for this partition is already running; the request is rejected,
    /// not queued
    #[error("Sync already in progress for {0}")]
    SyncInProgress(String),

    /// Caller provided an invalid argument (e.g. inverted date span)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(DatabaseError::from(err))
    }
}

/// Classified error code carried by terminal `failed` log entries and the
/// caller-facing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorCode {
    Connection,
    Timeout,
    Config,
    Data,
    Database,
}

impl SyncErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorCode::Connection => "connection",
            SyncErrorCode::Timeout => "timeout",
            SyncErrorCode::Config => "config",
            SyncErrorCode::Data => "data",
            SyncErrorCode::Database => "database",
        }
    }
}

impl Error {
    /// Classify this error for the sync failure taxonomy.
    pub fn sync_error_code(&self) -> SyncErrorCode {
        match self {
            Error::Connection(_) => SyncErrorCode::Connection,
            Error::Timeout(_) => SyncErrorCode::Timeout,
            Error::Database(DatabaseError::LockTimeout { .. }) => SyncErrorCode::Timeout,
            Error::Config(_) => SyncErrorCode::Config,
            Error::Data(_)
            | Error::Serde(_)
            | Error::InvalidInput(_)
            | Error::SyncInProgress(_) => SyncErrorCode::Data,
            Error::Database(_) => SyncErrorCode::Database,
        }
    }
}
