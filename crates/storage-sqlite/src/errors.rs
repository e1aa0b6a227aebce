//! Storage-layer error type and its mapping into the core taxonomy.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use ledgersync_core::errors::{DatabaseError, Error};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Diesel(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// True when the underlying diesel error is a unique-constraint
    /// violation. The batch writer uses insert-or-ignore so this should not
    /// occur on the sync path; when it does it is unexpected and fatal.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Diesel(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

impl From<diesel::r2d2::PoolError> for StorageError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StorageError::Pool(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Diesel(DieselError::DatabaseError(kind, info))
                if matches!(
                    kind,
                    DatabaseErrorKind::UniqueViolation
                        | DatabaseErrorKind::ForeignKeyViolation
                        | DatabaseErrorKind::NotNullViolation
                        | DatabaseErrorKind::CheckViolation
                ) =>
            {
                Error::Database(DatabaseError::Constraint(info.message().to_string()))
            }
            StorageError::Diesel(inner) => Error::Database(DatabaseError::Query(inner)),
            StorageError::Pool(message) => Error::Database(DatabaseError::Pool(message)),
            StorageError::Migration(message) => Error::Database(DatabaseError::Migration(message)),
            StorageError::Internal(message) => Error::Database(DatabaseError::Internal(message)),
        }
    }
}
