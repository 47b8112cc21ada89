//! Error taxonomy for confstore
//!
//! Driver errors are classified once, at the repository boundary, so that
//! callers can branch on a typed variant instead of inspecting messages:
//! - `Connectivity`: the database cannot be reached or the connection was
//!   lost mid-statement; fatal, never retried
//! - `ConstraintViolation`: unique-key conflict; drives insert-or-update fallback
//! - `Validation`: malformed input rejected before any write
//! - `Transaction`: a multi-step unit failed and was rolled back as a whole

use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum ConfStoreError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("database unreachable: {0}")]
    Connectivity(String),

    #[error("unique constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transaction rolled back: {0}")]
    Transaction(String),

    #[error("database error: {0}")]
    Database(String),
}

impl ConfStoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, ConfStoreError::ConstraintViolation(_))
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ConfStoreError::Connectivity(_))
    }

    /// Wrap any failure inside a multi-step unit as a single transaction failure.
    pub fn into_transaction(self) -> Self {
        match self {
            ConfStoreError::Transaction(_) | ConfStoreError::Connectivity(_) => self,
            other => ConfStoreError::Transaction(other.to_string()),
        }
    }
}

impl From<DbErr> for ConfStoreError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
            return ConfStoreError::ConstraintViolation(msg);
        }

        match err {
            DbErr::Conn(e) => ConfStoreError::Connectivity(e.to_string()),
            DbErr::ConnectionAcquire(e) => ConfStoreError::Connectivity(e.to_string()),
            DbErr::Query(e) | DbErr::Exec(e) if is_connection_lost(&e) => {
                ConfStoreError::Connectivity(e.to_string())
            }
            other => ConfStoreError::Database(other.to_string()),
        }
    }
}

/// A statement failed because the connection or its pool went away.
fn is_connection_lost(err: &RuntimeErr) -> bool {
    matches!(
        err,
        RuntimeErr::SqlxError(
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        )
    )
}

/// Result alias used by the persistence layer
pub type Result<T, E = ConfStoreError> = std::result::Result<T, E>;
