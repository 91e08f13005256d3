//! Error types for the DML bridge

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Catalog errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(i32),

    #[error("Row not found")]
    RowNotFound,

    // Bind-time errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid statement state: {0}")]
    InvalidState(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    // Decode/runtime errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Corrupt wire data: {0}")]
    Corruption(String),

    // Transport-level failure at flush time. Distinct from per-operation
    // logical failure; callers must still inspect individual outcomes.
    #[error("Transport error: {0}")]
    Transport(String),

    // Store-reported concurrency control statuses. Passed through verbatim
    // so callers can branch on conflict kind for their retry policy.
    #[error("Read conflict: {0}")]
    ReadConflict(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Operation expired: {0}")]
    OperationExpired(String),

    #[error("Stale metadata: {0}")]
    StaleMetadata(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl Error {
    /// True for statuses produced by the store's concurrency control,
    /// which a caller may resolve by retrying the whole statement.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::ReadConflict(_)
                | Error::WriteConflict(_)
                | Error::OperationExpired(_)
                | Error::StaleMetadata(_)
        )
    }
}
