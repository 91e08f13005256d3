//! Wire operation and response shapes
//!
//! One `WireOperation` is one request/response exchange addressed to a
//! single partition. Operations are created per fan-out iteration, applied
//! to the session, and discarded once their batch is drained.

use serde::{Deserialize, Serialize};

use crate::catalog::ColumnId;
use crate::error::{Error, Result};
use crate::types::Value;

/// Kind of data-manipulation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementType {
    Read,
    Insert,
    Update,
    Delete,
}

/// An evaluated column value carried in a wire message slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundColumn {
    pub column: ColumnId,
    pub value: Value,
}

/// One outbound request unit, addressed to a hash-range partition or, for
/// point operations, to the partition owning the row key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireOperation {
    pub statement_type: StatementType,
    pub table: String,
    /// Predicate/key bindings: equality constraints on the selected rows.
    pub bound_columns: Vec<BoundColumn>,
    /// Write assignments applied by update statements.
    pub assigned_columns: Vec<BoundColumn>,
    /// Requested output columns, in decode order.
    pub targets: Vec<ColumnId>,
    /// Every column the statement reads or writes; lets the store skip
    /// fetching the rest.
    pub column_refs: Vec<ColumnId>,
    /// Inclusive partition hash bounds; `None` means unbounded.
    pub hash_range_lower: Option<u16>,
    pub hash_range_upper: Option<u16>,
    /// Raw key bytes pinning the operation to a single row.
    pub row_key: Option<Vec<u8>>,
    /// Opaque resume marker from a truncated prior response.
    pub continuation: Option<Vec<u8>>,
}

impl WireOperation {
    pub fn new(statement_type: StatementType, table: impl Into<String>) -> Self {
        WireOperation {
            statement_type,
            table: table.into(),
            bound_columns: Vec::new(),
            assigned_columns: Vec::new(),
            targets: Vec::new(),
            column_refs: Vec::new(),
            hash_range_lower: None,
            hash_range_upper: None,
            row_key: None,
            continuation: None,
        }
    }
}

/// Column-batched payload of one completed read operation. Ownership
/// transfers from the executor to the result cursor on completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultBatch {
    /// Encoded rows, walked by the cursor one row at a time.
    pub payload: Vec<u8>,
    pub row_count: u32,
    /// Present when the partition holds more rows past this batch.
    pub continuation: Option<Vec<u8>>,
}

/// Per-operation status reported by the store. Concurrency-control
/// outcomes stay distinguishable so callers can branch on conflict kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OpStatus {
    Ok,
    NotFound,
    ReadConflict(String),
    WriteConflict(String),
    Expired(String),
    StaleMetadata(String),
    Runtime(String),
}

/// The completed outcome of one wire operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpOutcome {
    pub status: OpStatus,
    pub batch: Option<ResultBatch>,
    pub rows_affected: u64,
}

impl OpOutcome {
    pub fn ok(batch: Option<ResultBatch>, rows_affected: u64) -> Self {
        OpOutcome {
            status: OpStatus::Ok,
            batch,
            rows_affected,
        }
    }

    pub fn failed(status: OpStatus) -> Self {
        OpOutcome {
            status,
            batch: None,
            rows_affected: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == OpStatus::Ok
    }

    pub fn response(&self) -> &OpStatus {
        &self.status
    }

    /// Converts the outcome into the statement-level result, mapping each
    /// store status onto its error verbatim.
    pub fn into_result(self) -> Result<Option<ResultBatch>> {
        match self.status {
            OpStatus::Ok => Ok(self.batch),
            OpStatus::NotFound => Err(Error::RowNotFound),
            OpStatus::ReadConflict(msg) => Err(Error::ReadConflict(msg)),
            OpStatus::WriteConflict(msg) => Err(Error::WriteConflict(msg)),
            OpStatus::Expired(msg) => Err(Error::OperationExpired(msg)),
            OpStatus::StaleMetadata(msg) => Err(Error::StaleMetadata(msg)),
            OpStatus::Runtime(msg) => Err(Error::StoreError(msg)),
        }
    }
}

/// Stable identifier of an applied operation within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpHandle(pub u64);
