//! Session abstraction the executor submits batches through
//!
//! The session is the boundary to the planner/transport layer: it resolves
//! table metadata, queues wire operations, and executes a queued batch on
//! `flush`. Flush failure is a transport-level error reported once for the
//! whole batch; each operation's individual outcome must still be
//! inspected afterward, since a flush can partially succeed.

pub mod memory;

use std::sync::Arc;

use crate::catalog::TableSchema;
use crate::error::Result;
use crate::wire::{OpHandle, OpOutcome, WireOperation};

pub use memory::{MemorySession, MemoryStore, StoreConfig};

/// Interface consumed from the host session layer. Implementations use
/// interior mutability so a single session can serve many statements.
pub trait Session {
    /// Resolves a table's schema, failing with `TableNotFound` if unknown.
    fn load_table(&self, table: &str) -> Result<Arc<TableSchema>>;

    /// Raw partition-start markers for the table's hash-key space, in
    /// ascending order, excluding the implicit start of the space.
    fn partition_boundaries(&self, table: &str) -> Result<Vec<u16>>;

    /// Queues an operation for the next flush.
    fn apply(&self, op: WireOperation) -> OpHandle;

    /// Executes every queued operation, blocking until the batch
    /// completes. Errors here are transport-level only.
    fn flush(&self) -> Result<()>;

    /// Takes the completed outcome of a flushed operation.
    fn take_outcome(&self, handle: OpHandle) -> Result<OpOutcome>;
}
