//! Query-execution bridge between a SQL front end and a hash-partitioned,
//! column-family document store.
//!
//! The bridge turns a bound data-manipulation statement into wire
//! operations against the store and the store's column-batched responses
//! back into row tuples:
//! - maps typed column references onto wire-message slots exactly once,
//!   however many times an expression is logically bound
//! - fans a statement out across a dynamically discovered set of
//!   hash-range partitions
//! - merges and paginates results incrementally, driving per-partition
//!   continuations on demand
//! - passes the store's concurrency-control statuses through undisturbed
//!   so callers can implement retry-on-conflict
//!
//! Parsing/planning, transport, and the store engine itself are external
//! collaborators behind the [`session::Session`] trait.

pub mod binding;
pub mod catalog;
pub mod error;
pub mod execution;
pub mod session;
pub mod types;
pub mod wire;

pub use binding::{BindEngine, Expr, SlotId};
pub use catalog::{CatalogView, ColumnDef, ColumnId, ColumnRole, TableSchema, ROW_ID_COLUMN};
pub use error::{Error, Result};
pub use execution::{DmlStatement, SysColumns};
pub use session::{MemorySession, MemoryStore, Session, StoreConfig};
pub use types::{DataType, Value};
pub use wire::{OpStatus, StatementType};
