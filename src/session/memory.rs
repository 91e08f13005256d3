//! In-memory partitioned store and session
//!
//! Stands in for the distributed store behind the `Session` trait: rows
//! live in per-table maps ordered by (partition hash, key bytes), reads
//! respect hash-range bounds and per-batch row limits with continuation
//! tokens, and fault injection hooks let tests exercise transport failures
//! and conflict statuses.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::{ColumnId, TableSchema, ROW_ID_COLUMN};
use crate::error::{Error, Result};
use crate::types::Value;
use crate::wire::encoding::{encode_key, encode_value, partition_hash};
use crate::wire::message::{
    BoundColumn, OpHandle, OpOutcome, OpStatus, ResultBatch, StatementType, WireOperation,
};

/// Store tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct StoreConfig {
    /// Maximum rows returned per read response before truncation.
    pub batch_row_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            batch_row_limit: 1024,
        }
    }
}

/// Key of one stored row: partition hash code plus encoded key bytes.
type RowKey = (u16, Vec<u8>);

struct TableData {
    schema: Arc<TableSchema>,
    boundaries: Vec<u16>,
    rows: BTreeMap<RowKey, Vec<Value>>,
}

#[derive(Default)]
struct StoreInner {
    tables: HashMap<String, TableData>,
}

/// Shared in-memory store. Cheap to clone; all clones see the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
    config: StoreConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        MemoryStore {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            config,
        }
    }

    /// Creates a table with the given partition-start markers. Markers must
    /// be ascending, non-zero, and unique; the implicit start of the hash
    /// space is never listed.
    pub fn create_table(&self, schema: TableSchema, boundaries: Vec<u16>) -> Result<()> {
        if !boundaries.windows(2).all(|w| w[0] < w[1]) || boundaries.first() == Some(&0) {
            return Err(Error::InvalidArgument(
                "partition boundaries must be ascending and non-zero".into(),
            ));
        }
        let mut inner = self.inner.write();
        let name = schema.name.clone();
        inner.tables.insert(
            name,
            TableData {
                schema: Arc::new(schema),
                boundaries,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }
}

/// A session over the in-memory store. One session serves many statements;
/// operations queue on `apply` and complete on `flush`.
pub struct MemorySession {
    store: MemoryStore,
    queue: Mutex<Vec<(OpHandle, WireOperation)>>,
    outcomes: Mutex<HashMap<OpHandle, OpOutcome>>,
    next_handle: AtomicU64,
    next_flush_error: Mutex<Option<String>>,
    next_op_status: Mutex<Option<OpStatus>>,
    read_log: Mutex<Vec<(Option<u16>, Option<u16>)>>,
}

impl MemorySession {
    pub fn new(store: MemoryStore) -> Self {
        MemorySession {
            store,
            queue: Mutex::new(Vec::new()),
            outcomes: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
            next_flush_error: Mutex::new(None),
            next_op_status: Mutex::new(None),
            read_log: Mutex::new(Vec::new()),
        }
    }

    /// Forces the next flush to fail with a transport error.
    pub fn inject_flush_error(&self, message: impl Into<String>) {
        *self.next_flush_error.lock() = Some(message.into());
    }

    /// Forces the next executed operation to complete with the given
    /// status instead of touching the store.
    pub fn inject_op_status(&self, status: OpStatus) {
        *self.next_op_status.lock() = Some(status);
    }

    /// Hash ranges of every read operation executed so far.
    pub fn executed_reads(&self) -> Vec<(Option<u16>, Option<u16>)> {
        self.read_log.lock().clone()
    }
}

impl super::Session for MemorySession {
    fn load_table(&self, table: &str) -> Result<Arc<TableSchema>> {
        let inner = self.store.inner.read();
        inner
            .tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    fn partition_boundaries(&self, table: &str) -> Result<Vec<u16>> {
        let inner = self.store.inner.read();
        inner
            .tables
            .get(table)
            .map(|t| t.boundaries.clone())
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    fn apply(&self, op: WireOperation) -> OpHandle {
        let handle = OpHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.queue.lock().push((handle, op));
        handle
    }

    fn flush(&self) -> Result<()> {
        let batch: Vec<_> = self.queue.lock().drain(..).collect();
        if let Some(message) = self.next_flush_error.lock().take() {
            return Err(Error::Transport(message));
        }
        for (handle, op) in batch {
            if op.statement_type == StatementType::Read {
                self.read_log
                    .lock()
                    .push((op.hash_range_lower, op.hash_range_upper));
            }
            let outcome = match self.next_op_status.lock().take() {
                Some(status) => OpOutcome::failed(status),
                None => execute_op(&self.store, &op),
            };
            self.outcomes.lock().insert(handle, outcome);
        }
        Ok(())
    }

    fn take_outcome(&self, handle: OpHandle) -> Result<OpOutcome> {
        self.outcomes
            .lock()
            .remove(&handle)
            .ok_or_else(|| Error::Internal("operation has no flushed outcome".into()))
    }
}

fn execute_op(store: &MemoryStore, op: &WireOperation) -> OpOutcome {
    match op.statement_type {
        StatementType::Read => {
            let inner = store.inner.read();
            match inner.tables.get(&op.table) {
                Some(table) => execute_read(table, op, store.config.batch_row_limit),
                None => OpOutcome::failed(OpStatus::Runtime(format!(
                    "unknown table {}",
                    op.table
                ))),
            }
        }
        _ => {
            let mut inner = store.inner.write();
            match inner.tables.get_mut(&op.table) {
                Some(table) => execute_write(table, op),
                None => OpOutcome::failed(OpStatus::Runtime(format!(
                    "unknown table {}",
                    op.table
                ))),
            }
        }
    }
}

fn column_ordinal(schema: &TableSchema, id: ColumnId) -> Option<usize> {
    schema.columns.iter().position(|c| c.id == id)
}

/// Encodes one stored row into the batch payload, in target order.
fn encode_row_payload(
    schema: &TableSchema,
    targets: &[ColumnId],
    key: &[u8],
    row: &[Value],
    payload: &mut Vec<u8>,
) -> std::result::Result<(), OpStatus> {
    for &target in targets {
        if target == ROW_ID_COLUMN {
            encode_value(&Value::Bytea(key.to_vec()), payload);
            continue;
        }
        match column_ordinal(schema, target) {
            Some(ordinal) => encode_value(&row[ordinal], payload),
            None => {
                return Err(OpStatus::Runtime(format!(
                    "target references unknown column {}",
                    target
                )))
            }
        }
    }
    Ok(())
}

fn matches_bound_columns(
    schema: &TableSchema,
    bound: &[BoundColumn],
    row: &[Value],
) -> bool {
    bound.iter().all(|bc| {
        column_ordinal(schema, bc.column)
            .map(|ordinal| row[ordinal] == bc.value)
            .unwrap_or(false)
    })
}

fn continuation_token(last: &RowKey) -> Vec<u8> {
    let mut token = last.0.to_be_bytes().to_vec();
    token.extend_from_slice(&last.1);
    token
}

fn parse_continuation(token: &[u8]) -> Option<RowKey> {
    if token.len() < 2 {
        return None;
    }
    let hash = u16::from_be_bytes([token[0], token[1]]);
    Some((hash, token[2..].to_vec()))
}

fn execute_read(table: &TableData, op: &WireOperation, limit: usize) -> OpOutcome {
    let schema = &table.schema;

    // Point lookup pinned to a single row by its identity key.
    if let Some(key) = &op.row_key {
        let hash = partition_hash(key);
        return match table.rows.get(&(hash, key.clone())) {
            None => OpOutcome::failed(OpStatus::NotFound),
            Some(row) => {
                let mut payload = Vec::new();
                match encode_row_payload(schema, &op.targets, key, row, &mut payload) {
                    Ok(()) => OpOutcome::ok(
                        Some(ResultBatch {
                            payload,
                            row_count: 1,
                            continuation: None,
                        }),
                        0,
                    ),
                    Err(status) => OpOutcome::failed(status),
                }
            }
        };
    }

    let lower = op.hash_range_lower.unwrap_or(0);
    let upper = op.hash_range_upper.unwrap_or(u16::MAX);
    let start = match op.continuation.as_deref().and_then(parse_continuation) {
        Some(resume) => Bound::Excluded(resume),
        None => Bound::Included((lower, Vec::new())),
    };

    let mut payload = Vec::new();
    let mut row_count = 0u32;
    let mut last: Option<RowKey> = None;
    let mut continuation = None;

    for ((hash, key), row) in table.rows.range((start, Bound::Unbounded)) {
        if *hash > upper {
            break;
        }
        if !matches_bound_columns(schema, &op.bound_columns, row) {
            continue;
        }
        if (row_count as usize) >= limit {
            continuation = last.as_ref().map(continuation_token);
            break;
        }
        if let Err(status) = encode_row_payload(schema, &op.targets, key, row, &mut payload) {
            return OpOutcome::failed(status);
        }
        row_count += 1;
        last = Some((*hash, key.clone()));
    }

    OpOutcome::ok(
        Some(ResultBatch {
            payload,
            row_count,
            continuation,
        }),
        0,
    )
}

/// Builds the addressed row key from the operation's key-column bindings.
fn bound_row_key(
    schema: &TableSchema,
    op: &WireOperation,
) -> std::result::Result<Vec<u8>, OpStatus> {
    if let Some(key) = &op.row_key {
        return Ok(key.clone());
    }
    let mut key_values = Vec::new();
    for def in schema.key_columns() {
        let bound = op
            .bound_columns
            .iter()
            .find(|bc| bc.column == def.id)
            .ok_or_else(|| {
                OpStatus::Runtime(format!("key column {} is not bound", def.name))
            })?;
        key_values.push(bound.value.clone());
    }
    Ok(encode_key(&key_values))
}

fn execute_write(table: &mut TableData, op: &WireOperation) -> OpOutcome {
    let schema = table.schema.clone();
    let key = match bound_row_key(&schema, op) {
        Ok(key) => key,
        Err(status) => return OpOutcome::failed(status),
    };
    let hash = partition_hash(&key);

    match op.statement_type {
        StatementType::Insert => {
            if table.rows.contains_key(&(hash, key.clone())) {
                return OpOutcome::failed(OpStatus::Runtime("duplicate key".into()));
            }
            let mut row = vec![Value::Null; schema.columns.len()];
            for bc in &op.bound_columns {
                if let Some(ordinal) = column_ordinal(&schema, bc.column) {
                    row[ordinal] = bc.value.clone();
                }
            }
            table.rows.insert((hash, key), row);
            OpOutcome::ok(None, 1)
        }
        StatementType::Update => {
            // Updating an absent row is a no-op success, not an error.
            match table.rows.get_mut(&(hash, key)) {
                None => OpOutcome::ok(None, 0),
                Some(row) => {
                    for bc in &op.assigned_columns {
                        if let Some(ordinal) = column_ordinal(&schema, bc.column) {
                            row[ordinal] = bc.value.clone();
                        }
                    }
                    OpOutcome::ok(None, 1)
                }
            }
        }
        StatementType::Delete => {
            let removed = table.rows.remove(&(hash, key)).is_some();
            OpOutcome::ok(None, removed as u64)
        }
        StatementType::Read => {
            OpOutcome::failed(OpStatus::Runtime("read routed to write path".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDef;
    use crate::session::Session;
    use crate::types::DataType;

    fn store_with_table() -> MemoryStore {
        let store = MemoryStore::new();
        let schema = TableSchema::new(
            "items",
            vec![
                ColumnDef::new(1, "key", DataType::Int32).hash_key(),
                ColumnDef::new(2, "value", DataType::Int32),
            ],
        )
        .unwrap();
        store.create_table(schema, vec![]).unwrap();
        store
    }

    fn insert_op(key: i32, value: i32) -> WireOperation {
        let mut op = WireOperation::new(StatementType::Insert, "items");
        op.bound_columns = vec![
            BoundColumn {
                column: 1,
                value: Value::I32(key),
            },
            BoundColumn {
                column: 2,
                value: Value::I32(value),
            },
        ];
        op
    }

    #[test]
    fn test_insert_then_point_read() {
        let session = MemorySession::new(store_with_table());
        let handle = session.apply(insert_op(1, 10));
        session.flush().unwrap();
        assert!(session.take_outcome(handle).unwrap().succeeded());

        let key = encode_key(&[Value::I32(1)]);
        let mut read = WireOperation::new(StatementType::Read, "items");
        read.targets = vec![1, 2];
        read.row_key = Some(key);
        let handle = session.apply(read);
        session.flush().unwrap();
        let outcome = session.take_outcome(handle).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.batch.unwrap().row_count, 1);
    }

    #[test]
    fn test_point_read_missing_row_is_not_found() {
        let session = MemorySession::new(store_with_table());
        let mut read = WireOperation::new(StatementType::Read, "items");
        read.row_key = Some(encode_key(&[Value::I32(7)]));
        let handle = session.apply(read);
        session.flush().unwrap();
        let outcome = session.take_outcome(handle).unwrap();
        assert_eq!(*outcome.response(), OpStatus::NotFound);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let session = MemorySession::new(store_with_table());
        let first = session.apply(insert_op(1, 10));
        let second = session.apply(insert_op(1, 11));
        session.flush().unwrap();
        assert!(session.take_outcome(first).unwrap().succeeded());
        // Batch-level flush succeeded, but the second operation did not:
        // partial failure is visible only through per-operation outcomes.
        assert!(!session.take_outcome(second).unwrap().succeeded());
    }

    #[test]
    fn test_scan_truncates_at_batch_limit() {
        let store = MemoryStore::with_config(StoreConfig { batch_row_limit: 2 });
        let schema = TableSchema::new(
            "items",
            vec![
                ColumnDef::new(1, "key", DataType::Int32).hash_key(),
                ColumnDef::new(2, "value", DataType::Int32),
            ],
        )
        .unwrap();
        store.create_table(schema, vec![]).unwrap();
        let session = MemorySession::new(store);
        for i in 0..5 {
            session.apply(insert_op(i, i * 10));
        }
        session.flush().unwrap();

        let mut read = WireOperation::new(StatementType::Read, "items");
        read.targets = vec![1, 2];
        let mut total = 0u32;
        let mut continuation = None;
        loop {
            let mut op = read.clone();
            op.continuation = continuation.take();
            let handle = session.apply(op);
            session.flush().unwrap();
            let batch = session.take_outcome(handle).unwrap().batch.unwrap();
            assert!(batch.row_count <= 2);
            total += batch.row_count;
            match batch.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn test_flush_error_injection() {
        let session = MemorySession::new(store_with_table());
        session.inject_flush_error("connection reset");
        session.apply(insert_op(1, 10));
        assert_eq!(
            session.flush().unwrap_err(),
            Error::Transport("connection reset".into())
        );
    }

    #[test]
    fn test_take_outcome_before_flush() {
        let session = MemorySession::new(store_with_table());
        let handle = session.apply(insert_op(1, 10));
        assert!(matches!(
            session.take_outcome(handle).unwrap_err(),
            Error::Internal(_)
        ));
    }
}
