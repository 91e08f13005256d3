//! End-to-end statement scenarios over the in-memory session.

use std::sync::Arc;

use docgate::wire::encode_key;
use docgate::{
    ColumnDef, DataType, DmlStatement, Error, Expr, MemorySession, MemoryStore, OpStatus,
    StatementType, StoreConfig, SysColumns, TableSchema, Value, ROW_ID_COLUMN,
};

fn items_schema() -> TableSchema {
    TableSchema::new(
        "items",
        vec![
            ColumnDef::new(1, "key", DataType::Int32).hash_key(),
            ColumnDef::new(2, "value", DataType::Int32),
        ],
    )
    .unwrap()
}

fn setup(boundaries: Vec<u16>, config: StoreConfig) -> Arc<MemorySession> {
    let store = MemoryStore::with_config(config);
    store.create_table(items_schema(), boundaries).unwrap();
    Arc::new(MemorySession::new(store))
}

fn insert(session: &Arc<MemorySession>, key: i32, value: i32) {
    let mut stmt = DmlStatement::new(session.clone(), "items", StatementType::Insert).unwrap();
    stmt.bind_column(1, Expr::Constant(Value::I32(key))).unwrap();
    stmt.bind_column(2, Expr::Constant(Value::I32(value)))
        .unwrap();
    stmt.execute(&[]).unwrap();
    assert_eq!(stmt.rows_affected(), 1);
}

fn select_all(session: &Arc<MemorySession>) -> DmlStatement<MemorySession> {
    let mut stmt = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    stmt.append_target(Expr::ColumnRef { column: 1 }).unwrap();
    stmt.append_target(Expr::ColumnRef { column: 2 }).unwrap();
    stmt.execute(&[]).unwrap();
    stmt
}

fn drain(stmt: &mut DmlStatement<MemorySession>) -> Vec<(i32, i32)> {
    let mut rows = Vec::new();
    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    while stmt.fetch(&mut values, &mut nulls, None).unwrap() {
        match (&values[0], &values[1]) {
            (Value::I32(k), Value::I32(v)) => rows.push((*k, *v)),
            other => panic!("unexpected row values: {:?}", other),
        }
    }
    rows
}

#[test]
fn test_insert_and_scan_single_partition() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);
    insert(&session, 2, 20);

    let mut stmt = select_all(&session);
    let mut rows = drain(&mut stmt);
    rows.sort();
    assert_eq!(rows, vec![(1, 10), (2, 20)]);
    assert_eq!(stmt.accumulated_row_count(), 2);

    // Fetching after exhaustion keeps reporting "no data" without error.
    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    for _ in 0..3 {
        assert!(!stmt.fetch(&mut values, &mut nulls, None).unwrap());
    }
}

#[test]
fn test_update_of_missing_row_succeeds_then_point_select_not_found() {
    let session = setup(vec![], StoreConfig::default());

    let mut update = DmlStatement::new(session.clone(), "items", StatementType::Update).unwrap();
    update
        .bind_column(1, Expr::Constant(Value::I32(1)))
        .unwrap();
    update
        .assign_column(2, Expr::Constant(Value::I32(99)))
        .unwrap();
    update.execute(&[]).unwrap();
    assert_eq!(update.rows_affected(), 0);

    let row_key = encode_key(&[Value::I32(1)]);
    let mut select = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    select.append_target(Expr::ColumnRef { column: 2 }).unwrap();
    select
        .bind_column(ROW_ID_COLUMN, Expr::Constant(Value::Bytea(row_key)))
        .unwrap();
    select.execute(&[]).unwrap();

    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    assert_eq!(
        select.fetch(&mut values, &mut nulls, None).unwrap_err(),
        Error::RowNotFound
    );
}

#[test]
fn test_two_partition_fan_out_issues_two_operations() {
    let session = setup(vec![0x8000], StoreConfig::default());
    for i in 0..10 {
        insert(&session, i, i * 10);
    }

    let mut stmt = select_all(&session);
    let rows = drain(&mut stmt);
    assert_eq!(rows.len(), 10);

    assert_eq!(
        session.executed_reads(),
        vec![(None, Some(0x7FFF)), (Some(0x8000), None)]
    );
}

#[test]
fn test_continuation_across_truncated_batches() {
    let session = setup(vec![], StoreConfig { batch_row_limit: 1 });
    for i in 0..3 {
        insert(&session, i, i);
    }

    let mut stmt = select_all(&session);
    let rows = drain(&mut stmt);
    assert_eq!(rows.len(), 3);
    assert_eq!(stmt.accumulated_row_count(), 3);
}

#[test]
fn test_accumulated_count_tracks_rows_received_not_consumed() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);
    insert(&session, 2, 20);

    let mut stmt = select_all(&session);
    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    assert!(stmt.fetch(&mut values, &mut nulls, None).unwrap());
    // Both rows arrived in one batch; the count reflects the whole batch
    // even though only one row has been consumed.
    assert_eq!(stmt.accumulated_row_count(), 2);
}

#[test]
fn test_update_existing_row() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);

    let mut update = DmlStatement::new(session.clone(), "items", StatementType::Update).unwrap();
    update
        .bind_column(1, Expr::Constant(Value::I32(1)))
        .unwrap();
    update
        .assign_column(
            2,
            Expr::Placeholder {
                index: 0,
                data_type: DataType::Int32,
            },
        )
        .unwrap();
    update.execute(&[Value::I32(77)]).unwrap();
    assert_eq!(update.rows_affected(), 1);

    let mut stmt = select_all(&session);
    assert_eq!(drain(&mut stmt), vec![(1, 77)]);
}

#[test]
fn test_delete_then_scan_is_empty() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);

    let mut delete = DmlStatement::new(session.clone(), "items", StatementType::Delete).unwrap();
    delete
        .bind_column(1, Expr::Constant(Value::I32(1)))
        .unwrap();
    delete.execute(&[]).unwrap();
    assert_eq!(delete.rows_affected(), 1);

    let mut stmt = select_all(&session);
    assert!(drain(&mut stmt).is_empty());
    assert_eq!(stmt.accumulated_row_count(), 0);
}

#[test]
fn test_conflict_status_passes_through_verbatim() {
    let session = setup(vec![], StoreConfig::default());
    session.inject_op_status(OpStatus::WriteConflict("held by txn 42".into()));

    let mut stmt = DmlStatement::new(session.clone(), "items", StatementType::Insert).unwrap();
    stmt.bind_column(1, Expr::Constant(Value::I32(1))).unwrap();
    stmt.bind_column(2, Expr::Constant(Value::I32(10)))
        .unwrap();
    let err = stmt.execute(&[]).unwrap_err();
    assert_eq!(err, Error::WriteConflict("held by txn 42".into()));
    assert!(err.is_conflict());
}

#[test]
fn test_flush_failure_is_transport_error() {
    let session = setup(vec![], StoreConfig::default());
    session.inject_flush_error("connection reset");

    let mut stmt = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    stmt.append_target(Expr::ColumnRef { column: 1 }).unwrap();
    assert_eq!(
        stmt.execute(&[]).unwrap_err(),
        Error::Transport("connection reset".into())
    );
}

#[test]
fn test_non_column_target_fails_at_decode_time() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);

    let mut stmt = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    // Accepted at bind time; computed targets must be resolved above this
    // layer, so decode rejects them.
    stmt.append_target(Expr::Constant(Value::I32(5))).unwrap();
    stmt.append_target(Expr::ColumnRef { column: 1 }).unwrap();
    stmt.execute(&[]).unwrap();

    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    assert!(matches!(
        stmt.fetch(&mut values, &mut nulls, None).unwrap_err(),
        Error::Internal(_)
    ));
}

#[test]
fn test_row_identity_target_roundtrip() {
    let session = setup(vec![], StoreConfig::default());
    insert(&session, 1, 10);

    let mut scan = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    scan.append_target(Expr::ColumnRef { column: 2 }).unwrap();
    scan.append_target(Expr::ColumnRef {
        column: ROW_ID_COLUMN,
    })
    .unwrap();
    scan.execute(&[]).unwrap();

    let mut values = vec![Value::Null; 2];
    let mut nulls = vec![true; 2];
    let mut sys = SysColumns::default();
    assert!(scan.fetch(&mut values, &mut nulls, Some(&mut sys)).unwrap());
    assert_eq!(values[1], Value::I32(10));
    let row_key = sys.row_key.expect("row identity requested");

    // The identity key addresses the same row as a point lookup.
    let mut point = DmlStatement::new(session.clone(), "items", StatementType::Read).unwrap();
    point.append_target(Expr::ColumnRef { column: 2 }).unwrap();
    point
        .bind_column(ROW_ID_COLUMN, Expr::Constant(Value::Bytea(row_key)))
        .unwrap();
    point.execute(&[]).unwrap();
    assert!(point.fetch(&mut values, &mut nulls, None).unwrap());
    assert_eq!(values[1], Value::I32(10));
}

#[test]
fn test_unknown_table_fails_eagerly() {
    let session = setup(vec![], StoreConfig::default());
    let err = DmlStatement::new(session, "missing", StatementType::Read).unwrap_err();
    assert_eq!(err, Error::TableNotFound("missing".into()));
}

#[test]
fn test_statement_executes_exactly_once() {
    let session = setup(vec![], StoreConfig::default());
    let mut stmt = select_all(&session);
    assert!(matches!(
        stmt.execute(&[]).unwrap_err(),
        Error::InvalidState(_)
    ));
}

#[test]
fn test_clear_binds_not_supported() {
    let session = setup(vec![], StoreConfig::default());
    let mut stmt = DmlStatement::new(session, "items", StatementType::Read).unwrap();
    assert!(matches!(
        stmt.clear_binds().unwrap_err(),
        Error::NotSupported(_)
    ));
}
