//! DML statement object
//!
//! Ties one catalog view, bind engine, fan-out executor, and result cursor
//! together. A statement is single-owner and sequential: bind, then
//! execute, then repeated fetch. It may be dropped at any point without
//! draining the cursor; undrained continuations are simply abandoned.

use std::sync::Arc;

use crate::binding::engine::BindEngine;
use crate::binding::expression::Expr;
use crate::binding::slots::SlotId;
use crate::catalog::{CatalogView, ColumnId, TableSchema};
use crate::error::{Error, Result};
use crate::execution::cursor::{Cursor, SysColumns};
use crate::execution::fanout::{execute_write, FanOutExecutor};
use crate::session::Session;
use crate::types::Value;
use crate::wire::message::{StatementType, WireOperation};

pub struct DmlStatement<S: Session> {
    session: Arc<S>,
    statement_type: StatementType,
    schema: Arc<TableSchema>,
    engine: BindEngine,
    executor: Option<FanOutExecutor<S>>,
    cursor: Cursor,
    rows_affected: u64,
    executed: bool,
}

impl<S: Session> std::fmt::Debug for DmlStatement<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmlStatement")
            .field("statement_type", &self.statement_type)
            .field("rows_affected", &self.rows_affected)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl<S: Session> DmlStatement<S> {
    pub fn new(session: Arc<S>, table: &str, statement_type: StatementType) -> Result<Self> {
        let schema = session.load_table(table)?;
        let engine = BindEngine::new(CatalogView::new(&schema));
        Ok(DmlStatement {
            session,
            statement_type,
            schema,
            engine,
            executor: None,
            cursor: Cursor::default(),
            rows_affected: 0,
            executed: false,
        })
    }

    /// Registers a read target; see [`BindEngine::append_target`].
    pub fn append_target(&mut self, expr: Expr) -> Result<SlotId> {
        self.engine.append_target(expr)
    }

    /// Binds a predicate/key column; see [`BindEngine::bind_column`].
    pub fn bind_column(&mut self, column: ColumnId, expr: Expr) -> Result<()> {
        self.engine.bind_column(column, expr)
    }

    /// Assigns a write value; see [`BindEngine::assign_column`].
    pub fn assign_column(&mut self, column: ColumnId, expr: Expr) -> Result<()> {
        self.engine.assign_column(column, expr)
    }

    /// Always fails with `NotSupported`; build a fresh statement instead.
    pub fn clear_binds(&mut self) -> Result<()> {
        self.engine.clear_binds()
    }

    /// Evaluates all pending expressions into their wire slots, then fans
    /// the statement out and flushes. Callable exactly once per statement.
    pub fn execute(&mut self, params: &[Value]) -> Result<()> {
        if self.executed {
            return Err(Error::InvalidState("statement was already executed".into()));
        }
        self.executed = true;

        self.engine.update_bind_slots(params)?;
        self.engine.update_assign_slots(params)?;

        let mut op = WireOperation::new(self.statement_type, self.schema.name.clone());
        op.bound_columns = self.engine.bound_columns();
        op.assigned_columns = self.engine.assigned_columns();
        op.targets = self.engine.wire_targets();
        op.column_refs = self.engine.view().referenced_column_ids();
        op.row_key = self.engine.row_key().map(|k| k.to_vec());

        match self.statement_type {
            StatementType::Read => {
                let boundaries = self.session.partition_boundaries(&self.schema.name)?;
                self.executor = Some(FanOutExecutor::execute_read(
                    self.session.clone(),
                    op,
                    &boundaries,
                )?);
            }
            _ => {
                self.rows_affected = execute_write(self.session.as_ref(), op)?;
            }
        }
        Ok(())
    }

    /// Fetches the next row into the caller's output slots. `Ok(false)`
    /// signals clean exhaustion and repeats on every further call.
    pub fn fetch(
        &mut self,
        out_values: &mut [Value],
        out_nulls: &mut [bool],
        syscols: Option<&mut SysColumns>,
    ) -> Result<bool> {
        let executor = self.executor.as_mut().ok_or_else(|| {
            Error::InvalidState("fetch on a statement that has not executed a read".into())
        })?;
        self.cursor.fetch(
            executor,
            self.engine.targets(),
            self.engine.view(),
            out_values,
            out_nulls,
            syscols,
        )
    }

    /// Rows received from the store so far for this statement.
    pub fn accumulated_row_count(&self) -> u64 {
        self.cursor.accumulated_rows()
    }

    /// Rows affected by a write statement.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }
}
