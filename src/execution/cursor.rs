//! Result cursor and tuple decoder
//!
//! Consumes the column-batched responses pulled from the fan-out executor
//! and decodes them into typed tuples one row per fetch. The cursor cycles
//! between empty and draining until the executor reports no more
//! operations; exhaustion is a normal termination, not a failure, and
//! repeated fetches past it keep reporting "no data" without error.

use crate::binding::expression::Expr;
use crate::binding::slots::SlotId;
use crate::catalog::{CatalogView, ROW_ID_COLUMN};
use crate::error::{Error, Result};
use crate::execution::fanout::FanOutExecutor;
use crate::session::Session;
use crate::types::Value;
use crate::wire::encoding::{decode_value, RowBuffer};

/// System column values requested alongside the declared columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SysColumns {
    /// Encoded row-identity key, when targeted.
    pub row_key: Option<Vec<u8>>,
}

/// Per-statement cursor state. Never shared across statements; mutated
/// only by the decode step.
#[derive(Debug, Default)]
pub struct Cursor {
    buf: RowBuffer,
    accumulated_rows: u64,
}

impl Cursor {
    /// Rows received from the store so far. Bumps by whole batches as they
    /// load, so a caller that stops early still sees the full count of
    /// rows received rather than rows it consumed.
    pub fn accumulated_rows(&self) -> u64 {
        self.accumulated_rows
    }

    /// Fetches one row into the caller-supplied output slots, pulling and
    /// skipping batches as needed. Returns false on clean exhaustion.
    ///
    /// `out_values`/`out_nulls` are pre-sized by the caller to the full
    /// declared column count; entries for columns absent from the current
    /// row stay null.
    pub fn fetch<S: Session>(
        &mut self,
        executor: &mut FanOutExecutor<S>,
        targets: &[(SlotId, Expr)],
        view: &CatalogView,
        out_values: &mut [Value],
        out_nulls: &mut [bool],
        mut syscols: Option<&mut SysColumns>,
    ) -> Result<bool> {
        if out_values.len() < view.declared_len() || out_nulls.len() < view.declared_len() {
            return Err(Error::InvalidArgument(
                "output buffers are smaller than the declared column count".into(),
            ));
        }
        for i in 0..view.declared_len() {
            out_values[i] = Value::Null;
            out_nulls[i] = true;
        }
        if let Some(sys) = syscols.as_deref_mut() {
            sys.row_key = None;
        }

        // Load the next non-empty batch, or learn that none remain.
        if self.buf.is_empty() {
            loop {
                let Some(batch) = executor.next_batch()? else {
                    return Ok(false);
                };
                if batch.row_count == 0 {
                    continue;
                }
                self.accumulated_rows += batch.row_count as u64;
                self.buf = RowBuffer::new(batch.payload);
                break;
            }
        }

        // Decode exactly one row, walking targets in registration order.
        for (_, expr) in targets {
            let Expr::ColumnRef { column } = expr else {
                return Err(Error::Internal(
                    "only column-reference targets are decodable".into(),
                ));
            };
            let value = decode_value(&mut self.buf)?;
            let col = view.column(*column)?;
            if col.id == ROW_ID_COLUMN {
                if let Some(sys) = syscols.as_deref_mut() {
                    match value {
                        Value::Bytea(key) => sys.row_key = Some(key),
                        other => {
                            return Err(Error::Corruption(format!(
                                "row identity decoded as {} instead of binary",
                                other
                            )))
                        }
                    }
                }
            } else {
                out_nulls[col.ordinal] = value.is_null();
                out_values[col.ordinal] = value;
            }
        }
        Ok(true)
    }
}
