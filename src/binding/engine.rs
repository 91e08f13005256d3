//! Bind/target expression engine
//!
//! Accumulates column bindings and target expressions for one statement,
//! each linked to exactly one wire slot. Constants are prepared into their
//! slots immediately; placeholders are evaluated once, right before the
//! statement is submitted.

use std::collections::HashMap;

use tracing::warn;

use crate::binding::expression::Expr;
use crate::binding::slots::{SlotArena, SlotId};
use crate::catalog::{CatalogView, ColumnId, ROW_ID_COLUMN};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use crate::wire::message::BoundColumn;

/// Per-statement bind state: the catalog view, the slot arena, and the
/// expression maps that link slots back to their source expressions.
#[derive(Debug)]
pub struct BindEngine {
    view: CatalogView,
    arena: SlotArena,
    /// Read targets in registration order. This order is the implicit
    /// contract between slot allocation and decode-time column position.
    targets: Vec<(SlotId, Expr)>,
    /// Predicate/key bindings, keyed by wire slot.
    binds: HashMap<SlotId, Expr>,
    /// Write assignments, keyed by wire slot.
    assigns: HashMap<SlotId, Expr>,
    /// Raw key bytes captured from a row-identity bind, for point lookups
    /// that bypass normal wire encoding.
    row_key: Option<Vec<u8>>,
}

impl BindEngine {
    pub fn new(view: CatalogView) -> Self {
        BindEngine {
            view,
            arena: SlotArena::new(),
            targets: Vec::new(),
            binds: HashMap::new(),
            assigns: HashMap::new(),
            row_key: None,
        }
    }

    /// Registers a read target and allocates its decode slot. Column
    /// references resolve the column and mark it read-requested; any other
    /// expression kind is accepted here but rejected at decode time.
    pub fn append_target(&mut self, expr: Expr) -> Result<SlotId> {
        let slot = match &expr {
            Expr::ColumnRef { column } => {
                let col = self.view.find_column(*column)?;
                let id = col.id;
                if !col.is_virtual() {
                    col.read_requested = true;
                }
                self.arena.alloc(Some(id))
            }
            _ => self.arena.alloc(None),
        };
        if let Some(value) = expr.prepared_value() {
            self.arena.set_value(slot, value);
        }
        self.targets.push((slot, expr));
        Ok(slot)
    }

    /// Binds a value to a predicate or key column. The first bind allocates
    /// the column's wire slot; a re-bind without an intervening clear warns
    /// and reuses the slot, last write wins. Deliberately laxer than
    /// `assign_column`: re-binding is how a statement is re-executed with
    /// new key values.
    pub fn bind_column(&mut self, id: ColumnId, expr: Expr) -> Result<()> {
        self.check_expr_type(id, &expr)?;

        if id == ROW_ID_COLUMN {
            match &expr {
                Expr::Constant(Value::Bytea(key)) => self.row_key = Some(key.clone()),
                _ => {
                    return Err(Error::InvalidState(
                        "row identity column must be bound to a binary literal".into(),
                    ))
                }
            }
        }

        let col = self.view.find_column(id)?;
        let slot = match col.bind_slot {
            None => {
                let slot = self.arena.alloc(Some(id));
                col.bind_slot = Some(slot);
                slot
            }
            Some(slot) => {
                if self.binds.contains_key(&slot) {
                    warn!(column = id, "column is already bound to another value");
                }
                slot
            }
        };

        if let Some(value) = expr.prepared_value() {
            self.arena.set_value(slot, value);
        }
        self.binds.insert(slot, expr);
        Ok(())
    }

    /// Assigns a write value to a column. Unlike `bind_column`, assigning
    /// the same column twice is an error: update statements must have
    /// unique per-column assignments.
    pub fn assign_column(&mut self, id: ColumnId, expr: Expr) -> Result<()> {
        self.check_expr_type(id, &expr)?;

        let col = self.view.find_column(id)?;
        let slot = match col.assign_slot {
            None => {
                let slot = self.arena.alloc(Some(id));
                col.assign_slot = Some(slot);
                slot
            }
            Some(slot) => {
                if self.assigns.contains_key(&slot) {
                    return Err(Error::InvalidArgument(format!(
                        "column {} is already assigned to another value",
                        id
                    )));
                }
                slot
            }
        };

        if !col.is_virtual() {
            col.write_requested = true;
        }
        if let Some(value) = expr.prepared_value() {
            self.arena.set_value(slot, value);
        }
        self.assigns.insert(slot, expr);
        Ok(())
    }

    /// Clearing binds for prepared-statement reuse is not implemented;
    /// callers build a fresh statement instead.
    pub fn clear_binds(&mut self) -> Result<()> {
        Err(Error::NotSupported(
            "clearing binds for prepared statement reuse".into(),
        ))
    }

    /// Evaluates every pending bound expression into its wire slot's final
    /// value. Invoked exactly once, immediately before submission.
    pub fn update_bind_slots(&mut self, params: &[Value]) -> Result<()> {
        for (slot, expr) in &self.binds {
            let value = expr.evaluate(params)?;
            self.arena.set_value(*slot, value);
        }
        Ok(())
    }

    /// Evaluates every pending assigned expression into its wire slot.
    pub fn update_assign_slots(&mut self, params: &[Value]) -> Result<()> {
        for (slot, expr) in &self.assigns {
            let value = expr.evaluate(params)?;
            self.arena.set_value(*slot, value);
        }
        Ok(())
    }

    fn check_expr_type(&self, id: ColumnId, expr: &Expr) -> Result<()> {
        let col = self.view.column(id)?;
        // Legacy accommodation: binary columns accept expressions of any
        // declared type (historical text/binary conflation).
        if col.data_type == DataType::Binary {
            return Ok(());
        }
        match expr.declared_type(&self.view)? {
            None => Ok(()),
            Some(found) if found == col.data_type => Ok(()),
            Some(found) => Err(Error::TypeMismatch {
                expected: col.data_type.to_string(),
                found: found.to_string(),
            }),
        }
    }

    /// Evaluated predicate/key bindings in stable slot order, excluding the
    /// row-identity bind, which travels as raw key bytes instead.
    pub fn bound_columns(&self) -> Vec<BoundColumn> {
        let mut slots: Vec<SlotId> = self.binds.keys().copied().collect();
        slots.sort();
        slots
            .into_iter()
            .filter_map(|slot| {
                let wire = self.arena.slot(slot);
                match wire.column {
                    Some(ROW_ID_COLUMN) | None => None,
                    Some(column) => Some(BoundColumn {
                        column,
                        value: wire.value.clone(),
                    }),
                }
            })
            .collect()
    }

    /// Evaluated write assignments in stable slot order.
    pub fn assigned_columns(&self) -> Vec<BoundColumn> {
        let mut slots: Vec<SlotId> = self.assigns.keys().copied().collect();
        slots.sort();
        slots
            .into_iter()
            .filter_map(|slot| {
                let wire = self.arena.slot(slot);
                wire.column.map(|column| BoundColumn {
                    column,
                    value: wire.value.clone(),
                })
            })
            .collect()
    }

    /// Column ids of the registered column-reference targets, in decode
    /// order.
    pub fn wire_targets(&self) -> Vec<ColumnId> {
        self.targets
            .iter()
            .filter_map(|(_, expr)| match expr {
                Expr::ColumnRef { column } => Some(*column),
                _ => None,
            })
            .collect()
    }

    pub fn targets(&self) -> &[(SlotId, Expr)] {
        &self.targets
    }

    pub fn view(&self) -> &CatalogView {
        &self.view
    }

    pub fn row_key(&self) -> Option<&[u8]> {
        self.row_key.as_deref()
    }
}
