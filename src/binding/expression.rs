//! Source-side expressions attached to wire slots
//!
//! A closed variant rather than an open class hierarchy: the decode path can
//! match exhaustively, and non-column-reference targets reaching decode time
//! are rejected in one place.

use crate::catalog::{CatalogView, ColumnId};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};

/// An expression supplied by the planner for a bind, assignment, or target.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal value, fixed at bind time.
    Constant(Value),
    /// A parameter resolved from the statement's parameter list at flush.
    Placeholder { index: usize, data_type: DataType },
    /// A reference to a table column; the only decodable target kind.
    ColumnRef { column: ColumnId },
    /// A planner-folded computed value. Prepared exactly once, like a
    /// constant, but kept distinct so the origin stays visible.
    Computed { data_type: DataType, value: Value },
}

impl Expr {
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    /// The declared type of this expression, resolving column references
    /// through the statement's catalog view. Untyped nulls have none.
    pub fn declared_type(&self, view: &CatalogView) -> Result<Option<DataType>> {
        match self {
            Expr::Constant(v) => Ok(v.data_type()),
            Expr::Placeholder { data_type, .. } => Ok(Some(*data_type)),
            Expr::ColumnRef { column } => Ok(Some(view.column(*column)?.data_type)),
            Expr::Computed { data_type, .. } => Ok(Some(*data_type)),
        }
    }

    /// The value known at prepare time, if any. Constants and computed
    /// expressions are prepared exactly once per statement; placeholders
    /// and column references have nothing to write yet.
    pub fn prepared_value(&self) -> Option<Value> {
        match self {
            Expr::Constant(v) => Some(v.clone()),
            Expr::Computed { value, .. } => Some(value.clone()),
            Expr::Placeholder { .. } | Expr::ColumnRef { .. } => None,
        }
    }

    /// Evaluates this expression into its final wire-ready value. Called
    /// exactly once per submission, after all parameters are supplied.
    pub fn evaluate(&self, params: &[Value]) -> Result<Value> {
        match self {
            Expr::Constant(v) => Ok(v.clone()),
            Expr::Computed { value, .. } => Ok(value.clone()),
            Expr::Placeholder { index, .. } => params.get(*index).cloned().ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "placeholder ${} has no supplied parameter",
                    index
                ))
            }),
            Expr::ColumnRef { column } => Err(Error::Internal(format!(
                "column reference {} is not evaluable as a bind value",
                column
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_resolves_from_params() {
        let expr = Expr::Placeholder {
            index: 1,
            data_type: DataType::Int32,
        };
        let params = vec![Value::I32(1), Value::I32(2)];
        assert_eq!(expr.evaluate(&params).unwrap(), Value::I32(2));
        assert!(expr.evaluate(&[]).is_err());
    }

    #[test]
    fn test_constant_prepared_once() {
        let expr = Expr::Constant(Value::Str("a".into()));
        assert_eq!(expr.prepared_value(), Some(Value::Str("a".into())));
        assert_eq!(expr.evaluate(&[]).unwrap(), Value::Str("a".into()));
    }
}
