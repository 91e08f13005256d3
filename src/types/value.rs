//! Wire-ready values

use crate::error::{Error, Result};
use crate::types::DataType;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded row in declared-column order.
pub type Row = Vec<Value>;

/// A single column value as carried over the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    Str(String),
    Bytea(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The declared type this value encodes as. Null has no type of its own.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::I16(_) => Some(DataType::Int16),
            Value::I32(_) => Some(DataType::Int32),
            Value::I64(_) => Some(DataType::Int64),
            Value::F64(_) => Some(DataType::Float64),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Str(_) => Some(DataType::Text),
            Value::Bytea(_) => Some(DataType::Binary),
            Value::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    /// Checks that this value matches the given declared type.
    /// Null matches any type.
    pub fn check_type(&self, expected: DataType) -> Result<()> {
        match self.data_type() {
            None => Ok(()),
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(Error::TypeMismatch {
                expected: expected.to_string(),
                found: actual.to_string(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I16(i) => write!(f, "{}", i),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytea(b) => write!(f, "x{}", b.iter().fold(String::new(), |mut s, byte| {
                use std::fmt::Write;
                let _ = write!(s, "{:02x}", byte);
                s
            })),
            Value::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}
