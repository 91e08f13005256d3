//! Column catalog: shared table schemas and per-statement column views
//!
//! A `TableSchema` is immutable and shared (read-only) by every statement
//! against the same table. Each statement builds its own `CatalogView` from
//! the schema; the view carries the per-statement mutable state (read/write
//! request flags, wire slot assignments) that binding produces as side
//! effects.

use crate::error::{Error, Result};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

use crate::binding::slots::SlotId;

/// Numeric column identifier, stable for the life of a table.
pub type ColumnId = i32;

/// Id of the implicit row-identity system column. Not part of the declared
/// schema; binding it pins a statement to a single row by encoded key.
pub const ROW_ID_COLUMN: ColumnId = -1;

/// The part a column plays in row addressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Participates in the partition hash.
    HashKey,
    /// Orders rows within a partition.
    RangeKey,
    /// Plain payload column.
    Regular,
    /// Implicit system column with no stored cell of its own.
    SystemVirtual,
}

/// Immutable column metadata as declared in the schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub name: String,
    pub data_type: DataType,
    pub role: ColumnRole,
}

impl ColumnDef {
    pub fn new(id: ColumnId, name: impl Into<String>, data_type: DataType) -> Self {
        ColumnDef {
            id,
            name: name.into(),
            data_type,
            role: ColumnRole::Regular,
        }
    }

    /// Marks this column as part of the partition hash key.
    pub fn hash_key(mut self) -> Self {
        self.role = ColumnRole::HashKey;
        self
    }

    /// Marks this column as an in-partition range key.
    pub fn range_key(mut self) -> Self {
        self.role = ColumnRole::RangeKey;
        self
    }
}

/// An immutable table schema. Shared by all statements against the table
/// and must outlive every statement using it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("table name cannot be empty".into()));
        }
        if !columns.iter().any(|c| c.role == ColumnRole::HashKey) {
            return Err(Error::InvalidArgument(format!(
                "table {} must have at least one hash key column",
                name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for col in &columns {
            if !seen.insert(col.id) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate column id {} in table {}",
                    col.id, name
                )));
            }
        }
        Ok(TableSchema { name, columns })
    }

    /// Key columns in addressing order: hash keys first, then range keys.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        let hash = self
            .columns
            .iter()
            .filter(|c| c.role == ColumnRole::HashKey);
        let range = self
            .columns
            .iter()
            .filter(|c| c.role == ColumnRole::RangeKey);
        hash.chain(range)
    }

    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// Per-statement column state layered over the shared schema.
#[derive(Clone, Debug)]
pub struct Column {
    pub id: ColumnId,
    /// Position among the declared columns; drives decode output slots.
    pub ordinal: usize,
    pub data_type: DataType,
    pub role: ColumnRole,
    /// Set when the column is requested as a read target.
    pub read_requested: bool,
    /// Set when the column receives a write assignment.
    pub write_requested: bool,
    /// Wire slot holding this column's bound value, allocated on first bind.
    pub bind_slot: Option<SlotId>,
    /// Wire slot holding this column's write assignment.
    pub assign_slot: Option<SlotId>,
}

impl Column {
    fn from_def(def: &ColumnDef, ordinal: usize) -> Self {
        Column {
            id: def.id,
            ordinal,
            data_type: def.data_type,
            role: def.role,
            read_requested: false,
            write_requested: false,
            bind_slot: None,
            assign_slot: None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.role == ColumnRole::SystemVirtual
    }
}

/// Read-only per-statement view of a table's columns, plus the implicit
/// row-identity system column appended after the declared ones.
#[derive(Debug)]
pub struct CatalogView {
    columns: Vec<Column>,
}

impl CatalogView {
    pub fn new(schema: &TableSchema) -> Self {
        let mut columns: Vec<Column> = schema
            .columns
            .iter()
            .enumerate()
            .map(|(ordinal, def)| Column::from_def(def, ordinal))
            .collect();
        columns.push(Column {
            id: ROW_ID_COLUMN,
            ordinal: columns.len(),
            data_type: DataType::Binary,
            role: ColumnRole::SystemVirtual,
            read_requested: false,
            write_requested: false,
            bind_slot: None,
            assign_slot: None,
        });
        CatalogView { columns }
    }

    /// Number of declared (non-system) columns.
    pub fn declared_len(&self) -> usize {
        self.columns.len() - 1
    }

    pub fn find_column(&mut self, id: ColumnId) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::ColumnNotFound(id))
    }

    pub fn column(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::ColumnNotFound(id))
    }

    /// Ids of every column actually referenced by the statement, read or
    /// write. Lets the store skip fetching unreferenced columns.
    pub fn referenced_column_ids(&self) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|c| !c.is_virtual() && (c.read_requested || c.write_requested))
            .map(|c| c.id)
            .collect()
    }
}
