//! Optional column metadata used for compile-time operand checks.
//!
//! Without metadata, operands are passed through as typed parameters and the
//! database has the final word. With metadata, `LIKE` and `IN` operands are
//! checked against the declared column type before any SQL is sent.

use crate::value::Value;
use std::collections::HashMap;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Bytes,
    Json,
    Uuid,
    Timestamp,
}

impl ColumnType {
    /// Whether a value can be bound to a column of this type.
    ///
    /// `NULL` is accepted everywhere; integers widen into float columns.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Integer, Value::Int(_))
                | (ColumnType::Float, Value::Float(_) | Value::Int(_))
                | (ColumnType::Boolean, Value::Bool(_))
                | (ColumnType::Bytes, Value::Bytes(_))
                | (ColumnType::Json, Value::Json(_))
                | (ColumnType::Uuid, Value::Uuid(_))
                | (ColumnType::Timestamp, Value::Timestamp(_))
        )
    }
}

/// Column types for one table.
#[derive(Debug, Clone, Default)]
pub struct TableMeta {
    columns: HashMap<String, ColumnType>,
}

impl TableMeta {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column (builder form).
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// Declared type of a column, if known.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    /// Check if this table declares a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}
