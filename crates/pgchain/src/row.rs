//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio_postgres::Row;

/// Trait for converting a raw row into a Rust type.
///
/// `R` is the gateway's row type: [`tokio_postgres::Row`] for the provided
/// database gateways, [`Record`] for in-memory ones.
///
/// # Example
///
/// ```ignore
/// use pgchain::{FromRow, OrmResult, RowExt};
/// use tokio_postgres::Row;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(User {
///             id: row.try_get_column("id")?,
///             name: row.try_get_column("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow<R = Row>: Sized {
    /// Convert a raw row into Self
    fn from_row(row: &R) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning [`OrmError::Mapping`] on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::mapping(column, e.to_string()))
    }
}

/// A driver-agnostic row: ordered column names with [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column (builder form). An existing column is overwritten.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Typed value of a column, `None` if absent or of another type.
    pub fn get<T: FromValue>(&self, column: &str) -> Option<T> {
        self.value(column).and_then(T::from_value)
    }

    /// Typed value of a column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .value(column)
            .ok_or_else(|| OrmError::mapping(column, "column not found"))?;
        T::from_value(value).ok_or_else(|| {
            OrmError::mapping(
                column,
                format!("cannot read {} as {}", value.type_name(), T::NAME),
            )
        })
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build a record from a JSON object.
    ///
    /// Scalars map to the matching [`Value`]; arrays and objects stay JSON.
    pub fn from_json(json: &serde_json::Value) -> OrmResult<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(OrmError::mapping("*", "expected a JSON object"));
        };
        let mut record = Record::new();
        for (column, value) in map {
            let value = match value {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(b) => Value::Bool(*b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Value::Int(i),
                    None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(s) => Value::Text(s.clone()),
                other => Value::Json(other.clone()),
            };
            record.set(column.as_str(), value);
        }
        Ok(record)
    }
}

impl FromRow<Record> for Record {
    fn from_row(row: &Record) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    /// Type name used in mapping errors.
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    const NAME: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const NAME: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for String {
    const NAME: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    const NAME: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for serde_json::Value {
    const NAME: &'static str = "serde_json::Value";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for uuid::Uuid {
    const NAME: &'static str = "Uuid";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(v) => Some(*v),
            Value::Text(s) => uuid::Uuid::parse_str(s).ok(),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    const NAME: &'static str = "DateTime<Utc>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const NAME: &'static str = T::NAME;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
