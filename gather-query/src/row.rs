//! Rows, column values and record identifiers.
//!
//! A [`Row`] is what a relation source hands back for one record: an ordered
//! map of column name to [`Value`]. The engine only ever reads integer key
//! columns out of a row; everything else is passed through untouched to the
//! record factory.
//!
//! ```rust
//! use gather_query::row::{RecordId, Row, Value};
//!
//! let row = Row::new()
//!     .with("id", 1)
//!     .with("author_id", 10)
//!     .with("title", "Hello");
//!
//! assert_eq!(row.id("Post", "id").unwrap(), RecordId(1));
//! assert_eq!(row.key("Post", "author_id").unwrap(), Some(RecordId(10)));
//! assert_eq!(row.get("title"), Some(&Value::String("Hello".into())));
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Identifier of a record within its model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Get the raw integer value.
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

impl From<i32> for RecordId {
    fn from(v: i32) -> Self {
        Self(v as i64)
    }
}

/// A column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Self::Int(v.0)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// One record's worth of columns, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or replace a column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Iterate over columns in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Keep only the named columns, in the given order.
    pub fn project(&self, fields: &[&str]) -> Row {
        let mut projected = Row::new();
        for field in fields {
            if let Some(value) = self.columns.get(*field) {
                projected.insert(*field, value.clone());
            }
        }
        projected
    }

    /// Read the primary key column. Absence or null is an error.
    pub fn id(&self, model: &str, column: &str) -> QueryResult<RecordId> {
        match self.key(model, column)? {
            Some(id) => Ok(id),
            None => Err(QueryError::missing_field(model, column)),
        }
    }

    /// Read a nullable key column.
    ///
    /// A missing column is an error; a null value is `Ok(None)`.
    pub fn key(&self, model: &str, column: &str) -> QueryResult<Option<RecordId>> {
        match self.columns.get(column) {
            None => Err(QueryError::missing_field(model, column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Int(v)) => Ok(Some(RecordId(*v))),
            Some(other) => Err(QueryError::invalid_key(model, column, other)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One `(child, parent)` pair read from a join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinRow {
    /// Key of the related (child) record.
    pub child: RecordId,
    /// Key of the owning (parent) record.
    pub parent: RecordId,
}

impl JoinRow {
    /// Create a join row.
    pub fn new(child: impl Into<RecordId>, parent: impl Into<RecordId>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(RecordId(7)), Value::Int(7));
    }

    #[test]
    fn test_row_keys() {
        let row = Row::new().with("id", 3).with("author_id", Value::Null);

        assert_eq!(row.id("Post", "id").unwrap(), RecordId(3));
        assert_eq!(row.key("Post", "author_id").unwrap(), None);
    }

    #[test]
    fn test_row_missing_key_column() {
        let row = Row::new().with("title", "x");
        let err = row.id("Post", "id").unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredFieldMissing);
    }

    #[test]
    fn test_row_non_integer_key() {
        let row = Row::new().with("id", "abc");
        let err = row.key("Post", "id").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDataType);
    }

    #[test]
    fn test_row_null_primary_key_is_error() {
        let row = Row::new().with("id", Value::Null);
        assert!(row.id("Post", "id").is_err());
    }

    #[test]
    fn test_row_project_keeps_order() {
        let row = Row::new()
            .with("id", 1)
            .with("title", "t")
            .with("author_id", 9);

        let projected = row.project(&["id", "author_id", "missing"]);
        let names: Vec<_> = projected.columns().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "author_id"]);
    }

    #[test]
    fn test_row_from_iter() {
        let row: Row = [("id", Value::Int(1)), ("name", Value::from("X"))]
            .into_iter()
            .collect();
        assert_eq!(row.len(), 2);
    }
}
