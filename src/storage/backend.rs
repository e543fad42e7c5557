//! Storage Backend Abstraction - Blocking persistence collaborator contract
//!
//! The engine talks to persistence exclusively through this object-safe
//! trait. Calls are blocking; request-scoped cancellation and timeouts are
//! the surrounding layer's responsibility.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::storage::Query;
use crate::value::FieldValue;

/// One fetched or stored row: column name to scalar value
pub type Row = HashMap<String, FieldValue>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error types raised by a storage backend; opaque to the engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failure: {message}")]
    Backend { message: String },

    #[error("unknown table '{table}'")]
    UnknownTable { table: String },

    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
}

/// Blocking persistence collaborator
pub trait StorageBackend: Send + Sync {
    /// Execute a fetch description and return the matching rows
    fn fetch(&self, query: &Query) -> StorageResult<Vec<Row>>;

    /// Insert a row, returning the stored state including any generated key
    fn insert(&self, table: &str, values: Row) -> StorageResult<Row>;

    /// Delete rows matching an equality condition, returning the count
    fn delete(&self, table: &str, column: &str, value: &FieldValue) -> StorageResult<u64>;
}

/// Take the first row of a rowset, if any
pub fn first_row(rows: Vec<Row>) -> Option<Row> {
    rows.into_iter().next()
}

/// Read a single column value off the first row of a rowset
pub fn scalar(rows: &[Row], column: &str) -> Option<FieldValue> {
    rows.first().and_then(|row| row.get(column)).cloned()
}

/// Convert a JSON object into a row of field values. Null becomes an
/// empty row; anything else is not row-shaped.
pub fn row_from_json(value: JsonValue) -> Option<Row> {
    match value {
        JsonValue::Null => Some(Row::new()),
        JsonValue::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, FieldValue::from_json(v)))
                .collect(),
        ),
        _ => None,
    }
}
