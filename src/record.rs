//! Record - One materialized row of an entity type
//!
//! A record pairs an entity definition with the row it was fetched from.
//! The backing store is consulted only through the constructors and the
//! create/delete operations; a materialized record never refreshes itself.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};
use crate::schema::EntityDef;
use crate::storage::{first_row, Query, Row, StorageBackend};
use crate::value::FieldValue;

/// One persisted row wrapped with its entity definition
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    def: Arc<EntityDef>,
    row: Row,
}

impl Record {
    /// Wrap an already-fetched row
    pub fn from_row(def: Arc<EntityDef>, row: Row) -> Self {
        Self { def, row }
    }

    /// Fetch by primary key. Zero rows is fatal here; this constructor is
    /// reserved for aggregation roots where absence means the aggregate
    /// does not exist.
    pub fn find_by_id(
        def: Arc<EntityDef>,
        backend: &dyn StorageBackend,
        id: impl Into<FieldValue>,
    ) -> EngineResult<Self> {
        let id = id.into();
        let criteria = vec![(def.primary_key().to_string(), id)];
        let found = Self::find_by(def.clone(), backend, &criteria)?;
        found.ok_or_else(|| EngineError::EntityNotFound {
            entity: def.name().to_string(),
            criteria: describe(&criteria),
        })
    }

    /// Fetch the first row matching equality criteria; absence is valid
    pub fn find_by(
        def: Arc<EntityDef>,
        backend: &dyn StorageBackend,
        criteria: &[(String, FieldValue)],
    ) -> EngineResult<Option<Self>> {
        let columns: Vec<&str> = def.columns().iter().map(String::as_str).collect();
        let mut query = Query::from(def.table()).select(&columns);
        for (column, value) in criteria {
            query = query.where_eq(column, value.clone());
        }
        let rows = backend.fetch(&query)?;
        Ok(first_row(rows).map(|row| Self::from_row(def, row)))
    }

    /// Insert a new row and wrap the stored state
    pub fn create(
        def: Arc<EntityDef>,
        backend: &dyn StorageBackend,
        values: Row,
    ) -> EngineResult<Self> {
        let stored = backend.insert(def.table(), values)?;
        Ok(Self::from_row(def, stored))
    }

    /// Delete the backing row by primary key
    pub fn delete(&self, backend: &dyn StorageBackend) -> EngineResult<()> {
        let id = self.id().ok_or_else(|| {
            EngineError::metadata(self.def.name(), "record has no primary key value")
        })?;
        backend.delete(self.def.table(), self.def.primary_key(), id)?;
        Ok(())
    }

    pub fn def(&self) -> &EntityDef {
        &self.def
    }

    /// Read one column value
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.row.get(column)
    }

    /// The primary key value, if present on the row
    pub fn id(&self) -> Option<&FieldValue> {
        self.get(self.def.primary_key())
    }

    /// Project the declared columns to a JSON object; columns absent from
    /// the row are emitted as explicit null to keep the shape stable
    pub fn to_value(&self) -> JsonValue {
        let mut data = serde_json::Map::new();
        for column in self.def.columns() {
            let value = self
                .row
                .get(column)
                .map(FieldValue::to_json)
                .unwrap_or(JsonValue::Null);
            data.insert(column.clone(), value);
        }
        JsonValue::Object(data)
    }
}

fn describe(criteria: &[(String, FieldValue)]) -> String {
    criteria
        .iter()
        .map(|(column, value)| format!("{column} = {:?}", value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn order_def() -> Arc<EntityDef> {
        Arc::new(EntityDef::new("Order", "orders").with_columns(&["id", "number", "customer_id"]))
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(
            "orders",
            vec![
                [
                    ("id".to_string(), FieldValue::Int(7)),
                    ("number".to_string(), FieldValue::from("A-7")),
                    ("customer_id".to_string(), FieldValue::Int(1)),
                ]
                .into_iter()
                .collect(),
            ],
        );
        backend
    }

    #[test]
    fn test_find_by_id() {
        let backend = backend();
        let record = Record::find_by_id(order_def(), &backend, 7).unwrap();
        assert_eq!(record.get("number"), Some(&FieldValue::from("A-7")));
        assert_eq!(record.id(), Some(&FieldValue::Int(7)));
    }

    #[test]
    fn test_find_by_id_missing_is_fatal() {
        let backend = backend();
        let err = Record::find_by_id(order_def(), &backend, 99).unwrap_err();
        assert!(matches!(err, EngineError::EntityNotFound { .. }));
    }

    #[test]
    fn test_find_by_missing_is_none() {
        let backend = backend();
        let criteria = vec![("number".to_string(), FieldValue::from("B-1"))];
        assert!(Record::find_by(order_def(), &backend, &criteria)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_returns_stored_state() {
        let backend = backend();
        let mut values = Row::new();
        values.insert("number".to_string(), FieldValue::from("A-8"));
        let record = Record::create(order_def(), &backend, values).unwrap();
        assert!(record.id().is_some());
        assert_eq!(backend.rows_in("orders"), 2);
    }

    #[test]
    fn test_delete_removes_row() {
        let backend = backend();
        let record = Record::find_by_id(order_def(), &backend, 7).unwrap();
        record.delete(&backend).unwrap();
        assert_eq!(backend.rows_in("orders"), 0);
    }

    #[test]
    fn test_to_value_keeps_stable_shape() {
        let def = order_def();
        let mut row = Row::new();
        row.insert("id".to_string(), FieldValue::Int(7));
        let record = Record::from_row(def, row);
        let value = record.to_value();
        assert_eq!(value["id"], serde_json::json!(7));
        assert!(value["number"].is_null());
        assert!(value["customer_id"].is_null());
    }
}
