//! Collection - Ordered, type-homogeneous list of related records
//!
//! Collections are fetched as a unit with their filters, multi-key sort,
//! and optional limit already applied, and afterwards expose the
//! membership and mutation primitives the dispatch layer builds on.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};
use crate::record::Record;
use crate::schema::{EntityDef, ForeignLink};
use crate::storage::{Query, Row, SortSpec, StorageBackend};
use crate::value::FieldValue;

/// Ordered set of records of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    def: Arc<EntityDef>,
    items: Vec<Record>,
}

impl Collection {
    /// An empty collection of the given type
    pub fn empty(def: Arc<EntityDef>) -> Self {
        Self {
            def,
            items: Vec::new(),
        }
    }

    /// Fetch all rows matching the filters, sorted stably by the given
    /// keys and optionally limited
    pub fn fetch(
        def: Arc<EntityDef>,
        backend: &dyn StorageBackend,
        filters: &[(String, FieldValue)],
        sort: &SortSpec,
        limit: Option<u64>,
    ) -> EngineResult<Self> {
        let columns: Vec<&str> = def.columns().iter().map(String::as_str).collect();
        let mut query = Query::from(def.table()).select(&columns);
        for (column, value) in filters {
            query = query.where_eq(column, value.clone());
        }
        if !sort.is_empty() {
            query = query.order_by(sort.clone());
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let rows = backend.fetch(&query)?;
        let items = rows
            .into_iter()
            .map(|row| Record::from_row(def.clone(), row))
            .collect();
        Ok(Self { def, items })
    }

    pub fn def(&self) -> &EntityDef {
        &self.def
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.items.iter()
    }

    /// True when any element carries the value in the given column
    pub fn has_object_with(&self, column: &str, value: &FieldValue) -> bool {
        self.items.iter().any(|record| record.get(column) == Some(value))
    }

    /// First element carrying the value in the given column
    pub fn get_object_by(&self, column: &str, value: &FieldValue) -> Option<&Record> {
        self.items
            .iter()
            .find(|record| record.get(column) == Some(value))
    }

    /// Insert a new element referencing the parent record through the
    /// given link, and append the stored state to this collection
    pub fn add_reference_to(
        &mut self,
        backend: &dyn StorageBackend,
        parent: &Record,
        link: &ForeignLink,
        mut values: Row,
    ) -> EngineResult<()> {
        let parent_value = parent.get(&link.parent_column).cloned().ok_or_else(|| {
            EngineError::metadata(
                parent.def().name(),
                format!("parent column '{}' has no value", link.parent_column),
            )
        })?;
        values.insert(link.column.clone(), parent_value);
        let created = Record::create(self.def.clone(), backend, values)?;
        self.items.push(created);
        Ok(())
    }

    /// Delete an element by primary key, both in storage and in memory
    pub fn delete_by_id(
        &mut self,
        backend: &dyn StorageBackend,
        id: &FieldValue,
    ) -> EngineResult<()> {
        backend.delete(self.def.table(), self.def.primary_key(), id)?;
        self.items.retain(|record| record.id() != Some(id));
        Ok(())
    }

    /// Project every element in order
    pub fn to_value(&self) -> JsonValue {
        JsonValue::Array(self.items.iter().map(Record::to_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, OrderDirection};

    fn item_def() -> Arc<EntityDef> {
        Arc::new(
            EntityDef::new("OrderItem", "order_items")
                .with_columns(&["id", "order_id", "sku", "position"])
                .with_reference("Order", ForeignLink::new("order_id", "id")),
        )
    }

    fn order_def() -> Arc<EntityDef> {
        Arc::new(EntityDef::new("Order", "orders").with_columns(&["id", "number"]))
    }

    fn item(order_id: i64, sku: &str, position: i64) -> Row {
        [
            ("order_id".to_string(), FieldValue::Int(order_id)),
            ("sku".to_string(), FieldValue::from(sku)),
            ("position".to_string(), FieldValue::Int(position)),
        ]
        .into_iter()
        .collect()
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(
            "order_items",
            vec![item(7, "SKU-B", 2), item(7, "SKU-A", 1), item(8, "SKU-C", 1)],
        );
        backend
    }

    fn fetch_for_order_7(backend: &MemoryBackend) -> Collection {
        Collection::fetch(
            item_def(),
            backend,
            &[("order_id".to_string(), FieldValue::Int(7))],
            &vec![("position".to_string(), OrderDirection::Asc)],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_fetch_is_filtered_and_ordered() {
        let backend = backend();
        let collection = fetch_for_order_7(&backend);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.records()[0].get("sku"),
            Some(&FieldValue::from("SKU-A"))
        );
        assert_eq!(
            collection.records()[1].get("sku"),
            Some(&FieldValue::from("SKU-B"))
        );
    }

    #[test]
    fn test_membership_primitives() {
        let backend = backend();
        let collection = fetch_for_order_7(&backend);
        let sku = FieldValue::from("SKU-A");
        assert!(collection.has_object_with("sku", &sku));
        assert!(!collection.has_object_with("sku", &FieldValue::from("SKU-Z")));
        assert!(collection.get_object_by("sku", &sku).is_some());
    }

    #[test]
    fn test_add_reference_to_injects_link() {
        let backend = backend();
        backend.seed(
            "orders",
            vec![[
                ("id".to_string(), FieldValue::Int(7)),
                ("number".to_string(), FieldValue::from("A-7")),
            ]
            .into_iter()
            .collect()],
        );
        let parent = Record::find_by_id(order_def(), &backend, 7).unwrap();
        let mut collection = fetch_for_order_7(&backend);

        let link = ForeignLink::new("order_id", "id");
        let mut values = Row::new();
        values.insert("sku".to_string(), FieldValue::from("SKU-D"));
        collection
            .add_reference_to(&backend, &parent, &link, values)
            .unwrap();

        assert_eq!(collection.len(), 3);
        let added = collection
            .get_object_by("sku", &FieldValue::from("SKU-D"))
            .unwrap();
        assert_eq!(added.get("order_id"), Some(&FieldValue::Int(7)));
    }

    #[test]
    fn test_delete_by_id_updates_both_sides() {
        let backend = backend();
        let mut collection = fetch_for_order_7(&backend);
        let id = collection
            .get_object_by("sku", &FieldValue::from("SKU-A"))
            .and_then(Record::id)
            .cloned()
            .unwrap();

        collection.delete_by_id(&backend, &id).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(backend.rows_in("order_items"), 2);
    }
}
