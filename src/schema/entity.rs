//! Entity Definitions - Per-type capability descriptors built once
//!
//! An `EntityDef` carries everything the engine needs to know about a
//! persisted record type: its table, its hard (persisted) columns, its
//! intrinsic sort order, and the foreign links it declares towards other
//! entity types. Links are derived on demand and never stored on
//! instances.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::storage::SortSpec;

/// How a child record's column matches a parent record's key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignLink {
    /// Column on the child table holding the parent's key value
    pub column: String,
    /// Column on the parent table supplying that value
    pub parent_column: String,
}

impl ForeignLink {
    pub fn new(column: impl Into<String>, parent_column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// Capability descriptor for one persisted entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    name: String,
    table: String,
    columns: Vec<String>,
    sort_columns: SortSpec,
    primary_key: String,
    references: HashMap<String, ForeignLink>,
}

impl EntityDef {
    /// Create a new entity definition with the default `id` primary key
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            sort_columns: Vec::new(),
            primary_key: "id".to_string(),
            references: HashMap::new(),
        }
    }

    /// Set the persisted column names
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Set the intrinsic default sort order
    pub fn with_sort_columns(mut self, sort_columns: SortSpec) -> Self {
        self.sort_columns = sort_columns;
        self
    }

    /// Override the primary key column name
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Declare the foreign link from this entity towards another type
    pub fn with_reference(mut self, target: &str, link: ForeignLink) -> Self {
        self.references.insert(target.to_string(), link);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sort_columns(&self) -> &SortSpec {
        &self.sort_columns
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The foreign link connecting this entity to the given type.
    /// Absence is the recoverable `LinkNotFound` condition.
    pub fn reference_to(&self, target: &str) -> EngineResult<&ForeignLink> {
        self.references
            .get(target)
            .ok_or_else(|| EngineError::LinkNotFound {
                child: self.name.clone(),
                parent: target.to_string(),
            })
    }

    /// Validate the definition for registration
    pub fn validate(&self) -> EngineResult<()> {
        if self.table.is_empty() {
            return Err(EngineError::metadata(&self.name, "table name is empty"));
        }
        if self.columns.is_empty() {
            return Err(EngineError::metadata(&self.name, "no columns declared"));
        }
        if !self.columns.iter().any(|c| c == &self.primary_key) {
            return Err(EngineError::metadata(
                &self.name,
                format!("primary key '{}' is not a declared column", self.primary_key),
            ));
        }
        for (column, _) in self.sort_columns.iter() {
            if !self.columns.iter().any(|c| c == column) {
                return Err(EngineError::metadata(
                    &self.name,
                    format!("sort column '{column}' is not a declared column"),
                ));
            }
        }
        for (target, link) in self.references.iter() {
            if !self.columns.iter().any(|c| c == &link.column) {
                return Err(EngineError::metadata(
                    &self.name,
                    format!(
                        "reference to '{target}' uses undeclared column '{}'",
                        link.column
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OrderDirection;

    fn order_item() -> EntityDef {
        EntityDef::new("OrderItem", "order_items")
            .with_columns(&["id", "order_id", "sku", "position"])
            .with_sort_columns(vec![("position".to_string(), OrderDirection::Asc)])
            .with_reference("Order", ForeignLink::new("order_id", "id"))
    }

    #[test]
    fn test_valid_definition() {
        assert!(order_item().validate().is_ok());
    }

    #[test]
    fn test_reference_to_known_type() {
        let def = order_item();
        let link = def.reference_to("Order").unwrap();
        assert_eq!(link.column, "order_id");
        assert_eq!(link.parent_column, "id");
    }

    #[test]
    fn test_reference_to_unknown_type_is_link_not_found() {
        let err = order_item().reference_to("Customer").unwrap_err();
        assert!(err.is_link_not_found());
    }

    #[test]
    fn test_validation_rejects_unknown_primary_key() {
        let def = EntityDef::new("Order", "orders")
            .with_columns(&["number"])
            .with_primary_key("id");
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_sort_column() {
        let def = EntityDef::new("Order", "orders")
            .with_columns(&["id"])
            .with_sort_columns(vec![("missing".to_string(), OrderDirection::Asc)]);
        assert!(def.validate().is_err());
    }
}
