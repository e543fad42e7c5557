//! Relation Descriptors - Strongly-typed registry entries per property
//!
//! The resolver compiles each property's raw annotations into one
//! `RelationDescriptor` at registration time, so population, projection,
//! and dispatch never match on strings at call time.

use serde::{Deserialize, Serialize};

use crate::storage::SortSpec;
use crate::value::FieldValue;

/// Classification of a declared relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationKind {
    /// One related record of an entity type, or null
    Single { entity: String },
    /// Ordered, type-homogeneous set of related records
    Collection {
        entity: String,
        /// Class-declared sort override; falls back to the entity's
        /// intrinsic sort columns when absent
        sort: Option<SortSpec>,
        limit: Option<u64>,
        /// Class-declared filter defaults
        filter: Vec<(String, FieldValue)>,
    },
    /// One derived scalar read off a related table
    Column {
        entity: String,
        column: String,
        /// Filter by the derived parent link when the owning type is a
        /// child of the current aggregate
        is_child: bool,
    },
    /// A nested service aggregate, constructed through its own machinery
    Service { service: String },
}

impl RelationKind {
    pub fn is_collection(&self) -> bool {
        matches!(self, RelationKind::Collection { .. })
    }

    /// The referenced type identifier, whatever the kind
    pub fn target(&self) -> &str {
        match self {
            RelationKind::Single { entity } => entity,
            RelationKind::Collection { entity, .. } => entity,
            RelationKind::Column { entity, .. } => entity,
            RelationKind::Service { service } => service,
        }
    }
}

/// Membership-check matcher declared by a `has` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasSpec {
    pub match_column: String,
}

/// Scalar-payload key declared by an `add` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddSpec {
    pub property: String,
}

/// Lookup key declared by a `remove` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveSpec {
    pub property: String,
}

/// Compiled metadata for one relation property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub property: String,
    pub kind: RelationKind,
    /// External name in projections; unrevealed relations stay internal
    pub reveal_as: Option<String>,
    /// Singular used by the has/add/remove method-name conventions
    pub singular: Option<String>,
    /// The property name itself is a dispatchable accessor
    pub pass_through: bool,
    /// Expected populated by construction time; projections never lazily
    /// fetch it
    pub on_construct: bool,
    /// Skipped by construction-time population; populated on first access
    pub lazy: bool,
    /// Projects as a bare scalar (`instanceOf: value`)
    pub reveal_value: bool,
    /// Create mutation permission
    pub create_instance: bool,
    /// False declares this relation an explicit root: no parent link is
    /// derived and collections fetch unfiltered
    pub foreign: bool,
    pub has: Option<HasSpec>,
    pub add: Option<AddSpec>,
    pub remove: Option<RemoveSpec>,
}

impl RelationDescriptor {
    /// A bare descriptor of the given kind; flags default to the same
    /// values an empty annotation set resolves to
    pub fn new(property: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            property: property.into(),
            kind,
            reveal_as: None,
            singular: None,
            pass_through: false,
            on_construct: false,
            lazy: false,
            reveal_value: false,
            create_instance: false,
            foreign: true,
            has: None,
            add: None,
            remove: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_helpers() {
        let collection = RelationKind::Collection {
            entity: "OrderItem".to_string(),
            sort: None,
            limit: None,
            filter: Vec::new(),
        };
        assert!(collection.is_collection());
        assert_eq!(collection.target(), "OrderItem");

        let service = RelationKind::Service {
            service: "BillingService".to_string(),
        };
        assert!(!service.is_collection());
        assert_eq!(service.target(), "BillingService");
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = RelationDescriptor::new(
            "shipment",
            RelationKind::Single {
                entity: "Shipment".to_string(),
            },
        );
        assert!(descriptor.foreign);
        assert!(!descriptor.lazy);
        assert!(!descriptor.create_instance);
        assert!(descriptor.has.is_none());
    }
}
