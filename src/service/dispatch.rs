//! Dynamic Dispatch Router - Conventional method names to tagged operations
//!
//! The route table is built once per service definition: pass-through
//! properties register their exact names, every relation registers its
//! `create<Property>` route, and each unique singular registers the
//! has/add/remove family. Dispatch is a map lookup, never a per-call
//! string scan; unresolvable singular-shaped names fail with the
//! dedicated ambiguity error.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};
use crate::schema::{RelationDescriptor, ServiceDef};
use crate::service::ServiceInstance;
use crate::storage::row_from_json;

/// Tagged operation resolved from a conventional method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Return a relation's value, populating it if absent
    PassThrough(String),
    /// Create the relation's value (`create<Property>`)
    Create(String),
    /// Membership check on a collection (`has<Singular>`)
    Has(String),
    /// Append to a collection (`add<Singular>`)
    Add(String),
    /// Remove a collection element by identifier (`remove<Singular>ById`)
    RemoveById(String),
    /// Remove a collection element by its declared match key (`remove<Singular>`)
    Remove(String),
    /// Delete the aggregate root
    Delete,
}

pub(crate) fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub(crate) fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Build the route table for a set of relation descriptors. A singular
/// declared by more than one property registers no routes at all, so its
/// method names fall through to the ambiguity error at dispatch time.
pub(crate) fn build_routes(
    relations: &BTreeMap<String, RelationDescriptor>,
) -> HashMap<String, Operation> {
    let mut singular_count: HashMap<&str, usize> = HashMap::new();
    for descriptor in relations.values() {
        if let Some(singular) = &descriptor.singular {
            *singular_count.entry(singular.as_str()).or_insert(0) += 1;
        }
    }

    let mut routes = HashMap::new();
    routes.insert("delete".to_string(), Operation::Delete);
    for descriptor in relations.values() {
        let property = descriptor.property.clone();
        if descriptor.pass_through {
            routes.insert(property.clone(), Operation::PassThrough(property.clone()));
        }
        routes.insert(
            format!("create{}", ucfirst(&property)),
            Operation::Create(property.clone()),
        );
        if let Some(singular) = &descriptor.singular {
            if singular_count[singular.as_str()] == 1 {
                let name = ucfirst(singular);
                routes.insert(format!("has{name}"), Operation::Has(property.clone()));
                routes.insert(format!("add{name}"), Operation::Add(property.clone()));
                routes.insert(
                    format!("remove{name}ById"),
                    Operation::RemoveById(property.clone()),
                );
                routes.insert(format!("remove{name}"), Operation::Remove(property.clone()));
            }
        }
    }
    routes
}

impl ServiceDef {
    /// Resolve a method name to its operation. Names shaped like the
    /// singular conventions but resolving to zero or several properties
    /// fail with `AmbiguousOrUnknownSingular`; everything else unknown
    /// fails with `UnknownOperation`.
    pub fn route(&self, method: &str) -> EngineResult<Operation> {
        if let Some(operation) = self.routes().get(method) {
            return Ok(operation.clone());
        }

        for prefix in ["has", "add", "remove"] {
            let Some(rest) = method.strip_prefix(prefix) else {
                continue;
            };
            if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                let rest = if prefix == "remove" {
                    rest.strip_suffix("ById").unwrap_or(rest)
                } else {
                    rest
                };
                return Err(EngineError::AmbiguousOrUnknownSingular {
                    service: self.name().to_string(),
                    singular: lcfirst(rest),
                });
            }
        }

        Err(EngineError::UnknownOperation {
            service: self.name().to_string(),
            method: method.to_string(),
        })
    }
}

impl ServiceInstance {
    /// Dispatch a conventional method name with a JSON payload. Create
    /// expects an object (or null) payload; has/add/remove take the value
    /// being matched, added, or removed.
    pub fn call(&mut self, method: &str, payload: JsonValue) -> EngineResult<JsonValue> {
        let operation = self.def.route(method)?;
        tracing::debug!(
            service = self.type_name(),
            method = method,
            operation = ?operation,
            "dispatching"
        );
        match operation {
            Operation::PassThrough(property) => self.reveal_slot(&property),
            Operation::Create(property) => {
                let data = row_from_json(payload).ok_or_else(|| {
                    EngineError::metadata(
                        format!("{}.{property}", self.type_name()),
                        "create payload must be an object",
                    )
                })?;
                self.create_relation(&property, data)?;
                Ok(JsonValue::Null)
            }
            Operation::Has(property) => {
                Ok(JsonValue::Bool(self.has_relation(&property, &payload)?))
            }
            Operation::Add(property) => {
                self.add_to_relation(&property, payload)?;
                Ok(JsonValue::Null)
            }
            Operation::RemoveById(property) => {
                self.remove_from_relation(&property, payload, true)?;
                Ok(JsonValue::Null)
            }
            Operation::Remove(property) => {
                self.remove_from_relation(&property, payload, false)?;
                Ok(JsonValue::Null)
            }
            Operation::Delete => {
                self.delete()?;
                Ok(JsonValue::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RelationDescriptor, RelationKind};

    fn collection_descriptor(property: &str, singular: Option<&str>) -> RelationDescriptor {
        let mut descriptor = RelationDescriptor::new(
            property,
            RelationKind::Collection {
                entity: "OrderItem".to_string(),
                sort: None,
                limit: None,
                filter: Vec::new(),
            },
        );
        descriptor.singular = singular.map(str::to_string);
        descriptor
    }

    fn relations(descriptors: Vec<RelationDescriptor>) -> BTreeMap<String, RelationDescriptor> {
        descriptors
            .into_iter()
            .map(|d| (d.property.clone(), d))
            .collect()
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(ucfirst("item"), "Item");
        assert_eq!(lcfirst("Item"), "item");
        assert_eq!(ucfirst(""), "");
    }

    #[test]
    fn test_routes_for_unique_singular() {
        let routes = build_routes(&relations(vec![collection_descriptor(
            "items",
            Some("item"),
        )]));

        assert_eq!(routes.get("hasItem"), Some(&Operation::Has("items".into())));
        assert_eq!(routes.get("addItem"), Some(&Operation::Add("items".into())));
        assert_eq!(
            routes.get("removeItem"),
            Some(&Operation::Remove("items".into()))
        );
        assert_eq!(
            routes.get("removeItemById"),
            Some(&Operation::RemoveById("items".into()))
        );
        assert_eq!(
            routes.get("createItems"),
            Some(&Operation::Create("items".into()))
        );
        assert_eq!(routes.get("delete"), Some(&Operation::Delete));
    }

    #[test]
    fn test_duplicate_singular_registers_no_routes() {
        let routes = build_routes(&relations(vec![
            collection_descriptor("items", Some("item")),
            collection_descriptor("archivedItems", Some("item")),
        ]));
        assert!(routes.get("hasItem").is_none());
        assert!(routes.get("removeItemById").is_none());
    }

    #[test]
    fn test_pass_through_registers_exact_name() {
        let mut descriptor = collection_descriptor("items", None);
        descriptor.pass_through = true;
        let routes = build_routes(&relations(vec![descriptor]));
        assert_eq!(
            routes.get("items"),
            Some(&Operation::PassThrough("items".into()))
        );
    }
}
