//! Schema Registry - Explicit per-type descriptor storage
//!
//! The `Schema` is constructed once at startup, populated in dependency
//! order (entities first, then services, nested services before the
//! services embedding them), and shared behind an `Arc`. There is no
//! hidden global; everything that needs type metadata receives the schema
//! explicitly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use crate::annotation::ClassAnnotations;
use crate::error::{EngineError, EngineResult};
use crate::schema::entity::EntityDef;
use crate::schema::relation::RelationDescriptor;
use crate::schema::resolver;
use crate::service::dispatch::{build_routes, Operation};

/// Compiled definition of one service type
#[derive(Debug, Clone)]
pub struct ServiceDef {
    name: String,
    contains: String,
    reveal_as: Option<String>,
    relations: BTreeMap<String, RelationDescriptor>,
    routes: HashMap<String, Operation>,
}

impl ServiceDef {
    pub(crate) fn new(
        name: &str,
        contains: &str,
        reveal_as: Option<String>,
        relations: BTreeMap<String, RelationDescriptor>,
    ) -> Self {
        let routes = build_routes(&relations);
        Self {
            name: name.to_string(),
            contains: contains.to_string(),
            reveal_as,
            relations,
            routes,
        }
    }

    /// The stable service type identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity type of the wrapped master record
    pub fn contains(&self) -> &str {
        &self.contains
    }

    /// Class-level external name of the master record in projections
    pub fn reveal_as(&self) -> Option<&str> {
        self.reveal_as.as_deref()
    }

    pub fn relation(&self, property: &str) -> Option<&RelationDescriptor> {
        self.relations.get(property)
    }

    /// Declared relations in property-name order
    pub fn relations(&self) -> impl Iterator<Item = &RelationDescriptor> {
        self.relations.values()
    }

    pub(crate) fn routes(&self) -> &HashMap<String, Operation> {
        &self.routes
    }
}

/// Registry of entity and service definitions
#[derive(Debug, Default)]
pub struct Schema {
    entities: DashMap<String, Arc<EntityDef>>,
    services: DashMap<String, Arc<ServiceDef>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition, validating it first
    pub fn register_entity(&self, def: EntityDef) -> EngineResult<()> {
        def.validate()?;
        if self.entities.contains_key(def.name()) {
            return Err(EngineError::metadata(
                def.name(),
                "entity is already registered",
            ));
        }
        self.entities.insert(def.name().to_string(), Arc::new(def));
        Ok(())
    }

    /// Compile and register a service type from its declarative metadata.
    /// Entities and nested services it references must be registered
    /// before it.
    pub fn register_service(
        &self,
        name: &str,
        annotations: &ClassAnnotations,
    ) -> EngineResult<()> {
        if self.services.contains_key(name) {
            return Err(EngineError::metadata(name, "service is already registered"));
        }
        let def = resolver::build_service(self, name, annotations)?;
        self.services.insert(name.to_string(), Arc::new(def));
        Ok(())
    }

    pub fn entity(&self, name: &str) -> EngineResult<Arc<EntityDef>> {
        self.entities
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| EngineError::metadata(name, "unknown entity type"))
    }

    pub fn service(&self, name: &str) -> EngineResult<Arc<ServiceDef>> {
        self.services
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| EngineError::metadata(name, "unknown service type"))
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn is_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}
