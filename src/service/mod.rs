//! Service Instances - One aggregate root with lazily populated relations
//!
//! A `ServiceInstance` wraps exactly one backing record plus a slot per
//! declared relation. A slot is either unpopulated (absent) or populated
//! with a resolved value; a populated null is a real state, distinct from
//! "never fetched". Slots transition unpopulated to populated exactly
//! once, on first access, and are only cleared through `reset`.

pub mod dispatch;
pub mod populate;

mod mutate;
mod project;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::collection::Collection;
use crate::error::{EngineError, EngineResult};
use crate::record::Record;
use crate::schema::{Schema, ServiceDef};
use crate::storage::{Row, StorageBackend};
use crate::value::FieldValue;

pub use dispatch::Operation;
pub use populate::QueryOverrides;

/// Resolved value held by a populated relation slot
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// Populated, but the relation does not apply to this instance
    Null,
    /// A derived scalar column value
    Scalar(FieldValue),
    /// A single related record
    Entity(Record),
    /// An ordered collection of related records
    Collection(Collection),
    /// A nested service aggregate
    Service(Box<ServiceInstance>),
}

impl RelationValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RelationValue::Null)
    }
}

/// One materialized aggregate: a backing record plus relation slots
#[derive(Clone)]
pub struct ServiceInstance {
    schema: Arc<Schema>,
    backend: Arc<dyn StorageBackend>,
    def: Arc<ServiceDef>,
    instance: Option<Record>,
    slots: HashMap<String, RelationValue>,
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("service", &self.def.name())
            .field("instance", &self.instance)
            .field("slots", &self.slots)
            .finish()
    }
}

impl ServiceInstance {
    /// Materialize by primary key. The master fetch is the aggregation
    /// root: zero rows is fatal.
    pub fn find(
        schema: Arc<Schema>,
        backend: Arc<dyn StorageBackend>,
        service: &str,
        id: impl Into<FieldValue>,
    ) -> EngineResult<Self> {
        let def = schema.service(service)?;
        let entity = schema.entity(def.contains())?;
        let record = Record::find_by_id(entity, backend.as_ref(), id)?;
        Self::assemble(schema, backend, def, record)
    }

    /// Materialize by an arbitrary column, typically a foreign key seeded
    /// by a parent aggregate. Zero rows is fatal, as with `find`.
    pub fn find_by(
        schema: Arc<Schema>,
        backend: Arc<dyn StorageBackend>,
        service: &str,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> EngineResult<Self> {
        let def = schema.service(service)?;
        let entity = schema.entity(def.contains())?;
        let criteria = vec![(column.to_string(), value.into())];
        let record = Record::find_by(entity.clone(), backend.as_ref(), &criteria)?.ok_or_else(
            || EngineError::EntityNotFound {
                entity: entity.name().to_string(),
                criteria: format!("{} = {:?}", criteria[0].0, criteria[0].1),
            },
        )?;
        Self::assemble(schema, backend, def, record)
    }

    /// Materialize from an already-fetched row
    pub fn from_row(
        schema: Arc<Schema>,
        backend: Arc<dyn StorageBackend>,
        service: &str,
        row: Row,
    ) -> EngineResult<Self> {
        let def = schema.service(service)?;
        let entity = schema.entity(def.contains())?;
        let record = Record::from_row(entity, row);
        Self::assemble(schema, backend, def, record)
    }

    /// Create the backing record, then materialize around it
    pub fn create(
        schema: Arc<Schema>,
        backend: Arc<dyn StorageBackend>,
        service: &str,
        data: Row,
    ) -> EngineResult<Self> {
        let def = schema.service(service)?;
        let entity = schema.entity(def.contains())?;
        let record = Record::create(entity, backend.as_ref(), data)?;
        tracing::debug!(service = service, "created aggregate root");
        Self::assemble(schema, backend, def, record)
    }

    fn assemble(
        schema: Arc<Schema>,
        backend: Arc<dyn StorageBackend>,
        def: Arc<ServiceDef>,
        record: Record,
    ) -> EngineResult<Self> {
        let mut service = Self {
            schema,
            backend,
            def,
            instance: Some(record),
            slots: HashMap::new(),
        };
        service.populate_on_construct()?;
        Ok(service)
    }

    /// The service type identifier
    pub fn type_name(&self) -> &str {
        self.def.name()
    }

    pub fn def(&self) -> &ServiceDef {
        &self.def
    }

    /// The wrapped backing record; `None` once the aggregate is deleted
    pub fn record(&self) -> Option<&Record> {
        self.instance.as_ref()
    }

    /// A populated relation slot, or `None` while unpopulated
    pub fn relation(&self, property: &str) -> Option<&RelationValue> {
        self.slots.get(property)
    }

    pub fn is_populated(&self, property: &str) -> bool {
        self.slots.contains_key(property)
    }

    /// Clear a slot. This is the only sanctioned path back to the
    /// unpopulated state; the next access fetches again.
    pub fn reset(&mut self, property: &str) {
        self.slots.remove(property);
    }

    /// The master record, or `AlreadyDeleted` once the root is gone
    pub(crate) fn master(&self) -> EngineResult<&Record> {
        self.instance.as_ref().ok_or_else(|| EngineError::AlreadyDeleted {
            service: self.def.name().to_string(),
        })
    }
}
