//! # trellis: Metadata-Driven Aggregate Materialization
//!
//! trellis wraps persisted records into service aggregates whose
//! relations - nested records, ordered collections, derived columns, and
//! nested sub-services - are declared once as metadata and resolved
//! lazily on first access. A convention-based dispatch surface maps
//! method names like `createShipment`, `hasItem`, or `removeItemById`
//! onto permission-checked mutations, and two projection modes produce
//! shallow or deep JSON representations of a whole aggregate.
//!
//! Persistence is a collaborator: the engine only speaks the blocking
//! [`storage::StorageBackend`] contract and ships an in-memory
//! implementation for tests and embedded use.

pub mod annotation;
pub mod collection;
pub mod error;
pub mod record;
pub mod schema;
pub mod service;
pub mod storage;
pub mod value;

#[cfg(test)]
pub(crate) mod tests_cfg;

// Re-export the core surface
pub use annotation::{AnnotationSet, AnnotationValue, ClassAnnotations};
pub use collection::Collection;
pub use error::{EngineError, EngineResult};
pub use record::Record;
pub use schema::{
    EntityDef, ForeignLink, RelationDescriptor, RelationKind, Schema, ServiceDef,
};
pub use service::{Operation, QueryOverrides, RelationValue, ServiceInstance};
pub use storage::{
    MemoryBackend, OrderDirection, Query, Row, SortSpec, StorageBackend, StorageError,
};
pub use value::FieldValue;
