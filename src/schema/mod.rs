//! Schema Layer - Entity capability descriptors, relation resolution, and
//! the explicit type registry

pub mod entity;
pub mod registry;
pub mod relation;
pub mod resolver;

pub use entity::{EntityDef, ForeignLink};
pub use registry::{Schema, ServiceDef};
pub use relation::{AddSpec, HasSpec, RelationDescriptor, RelationKind, RemoveSpec};
