//! Entity Mutation Operations - Permission-checked create/has/add/remove
//!
//! Every mutation validates its metadata permission before touching the
//! storage collaborator: a missing flag is a hard denial, not a silent
//! no-op, and must not generate any persistence traffic.

use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};
use crate::record::Record;
use crate::schema::RelationKind;
use crate::service::{RelationValue, ServiceInstance};
use crate::storage::{row_from_json, Row};
use crate::value::FieldValue;

impl ServiceInstance {
    /// Create the value of a relation slot, injecting the derived parent
    /// link into the payload. Denied unless the relation declares
    /// `createInstance`; refused when the slot already holds a value.
    pub fn create_relation(&mut self, property: &str, data: Row) -> EngineResult<()> {
        let descriptor = self.descriptor(property)?;

        if matches!(self.slots.get(property), Some(slot) if !slot.is_null()) {
            return Err(EngineError::AlreadyExists {
                service: self.type_name().to_string(),
                property: property.to_string(),
            });
        }
        if !descriptor.create_instance {
            return Err(EngineError::CreateNotAllowed {
                service: self.type_name().to_string(),
                property: property.to_string(),
            });
        }

        let value = match &descriptor.kind {
            RelationKind::Service { service } => {
                let nested_def = self.schema.service(service)?;
                let child = self.schema.entity(nested_def.contains())?;
                let (link, link_value) = self.link_to_master(&child)?;
                let mut data = data;
                data.insert(link.column, link_value);
                let nested = ServiceInstance::create(
                    self.schema.clone(),
                    self.backend.clone(),
                    service,
                    data,
                )?;
                RelationValue::Service(Box::new(nested))
            }
            RelationKind::Single { entity } => {
                let child = self.schema.entity(entity)?;
                let (link, link_value) = self.link_to_master(&child)?;
                let mut data = data;
                data.insert(link.column, link_value);
                RelationValue::Entity(Record::create(child, self.backend.as_ref(), data)?)
            }
            _ => {
                return Err(EngineError::CreateNotAllowed {
                    service: self.type_name().to_string(),
                    property: property.to_string(),
                })
            }
        };

        tracing::debug!(
            service = self.type_name(),
            property = property,
            "created relation value"
        );
        self.slots.insert(property.to_string(), value);
        Ok(())
    }

    /// Membership check against a collection's declared match column. An
    /// array payload matches if any element matches, short-circuiting on
    /// the first hit.
    pub fn has_relation(&mut self, property: &str, value: &JsonValue) -> EngineResult<bool> {
        if let JsonValue::Array(candidates) = value {
            for candidate in candidates {
                if self.has_relation(property, candidate)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        let descriptor = self.descriptor(property)?;
        let matcher = descriptor.has.clone().ok_or_else(|| EngineError::HasNotSupported {
            service: self.type_name().to_string(),
            property: property.to_string(),
        })?;

        self.populate(property)?;
        match self.slots.get(property) {
            Some(RelationValue::Collection(collection)) => Ok(collection
                .has_object_with(&matcher.match_column, &FieldValue::from_json(value.clone()))),
            _ => Err(EngineError::HasNotSupported {
                service: self.type_name().to_string(),
                property: property.to_string(),
            }),
        }
    }

    /// Append to a collection. A scalar payload is normalized into a
    /// single-entry row keyed by the `add` descriptor's property.
    pub fn add_to_relation(&mut self, property: &str, value: JsonValue) -> EngineResult<()> {
        let descriptor = self.descriptor(property)?;
        let spec = descriptor.add.clone().ok_or_else(|| EngineError::AddNotAllowed {
            service: self.type_name().to_string(),
            property: property.to_string(),
        })?;

        let values = match row_from_json(value.clone()) {
            Some(row) => row,
            None => {
                let mut row = Row::new();
                row.insert(spec.property, FieldValue::from_json(value));
                row
            }
        };

        let child = self.schema.entity(descriptor.kind.target())?;
        let (link, _) = self.link_to_master(&child)?;
        let master = self.master()?.clone();

        self.populate(property)?;
        let backend = self.backend.clone();
        match self.slots.get_mut(property) {
            Some(RelationValue::Collection(collection)) => {
                collection.add_reference_to(backend.as_ref(), &master, &link, values)?;
                tracing::debug!(
                    service = self.def.name(),
                    property = property,
                    "added collection element"
                );
                Ok(())
            }
            _ => Err(EngineError::AddNotAllowed {
                service: self.def.name().to_string(),
                property: property.to_string(),
            }),
        }
    }

    /// Remove one collection element. The lookup key is the target's
    /// primary key for the ById variant, otherwise the `remove`
    /// descriptor's property.
    pub fn remove_from_relation(
        &mut self,
        property: &str,
        value: JsonValue,
        by_id: bool,
    ) -> EngineResult<()> {
        let descriptor = self.descriptor(property)?;
        let spec = descriptor.remove.clone().ok_or_else(|| EngineError::RemoveNotAllowed {
            service: self.type_name().to_string(),
            property: property.to_string(),
        })?;

        self.populate(property)?;
        let backend = self.backend.clone();
        let service = self.def.name().to_string();
        match self.slots.get_mut(property) {
            Some(RelationValue::Collection(collection)) => {
                let key = if by_id {
                    collection.def().primary_key().to_string()
                } else {
                    spec.property
                };
                let needle = FieldValue::from_json(value);
                let id = match collection.get_object_by(&key, &needle) {
                    Some(record) => record.id().cloned().ok_or_else(|| {
                        EngineError::metadata(
                            collection.def().name(),
                            "collection element has no primary key value",
                        )
                    })?,
                    None => {
                        return Err(EngineError::EntityNotFound {
                            entity: collection.def().name().to_string(),
                            criteria: format!("{key} = {needle:?}"),
                        })
                    }
                };
                collection.delete_by_id(backend.as_ref(), &id)?;
                tracing::debug!(
                    service = service.as_str(),
                    property = property,
                    "removed collection element"
                );
                Ok(())
            }
            _ => Err(EngineError::RemoveNotAllowed {
                service,
                property: property.to_string(),
            }),
        }
    }

    /// Delete the aggregate root. Subsequent operations on this instance
    /// see a deleted aggregate.
    pub fn delete(&mut self) -> EngineResult<()> {
        let record = self.instance.as_ref().ok_or_else(|| EngineError::AlreadyDeleted {
            service: self.def.name().to_string(),
        })?;
        record.delete(self.backend.as_ref())?;
        self.instance = None;
        tracing::debug!(service = self.def.name(), "deleted aggregate root");
        Ok(())
    }

    fn descriptor(&self, property: &str) -> EngineResult<crate::schema::RelationDescriptor> {
        self.def.relation(property).cloned().ok_or_else(|| {
            EngineError::metadata(
                format!("{}.{property}", self.def.name()),
                "unknown relation property",
            )
        })
    }
}
