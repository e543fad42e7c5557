//! Serialization Projector - Shallow and deep aggregate representations
//!
//! `get` walks the revealable relations and may populate slots on the
//! way; `get_hard` assumes construction-time population already happened
//! and never fetches. Both leave populated slots untouched, so projection
//! output is stable against later backing-store changes.

use serde_json::Value as JsonValue;

use crate::error::EngineResult;
use crate::schema::RelationDescriptor;
use crate::service::{RelationValue, ServiceInstance};

impl ServiceInstance {
    /// Shallow projection. `None` signals that the aggregate no longer
    /// exists: either the master record is gone, or a relation that the
    /// construction contract promised (`onConstruct`) was never populated.
    pub fn get(&mut self) -> EngineResult<Option<JsonValue>> {
        let mut data = serde_json::Map::new();

        if let Some(reveal) = self.def.reveal_as().map(str::to_string) {
            match &self.instance {
                None => return Ok(None),
                Some(record) => {
                    data.insert(reveal, record.to_value());
                }
            }
        }

        let revealed: Vec<RelationDescriptor> = self
            .def
            .relations()
            .filter(|descriptor| descriptor.reveal_as.is_some())
            .cloned()
            .collect();

        for descriptor in revealed {
            if !descriptor.on_construct {
                self.populate(&descriptor.property)?;
            }
            let key = descriptor
                .reveal_as
                .clone()
                .unwrap_or_else(|| descriptor.property.clone());
            let value = match self.slots.get_mut(&descriptor.property) {
                // an onConstruct slot that is still unpopulated violates
                // the construction contract
                None => return Ok(None),
                Some(slot) => {
                    require_scalar_shape(&descriptor, slot)?;
                    render_shallow(slot)?
                }
            };
            data.insert(key, value);
        }

        Ok(Some(JsonValue::Object(data)))
    }

    /// Deep projection over construction-time state. Only relations
    /// flagged `onConstruct` contribute; unpopulated or inapplicable ones
    /// are emitted as explicit null so the shape stays stable.
    pub fn get_hard(&self) -> EngineResult<Option<JsonValue>> {
        let mut data = serde_json::Map::new();

        if let Some(reveal) = self.def.reveal_as() {
            match &self.instance {
                None => return Ok(None),
                Some(record) => {
                    data.insert(reveal.to_string(), record.to_value());
                }
            }
        }

        for descriptor in self
            .def
            .relations()
            .filter(|descriptor| descriptor.reveal_as.is_some() && descriptor.on_construct)
        {
            let key = descriptor
                .reveal_as
                .clone()
                .unwrap_or_else(|| descriptor.property.clone());
            let value = match self.slots.get(&descriptor.property) {
                None | Some(RelationValue::Null) => JsonValue::Null,
                Some(slot) => {
                    require_scalar_shape(descriptor, slot)?;
                    render_deep(slot)?
                }
            };
            data.insert(key, value);
        }

        Ok(Some(JsonValue::Object(data)))
    }

    /// Shallow projection of one slot, populating it first. Backs the
    /// pass-through dispatch surface.
    pub(crate) fn reveal_slot(&mut self, property: &str) -> EngineResult<JsonValue> {
        self.populate(property)?;
        match self.slots.get_mut(property) {
            Some(slot) => render_shallow(slot),
            None => Ok(JsonValue::Null),
        }
    }
}

/// A relation declared `instanceOf: value` must hold a scalar (or null);
/// anything else is a metadata authoring mistake.
fn require_scalar_shape(
    descriptor: &RelationDescriptor,
    slot: &RelationValue,
) -> EngineResult<()> {
    if descriptor.reveal_value
        && !matches!(slot, RelationValue::Scalar(_) | RelationValue::Null)
    {
        return Err(crate::error::EngineError::metadata(
            &descriptor.property,
            "declared as a value relation but holds an entity",
        ));
    }
    Ok(())
}

fn render_shallow(slot: &mut RelationValue) -> EngineResult<JsonValue> {
    Ok(match slot {
        RelationValue::Null => JsonValue::Null,
        RelationValue::Scalar(value) => value.to_json(),
        RelationValue::Entity(record) => record.to_value(),
        RelationValue::Collection(collection) => collection.to_value(),
        // a nested aggregate whose record vanished projects as `false`
        RelationValue::Service(service) => service.get()?.unwrap_or(JsonValue::Bool(false)),
    })
}

fn render_deep(slot: &RelationValue) -> EngineResult<JsonValue> {
    Ok(match slot {
        RelationValue::Null => JsonValue::Null,
        RelationValue::Scalar(value) => value.to_json(),
        RelationValue::Entity(record) => record.to_value(),
        RelationValue::Collection(collection) => collection.to_value(),
        RelationValue::Service(service) => service.get_hard()?.unwrap_or(JsonValue::Bool(false)),
    })
}
