//! Lazy Population Engine - On-demand fetch-and-cache of relation slots
//!
//! Population is idempotent per slot: a populated slot is never touched
//! again, so in-memory state survives later backing-store changes within
//! the same instance. Link absence is recoverable and absorbed into
//! null/empty values; storage failures surface unchanged.

use crate::collection::Collection;
use crate::error::{EngineError, EngineResult};
use crate::record::Record;
use crate::schema::{EntityDef, ForeignLink, RelationDescriptor, RelationKind};
use crate::service::{RelationValue, ServiceInstance};
use crate::storage::{scalar, Query, SortSpec};
use crate::value::FieldValue;

/// Caller-supplied query overrides for one population call. Overrides win
/// over class-declared defaults, which win over the entity's intrinsic
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct QueryOverrides {
    pub filter: Option<Vec<(String, FieldValue)>>,
    pub sort: Option<SortSpec>,
    pub limit: Option<u64>,
}

impl ServiceInstance {
    /// Populate a relation slot if it is not populated yet. Calling this
    /// on a populated slot is a no-op and performs no fetch.
    pub fn populate(&mut self, property: &str) -> EngineResult<()> {
        self.populate_with(property, QueryOverrides::default())
    }

    /// Populate with explicit query overrides (collections only; other
    /// kinds ignore the overrides)
    pub fn populate_with(&mut self, property: &str, overrides: QueryOverrides) -> EngineResult<()> {
        if self.slots.contains_key(property) {
            return Ok(());
        }
        let descriptor = self
            .def
            .relation(property)
            .cloned()
            .ok_or_else(|| {
                EngineError::metadata(
                    format!("{}.{property}", self.def.name()),
                    "unknown relation property",
                )
            })?;

        let value = match &descriptor.kind {
            RelationKind::Single { entity } => self.populate_single(entity, &descriptor)?,
            RelationKind::Collection { .. } => self.populate_collection(&descriptor, &overrides)?,
            RelationKind::Column { .. } => self.populate_column(&descriptor)?,
            RelationKind::Service { service } => self.populate_service(service, &descriptor)?,
        };

        tracing::debug!(
            service = self.def.name(),
            property = property,
            "populated relation slot"
        );
        self.slots.insert(property.to_string(), value);
        Ok(())
    }

    /// Construction-time pass: populate every relation not flagged lazy
    pub(crate) fn populate_on_construct(&mut self) -> EngineResult<()> {
        let properties: Vec<String> = self
            .def
            .relations()
            .filter(|descriptor| !descriptor.lazy)
            .map(|descriptor| descriptor.property.clone())
            .collect();
        for property in properties {
            self.populate(&property)?;
        }
        Ok(())
    }

    /// Derive the link from a child entity to this aggregate's master and
    /// read the master-side value off the backing record
    pub(crate) fn link_to_master(
        &self,
        child: &EntityDef,
    ) -> EngineResult<(ForeignLink, FieldValue)> {
        let master = self.master()?;
        let link = crate::schema::resolver::derive_link(child, master.def())?.clone();
        let value = master
            .get(&link.parent_column)
            .cloned()
            .unwrap_or(FieldValue::Null);
        Ok((link, value))
    }

    fn populate_single(
        &self,
        entity: &str,
        descriptor: &RelationDescriptor,
    ) -> EngineResult<RelationValue> {
        let child = self.schema.entity(entity)?;
        match self.link_to_master(&child) {
            Ok((link, value)) => {
                let criteria = vec![(link.column, value)];
                let record = Record::find_by(child, self.backend.as_ref(), &criteria)?;
                Ok(record.map(RelationValue::Entity).unwrap_or(RelationValue::Null))
            }
            Err(err) if err.is_link_not_found() => {
                self.warn_absorbed_link(&descriptor.property, entity);
                Ok(RelationValue::Null)
            }
            Err(err) => Err(err),
        }
    }

    fn populate_collection(
        &self,
        descriptor: &RelationDescriptor,
        overrides: &QueryOverrides,
    ) -> EngineResult<RelationValue> {
        let (entity, sort, limit, filter) = match &descriptor.kind {
            RelationKind::Collection {
                entity,
                sort,
                limit,
                filter,
            } => (entity, sort, limit, filter),
            _ => {
                return Err(EngineError::metadata(
                    format!("{}.{}", self.def.name(), descriptor.property),
                    "descriptor is not a collection",
                ))
            }
        };
        let child = self.schema.entity(entity)?;

        let mut filters = overrides
            .filter
            .clone()
            .unwrap_or_else(|| filter.clone());
        if descriptor.foreign {
            match self.link_to_master(&child) {
                Ok((link, value)) => filters.push((link.column, value)),
                Err(err) if err.is_link_not_found() => {
                    self.warn_absorbed_link(&descriptor.property, entity);
                    return Ok(RelationValue::Collection(Collection::empty(child)));
                }
                Err(err) => return Err(err),
            }
        }

        let sort = overrides
            .sort
            .clone()
            .or_else(|| sort.clone())
            .unwrap_or_else(|| child.sort_columns().clone());
        let limit = overrides.limit.or(*limit);

        let collection = Collection::fetch(child, self.backend.as_ref(), &filters, &sort, limit)?;
        Ok(RelationValue::Collection(collection))
    }

    fn populate_column(&self, descriptor: &RelationDescriptor) -> EngineResult<RelationValue> {
        let (entity, column, is_child) = match &descriptor.kind {
            RelationKind::Column {
                entity,
                column,
                is_child,
            } => (entity, column, *is_child),
            _ => {
                return Err(EngineError::metadata(
                    format!("{}.{}", self.def.name(), descriptor.property),
                    "descriptor is not a column",
                ))
            }
        };
        let child = self.schema.entity(entity)?;

        let mut query = Query::from(child.table()).select(&[column.as_str()]);
        if is_child {
            match self.link_to_master(&child) {
                Ok((link, value)) => query = query.where_eq(&link.column, value),
                Err(err) if err.is_link_not_found() => {
                    self.warn_absorbed_link(&descriptor.property, entity);
                    return Ok(RelationValue::Null);
                }
                Err(err) => return Err(err),
            }
        }
        let rows = self.backend.fetch(&query.limit(1))?;
        Ok(match scalar(&rows, column) {
            Some(value) if !value.is_null() => RelationValue::Scalar(value),
            _ => RelationValue::Null,
        })
    }

    fn populate_service(
        &self,
        service: &str,
        descriptor: &RelationDescriptor,
    ) -> EngineResult<RelationValue> {
        let nested_def = self.schema.service(service)?;
        let child = self.schema.entity(nested_def.contains())?;
        match self.link_to_master(&child) {
            Ok((link, value)) => {
                let nested = ServiceInstance::find_by(
                    self.schema.clone(),
                    self.backend.clone(),
                    service,
                    &link.column,
                    value,
                );
                match nested {
                    Ok(nested) => Ok(RelationValue::Service(Box::new(nested))),
                    // the nested aggregate simply does not exist for this
                    // instance
                    Err(EngineError::EntityNotFound { .. }) => Ok(RelationValue::Null),
                    Err(err) => Err(err),
                }
            }
            Err(err) if err.is_link_not_found() => {
                self.warn_absorbed_link(&descriptor.property, service);
                Ok(RelationValue::Null)
            }
            Err(err) => Err(err),
        }
    }

    fn warn_absorbed_link(&self, property: &str, target: &str) {
        tracing::warn!(
            service = self.def.name(),
            property = property,
            target = target,
            "no declared link to the aggregate root; leaving relation empty"
        );
    }
}
