//! Relation Resolver - Compiles raw annotations into typed descriptors
//!
//! Classification is a total function of the declared keys: `collection`
//! wins over everything, then the single/service/repository references,
//! then `column`. A property declaring none of these is not a relation
//! and resolves to nothing.

use std::collections::BTreeMap;

use crate::annotation::{keys, AnnotationSet, AnnotationValue, ClassAnnotations};
use crate::error::{EngineError, EngineResult};
use crate::schema::entity::EntityDef;
use crate::schema::registry::{Schema, ServiceDef};
use crate::schema::relation::{AddSpec, HasSpec, RelationDescriptor, RelationKind, RemoveSpec};
use crate::storage::{OrderDirection, SortSpec};
use crate::value::FieldValue;

/// Build a complete service definition from its declarative metadata.
/// Referenced entity and service types must already be registered.
pub fn build_service(
    schema: &Schema,
    name: &str,
    annotations: &ClassAnnotations,
) -> EngineResult<ServiceDef> {
    let contains = annotations
        .class_value(keys::CONTAINS)
        .and_then(AnnotationValue::as_type)
        .ok_or_else(|| EngineError::metadata(name, "class-level 'contains' entity is required"))?;
    if !schema.has_entity(contains) {
        return Err(EngineError::metadata(
            name,
            format!("contained entity '{contains}' is not registered"),
        ));
    }

    let reveal_as = annotations
        .class_value(keys::REVEAL_AS)
        .and_then(AnnotationValue::as_str)
        .map(str::to_string);

    let mut relations = BTreeMap::new();
    for (property, set) in annotations.properties() {
        if let Some(descriptor) = resolve_property(schema, name, property, set)? {
            relations.insert(property.to_string(), descriptor);
        }
    }

    Ok(ServiceDef::new(name, contains, reveal_as, relations))
}

/// Resolve one property's annotations into a relation descriptor, or
/// `None` when the property declares no relation.
pub fn resolve_property(
    schema: &Schema,
    service: &str,
    property: &str,
    set: &AnnotationSet,
) -> EngineResult<Option<RelationDescriptor>> {
    let subject = format!("{service}.{property}");
    let kind = match resolve_kind(schema, &subject, set)? {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let descriptor = RelationDescriptor {
        property: property.to_string(),
        kind,
        reveal_as: set.str_value(keys::REVEAL_AS).map(str::to_string),
        singular: set.str_value(keys::SINGULAR).map(str::to_string),
        pass_through: set.flag(keys::PASS_THROUGH),
        on_construct: set.flag(keys::ON_CONSTRUCT),
        lazy: set.flag(keys::LAZY),
        reveal_value: set.str_value(keys::INSTANCE_OF) == Some("value"),
        create_instance: set.flag(keys::CREATE_INSTANCE),
        foreign: set
            .get(keys::FOREIGN)
            .map(AnnotationValue::truthy)
            .unwrap_or(true),
        has: matcher_spec(&subject, set, keys::HAS, keys::MATCH)?.map(|match_column| HasSpec {
            match_column,
        }),
        add: matcher_spec(&subject, set, keys::ADD, keys::PROPERTY)?
            .map(|property| AddSpec { property }),
        remove: matcher_spec(&subject, set, keys::REMOVE, keys::PROPERTY)?
            .map(|property| RemoveSpec { property }),
    };

    if descriptor.on_construct && descriptor.lazy {
        return Err(EngineError::metadata(
            subject,
            "a relation cannot be both onConstruct and lazy",
        ));
    }

    Ok(Some(descriptor))
}

fn resolve_kind(
    schema: &Schema,
    subject: &str,
    set: &AnnotationSet,
) -> EngineResult<Option<RelationKind>> {
    if let Some(value) = set.get(keys::COLLECTION) {
        let entity = value.as_type().ok_or_else(|| {
            EngineError::metadata(subject, "collection target must be a type reference")
        })?;
        require_entity(schema, subject, entity)?;
        let sort = set
            .get(keys::SORT)
            .map(|value| sort_spec(subject, value))
            .transpose()?;
        let limit = set.int_value(keys::LIMIT).map(|limit| limit.max(0) as u64);
        let filter = set
            .get(keys::WHERE)
            .map(|value| filter_pairs(subject, value))
            .transpose()?
            .unwrap_or_default();
        return Ok(Some(RelationKind::Collection {
            entity: entity.to_string(),
            sort,
            limit,
            filter,
        }));
    }

    for key in [keys::CONTAINS, keys::SERVICE, keys::REPOSITORY] {
        let Some(value) = set.get(key) else { continue };
        let target = value.as_type().ok_or_else(|| {
            EngineError::metadata(subject, format!("'{key}' must be a type reference"))
        })?;
        if schema.is_service(target) {
            return Ok(Some(RelationKind::Service {
                service: target.to_string(),
            }));
        }
        if key == keys::SERVICE {
            // a `service` reference must name a service; an entity here is
            // not eligible for automatic population
            return Err(EngineError::metadata(
                subject,
                format!("'{target}' is not a registered service"),
            ));
        }
        require_entity(schema, subject, target)?;
        return Ok(Some(RelationKind::Single {
            entity: target.to_string(),
        }));
    }

    if let Some(value) = set.get(keys::COLUMN) {
        let map = value.as_map().ok_or_else(|| {
            EngineError::metadata(subject, "column relation needs {repository, column}")
        })?;
        let entity = map
            .get(keys::REPOSITORY)
            .and_then(AnnotationValue::as_type)
            .ok_or_else(|| {
                EngineError::metadata(subject, "column relation is missing its repository type")
            })?;
        require_entity(schema, subject, entity)?;
        let column = map
            .get(keys::COLUMN)
            .and_then(AnnotationValue::as_str)
            .ok_or_else(|| {
                EngineError::metadata(subject, "column relation is missing its column name")
            })?;
        let is_child = map
            .get(keys::IS_CHILD)
            .map(AnnotationValue::truthy)
            .unwrap_or(false);
        return Ok(Some(RelationKind::Column {
            entity: entity.to_string(),
            column: column.to_string(),
            is_child,
        }));
    }

    Ok(None)
}

fn require_entity(schema: &Schema, subject: &str, entity: &str) -> EngineResult<()> {
    if schema.has_entity(entity) {
        Ok(())
    } else {
        Err(EngineError::metadata(
            subject,
            format!("entity '{entity}' is not registered"),
        ))
    }
}

/// Read a `has`/`add`/`remove` descriptor: absent or `false` disables the
/// mutation, a map supplies the required inner key.
fn matcher_spec(
    subject: &str,
    set: &AnnotationSet,
    key: &str,
    inner: &str,
) -> EngineResult<Option<String>> {
    match set.get(key) {
        None | Some(AnnotationValue::Bool(false)) => Ok(None),
        Some(AnnotationValue::Map(map)) => map
            .get(inner)
            .and_then(AnnotationValue::as_str)
            .map(|value| Some(value.to_string()))
            .ok_or_else(|| {
                EngineError::metadata(subject, format!("'{key}' descriptor needs '{inner}'"))
            }),
        Some(_) => Err(EngineError::metadata(
            subject,
            format!("'{key}' must be a descriptor map or false"),
        )),
    }
}

fn sort_spec(subject: &str, value: &AnnotationValue) -> EngineResult<SortSpec> {
    let items = value
        .as_list()
        .ok_or_else(|| EngineError::metadata(subject, "sort must be a list"))?;
    let mut spec = SortSpec::new();
    for item in items {
        match item {
            AnnotationValue::Str(column) => spec.push((column.clone(), OrderDirection::Asc)),
            AnnotationValue::List(pair) => {
                let column = pair
                    .first()
                    .and_then(AnnotationValue::as_str)
                    .ok_or_else(|| {
                        EngineError::metadata(subject, "sort pair is missing its column")
                    })?;
                let direction = pair
                    .get(1)
                    .and_then(AnnotationValue::as_str)
                    .map(OrderDirection::from_keyword)
                    .unwrap_or(OrderDirection::Asc);
                spec.push((column.to_string(), direction));
            }
            _ => {
                return Err(EngineError::metadata(
                    subject,
                    "sort entries must be column names or (column, direction) pairs",
                ))
            }
        }
    }
    Ok(spec)
}

fn filter_pairs(
    subject: &str,
    value: &AnnotationValue,
) -> EngineResult<Vec<(String, FieldValue)>> {
    let map = value
        .as_map()
        .ok_or_else(|| EngineError::metadata(subject, "where must be a column/value map"))?;
    let mut pairs = Vec::with_capacity(map.len());
    for (column, value) in map {
        let value = scalar_value(value).ok_or_else(|| {
            EngineError::metadata(subject, format!("where value for '{column}' must be a scalar"))
        })?;
        pairs.push((column.clone(), value));
    }
    Ok(pairs)
}

fn scalar_value(value: &AnnotationValue) -> Option<FieldValue> {
    match value {
        AnnotationValue::Bool(b) => Some(FieldValue::Bool(*b)),
        AnnotationValue::Int(i) => Some(FieldValue::Int(*i)),
        AnnotationValue::Str(s) | AnnotationValue::Type(s) => Some(FieldValue::Text(s.clone())),
        AnnotationValue::List(_) | AnnotationValue::Map(_) => None,
    }
}

/// Derive the foreign link connecting a child entity to a parent entity.
/// Thin wrapper kept for symmetry with the population engine's usage.
pub fn derive_link<'a>(
    child: &'a EntityDef,
    parent: &EntityDef,
) -> EngineResult<&'a crate::schema::entity::ForeignLink> {
    child.reference_to(parent.name())
}
