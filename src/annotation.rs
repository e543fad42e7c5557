//! Declarative Metadata - Per-property and per-class annotation maps
//!
//! Annotations are authored once at definition time (by an external parser
//! or in code through the builder methods) and are immutable afterwards.
//! The schema resolver compiles them into strongly-typed relation
//! descriptors; nothing in the engine re-reads raw annotations at call
//! time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Annotation keys understood by the relation resolver
pub mod keys {
    pub const CONTAINS: &str = "contains";
    pub const COLLECTION: &str = "collection";
    pub const SERVICE: &str = "service";
    pub const REPOSITORY: &str = "repository";
    pub const COLUMN: &str = "column";
    pub const REVEAL_AS: &str = "revealAs";
    pub const SINGULAR: &str = "singular";
    pub const PASS_THROUGH: &str = "passThrough";
    pub const HAS: &str = "has";
    pub const ADD: &str = "add";
    pub const REMOVE: &str = "remove";
    pub const FOREIGN: &str = "foreign";
    pub const CREATE_INSTANCE: &str = "createInstance";
    pub const ON_CONSTRUCT: &str = "onConstruct";
    pub const LAZY: &str = "lazy";
    pub const SORT: &str = "sort";
    pub const LIMIT: &str = "limit";
    pub const WHERE: &str = "where";
    pub const INSTANCE_OF: &str = "instanceOf";
    pub const MATCH: &str = "match";
    pub const PROPERTY: &str = "property";
    pub const IS_CHILD: &str = "isChild";
}

/// One annotation value: a literal, a list, a map, or a type reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Reference to a registered entity or service type identifier
    Type(String),
    List(Vec<AnnotationValue>),
    Map(BTreeMap<String, AnnotationValue>),
}

impl AnnotationValue {
    /// Shorthand for a type reference
    pub fn ty(name: &str) -> Self {
        AnnotationValue::Type(name.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AnnotationValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Type references, also accepting a plain string naming a type
    pub fn as_type(&self) -> Option<&str> {
        match self {
            AnnotationValue::Type(t) => Some(t),
            AnnotationValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AnnotationValue]> {
        match self {
            AnnotationValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AnnotationValue>> {
        match self {
            AnnotationValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// A flag counts as set unless it is explicitly `false`
    pub fn truthy(&self) -> bool {
        !matches!(self, AnnotationValue::Bool(false))
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        AnnotationValue::Bool(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Int(value)
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Str(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::Str(value)
    }
}

/// Typed key/value metadata attached to one property or one class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    values: BTreeMap<String, AnnotationValue>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    pub fn with(mut self, key: &str, value: impl Into<AnnotationValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.values.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Flag semantics: absent or explicitly false means false
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(AnnotationValue::truthy).unwrap_or(false)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AnnotationValue::as_str)
    }

    pub fn type_value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AnnotationValue::as_type)
    }

    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AnnotationValue::as_int)
    }
}

/// All declarative metadata for one service type: the class-level set plus
/// one set per declared property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAnnotations {
    class: AnnotationSet,
    properties: BTreeMap<String, AnnotationSet>,
}

impl ClassAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, set: AnnotationSet) -> Self {
        self.class = set;
        self
    }

    pub fn with_property(mut self, name: &str, set: AnnotationSet) -> Self {
        self.properties.insert(name.to_string(), set);
        self
    }

    pub fn class_value(&self, key: &str) -> Option<&AnnotationValue> {
        self.class.get(key)
    }

    pub fn property_annotations(&self, property: &str) -> Option<&AnnotationSet> {
        self.properties.get(property)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &AnnotationSet)> {
        self.properties.iter().map(|(name, set)| (name.as_str(), set))
    }

    /// Properties whose annotations declare the given key at all
    pub fn properties_having<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a AnnotationSet)> {
        self.properties().filter(move |(_, set)| set.has(key))
    }

    /// Properties whose annotations declare the given key with a specific value
    pub fn properties_having_value<'a>(
        &'a self,
        key: &'a str,
        value: &'a AnnotationValue,
    ) -> impl Iterator<Item = (&'a str, &'a AnnotationSet)> {
        self.properties()
            .filter(move |(_, set)| set.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_defaults_to_false() {
        let set = AnnotationSet::new()
            .with(keys::LAZY, true)
            .with(keys::FOREIGN, false);
        assert!(set.flag(keys::LAZY));
        assert!(!set.flag(keys::FOREIGN));
        assert!(!set.flag(keys::CREATE_INSTANCE));
    }

    #[test]
    fn test_type_value_accepts_str_and_type() {
        let set = AnnotationSet::new()
            .with(keys::CONTAINS, AnnotationValue::ty("Order"))
            .with(keys::SERVICE, "BillingService");
        assert_eq!(set.type_value(keys::CONTAINS), Some("Order"));
        assert_eq!(set.type_value(keys::SERVICE), Some("BillingService"));
    }

    #[test]
    fn test_properties_having() {
        let annotations = ClassAnnotations::new()
            .with_property(
                "items",
                AnnotationSet::new().with(keys::REVEAL_AS, "items"),
            )
            .with_property("internal", AnnotationSet::new().with(keys::LAZY, true));

        let revealed: Vec<&str> = annotations
            .properties_having(keys::REVEAL_AS)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(revealed, vec!["items"]);
    }

    #[test]
    fn test_properties_having_value() {
        let singular = AnnotationValue::from("item");
        let annotations = ClassAnnotations::new()
            .with_property("items", AnnotationSet::new().with(keys::SINGULAR, "item"))
            .with_property("notes", AnnotationSet::new().with(keys::SINGULAR, "note"));

        let matches: Vec<&str> = annotations
            .properties_having_value(keys::SINGULAR, &singular)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(matches, vec!["items"]);
    }
}
