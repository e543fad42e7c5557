//! Field Value Vocabulary - Typed scalars for rows, bindings, and projections
//!
//! `FieldValue` is the single value vocabulary shared by the storage
//! collaborator, materialized records, and the projection layer. It
//! converts losslessly to and from JSON for the serialization surface.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Scalar value stored in a row column or bound into a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    DateTime(DateTime<Utc>),
    Json(JsonValue),
}

impl FieldValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Int(i) => JsonValue::Number(serde_json::Number::from(*i)),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Uuid(u) => JsonValue::String(u.to_string()),
            FieldValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            FieldValue::Json(j) => j.clone(),
        }
    }

    /// Create a FieldValue from a JSON value
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Null
                }
            }
            JsonValue::String(s) => {
                if let Ok(uuid) = uuid::Uuid::parse_str(&s) {
                    FieldValue::Uuid(uuid)
                } else if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                    FieldValue::DateTime(dt.with_timezone(&Utc))
                } else {
                    FieldValue::Text(s)
                }
            }
            other => FieldValue::Json(other),
        }
    }

    /// Total ordering used for multi-key sorting. Nulls sort first;
    /// numeric variants compare across Int/Float; mixed variants fall
    /// back to a fixed variant rank so the order is still total.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Text(a), Text(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Json(a), Json(b)) => a.to_string().cmp(&b.to_string()),
            (a, b) => a.variant_rank().cmp(&b.variant_rank()),
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) => 2,
            FieldValue::Float(_) => 3,
            FieldValue::Text(_) => 4,
            FieldValue::Uuid(_) => 5,
            FieldValue::DateTime(_) => 6,
            FieldValue::Json(_) => 7,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<uuid::Uuid> for FieldValue {
    fn from(value: uuid::Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let values = vec![
            FieldValue::Null,
            FieldValue::Bool(true),
            FieldValue::Int(42),
            FieldValue::Text("hello".to_string()),
        ];
        for value in values {
            assert_eq!(FieldValue::from_json(value.to_json()), value);
        }
    }

    #[test]
    fn test_from_json_detects_uuid_and_datetime() {
        let uuid = uuid::Uuid::new_v4();
        assert_eq!(
            FieldValue::from_json(JsonValue::String(uuid.to_string())),
            FieldValue::Uuid(uuid)
        );
        let parsed = FieldValue::from_json(JsonValue::String("2024-03-01T10:00:00Z".to_string()));
        assert!(matches!(parsed, FieldValue::DateTime(_)));
        assert_eq!(
            FieldValue::from_json(JsonValue::String("SKU-A".to_string())),
            FieldValue::Text("SKU-A".to_string())
        );
    }

    #[test]
    fn test_compare_orders_nulls_first() {
        assert_eq!(
            FieldValue::Null.compare(&FieldValue::Int(1)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Int(2).compare(&FieldValue::Int(1)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Int(2).compare(&FieldValue::Float(2.5)),
            Ordering::Less
        );
    }
}
