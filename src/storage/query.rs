//! Query Description - Fluent, backend-agnostic fetch specification
//!
//! A `Query` is a pure description consumed by a `StorageBackend`; SQL
//! generation, pooling, and transactions belong to the collaborator, not
//! to this crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Sort direction for an order-by key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// Parse a declared direction keyword; anything but "desc" is ascending.
    pub fn from_keyword(keyword: &str) -> Self {
        if keyword.eq_ignore_ascii_case("desc") {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Ordered list of (column, direction) sort keys, applied stably
pub type SortSpec = Vec<(String, OrderDirection)>;

/// Backend-agnostic fetch description
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: Option<Vec<String>>,
    filters: Vec<(String, FieldValue)>,
    order: SortSpec,
    limit: Option<u64>,
}

impl Query {
    /// Start a query against a table
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restrict the selected columns; unset means all stored columns
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Add an equality filter; filters combine conjunctively
    pub fn where_eq<V: Into<FieldValue>>(mut self, column: &str, value: V) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    /// Set the sort keys, replacing any previous ordering
    pub fn order_by(mut self, order: SortSpec) -> Self {
        self.order = order;
        self
    }

    /// Cap the number of returned rows
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn selected_columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn filters(&self) -> &[(String, FieldValue)] {
        &self.filters
    }

    pub fn order(&self) -> &SortSpec {
        &self.order
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_accumulates_clauses() {
        let query = Query::from("order_items")
            .select(&["id", "sku"])
            .where_eq("order_id", 7)
            .order_by(vec![("position".to_string(), OrderDirection::Asc)])
            .limit(10);

        assert_eq!(query.table(), "order_items");
        assert_eq!(
            query.selected_columns(),
            Some(&["id".to_string(), "sku".to_string()][..])
        );
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].1, FieldValue::Int(7));
        assert_eq!(query.order().len(), 1);
        assert_eq!(query.row_limit(), Some(10));
    }

    #[test]
    fn test_order_by_replaces_previous_ordering() {
        let query = Query::from("orders")
            .order_by(vec![("id".to_string(), OrderDirection::Asc)])
            .order_by(vec![("number".to_string(), OrderDirection::Desc)]);
        assert_eq!(query.order().len(), 1);
        assert_eq!(query.order()[0].0, "number");
    }

    #[test]
    fn test_direction_keywords() {
        assert_eq!(OrderDirection::from_keyword("desc"), OrderDirection::Desc);
        assert_eq!(OrderDirection::from_keyword("DESC"), OrderDirection::Desc);
        assert_eq!(OrderDirection::from_keyword("asc"), OrderDirection::Asc);
        assert_eq!(OrderDirection::from_keyword("sideways"), OrderDirection::Asc);
    }
}
