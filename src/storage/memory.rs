//! In-Memory Storage Backend - Table store for tests and embedded use
//!
//! Rows live in per-table vectors behind a mutex; ids are assigned from a
//! monotonic per-table sequence. Operation counters expose how often the
//! engine actually touched storage, which the lazy-population and
//! permission-check tests assert against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::storage::{Query, Row, StorageBackend, StorageError, StorageResult};
use crate::value::FieldValue;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn assign_id(&mut self, row: &mut Row) {
        match row.get("id") {
            Some(FieldValue::Int(id)) => {
                self.next_id = self.next_id.max(*id);
            }
            _ => {
                self.next_id += 1;
                row.insert("id".to_string(), FieldValue::Int(self.next_id));
            }
        }
    }
}

/// In-memory table store implementing the storage collaborator contract
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Table>>,
    fetches: AtomicUsize,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty table
    pub fn create_table(&self, name: &str) {
        let mut tables = self.tables.lock().expect("memory backend poisoned");
        tables.entry(name.to_string()).or_default();
    }

    /// Load fixture rows directly, bypassing the operation counters so
    /// test setup does not show up as engine traffic.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.lock().expect("memory backend poisoned");
        let table = tables.entry(table.to_string()).or_default();
        for mut row in rows {
            table.assign_id(&mut row);
            table.rows.push(row);
        }
    }

    /// Number of fetch calls served
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of insert calls served
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Number of delete calls served
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Row count of a table, for size-unchanged assertions
    pub fn rows_in(&self, table: &str) -> usize {
        let tables = self.tables.lock().expect("memory backend poisoned");
        tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Overwrite one column of every row matching an equality condition.
    /// Test hook for snapshot-stability checks; not part of the engine
    /// contract.
    pub fn patch(&self, table: &str, column: &str, matches: &FieldValue, new_value: FieldValue) {
        let mut tables = self.tables.lock().expect("memory backend poisoned");
        if let Some(table) = tables.get_mut(table) {
            for row in table.rows.iter_mut() {
                if row.get(column) == Some(matches) {
                    row.insert(column.to_string(), new_value.clone());
                }
            }
        }
    }

    fn matches(row: &Row, filters: &[(String, FieldValue)]) -> bool {
        filters
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }

    fn project(row: &Row, columns: Option<&[String]>) -> Row {
        match columns {
            None => row.clone(),
            Some(columns) => columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect(),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn fetch(&self, query: &Query) -> StorageResult<Vec<Row>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.lock().expect("memory backend poisoned");
        let table = tables
            .get(query.table())
            .ok_or_else(|| StorageError::UnknownTable {
                table: query.table().to_string(),
            })?;

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| Self::matches(row, query.filters()))
            .collect();

        // sort_by is stable, so earlier keys win only on inequality
        if !query.order().is_empty() {
            rows.sort_by(|a, b| {
                for (column, direction) in query.order() {
                    let left = a.get(column).unwrap_or(&FieldValue::Null);
                    let right = b.get(column).unwrap_or(&FieldValue::Null);
                    let ordering = match direction {
                        crate::storage::OrderDirection::Asc => left.compare(right),
                        crate::storage::OrderDirection::Desc => right.compare(left),
                    };
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        if let Some(limit) = query.row_limit() {
            rows.truncate(limit as usize);
        }

        Ok(rows
            .into_iter()
            .map(|row| Self::project(row, query.selected_columns()))
            .collect())
    }

    fn insert(&self, table: &str, values: Row) -> StorageResult<Row> {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.lock().expect("memory backend poisoned");
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable {
                table: table.to_string(),
            })?;

        let mut row = values;
        table.assign_id(&mut row);
        table.rows.push(row.clone());
        Ok(row)
    }

    fn delete(&self, table: &str, column: &str, value: &FieldValue) -> StorageResult<u64> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.lock().expect("memory backend poisoned");
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable {
                table: table.to_string(),
            })?;

        let before = table.rows.len();
        table.rows.retain(|row| row.get(column) != Some(value));
        Ok((before - table.rows.len()) as u64)
    }
}
