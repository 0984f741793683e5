//! In-memory remote store.
//!
//! Mirrors the backend contract closely enough for tests and offline use:
//! server-generated `id` and `created_at` columns, a unique constraint per
//! table, and stable newest-first ordering.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Direction, Filter, Query, RemoteStore, RepositoryError, Table};

/// In-memory implementation of [`RemoteStore`].
///
/// Cheap to clone; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    failing: Mutex<HashSet<Table>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `table` fail with `Unavailable`.
    pub fn inject_failure(&self, table: Table) {
        self.failing().insert(table);
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        self.failing().clear();
    }

    /// Copy of every row in `table`, in insertion order.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables().get(&table).cloned().unwrap_or_default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<Table, Vec<Value>>> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn failing(&self) -> MutexGuard<'_, HashSet<Table>> {
        self.inner
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, table: Table) -> Result<(), RepositoryError> {
        if self.failing().contains(&table) {
            return Err(RepositoryError::Unavailable(format!(
                "{table} is unavailable"
            )));
        }
        Ok(())
    }
}

/// Column value as the string PostgREST filters compare against.
fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| column_text(row, &f.column).as_deref() == Some(f.value.as_str()))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn insert(&self, table: Table, row: Value) -> Result<Value, RepositoryError> {
        self.check(table)?;

        let Value::Object(mut fields) = row else {
            return Err(RepositoryError::DataCorruption(format!(
                "insert into {table} expects an object"
            )));
        };

        if table.unique_column() == "id" && !fields.contains_key("id") {
            fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        fields
            .entry("created_at")
            .or_insert_with(super::now_timestamp);

        let row = Value::Object(fields);
        let key = column_text(&row, table.unique_column());

        let mut tables = self.tables();
        let rows = tables.entry(table).or_default();
        if key.is_some()
            && rows
                .iter()
                .any(|r| column_text(r, table.unique_column()) == key)
        {
            return Err(RepositoryError::Conflict(format!(
                "duplicate {} in {table}",
                table.unique_column()
            )));
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RepositoryError> {
        self.check(table)?;

        let tables = self.tables();
        let mut found: Vec<(usize, &Value)> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .enumerate()
                    .filter(|(_, r)| matches(r, &query.filters))
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            // Ties keep insertion order, so descending lists newest insert first.
            found.sort_by(|(ia, a), (ib, b)| {
                compare(a.get(column), b.get(column)).then(ia.cmp(ib))
            });
            if *direction == Direction::Desc {
                found.reverse();
            }
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(found
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, RepositoryError> {
        self.check(table)?;

        let Value::Object(patch) = patch else {
            return Err(RepositoryError::DataCorruption(format!(
                "update of {table} expects an object"
            )));
        };

        let mut tables = self.tables();
        let mut updated = Vec::new();
        for row in tables.entry(table).or_default().iter_mut() {
            if !matches(row, filters) {
                continue;
            }
            if let Value::Object(fields) = row {
                merge(fields, &patch);
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }
}

fn merge(fields: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (k, v) in patch {
        fields.insert(k.clone(), v.clone());
    }
}
