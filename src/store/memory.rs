//! # In-Memory Store
//!
//! Reference [`Store`] keeping each entity's rows in insertion order.
//! Used by the test suite and by `crudgate explain`-style tooling; it
//! evaluates the full expression tree, ACL clauses included.

use std::collections::HashMap;
use std::io;
use std::sync::RwLock;

use serde_json::Value;

use crate::query::BuiltQuery;
use crate::schema::{EntityDescriptor, SequenceSpec};

use super::errors::{StoreError, StoreResult};
use super::filter::{matches, sort_records};
use super::{Record, Store, StoreFuture};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    sequences: RwLock<HashMap<String, i64>>,
    /// When set, every call fails with this message
    failure: RwLock<Option<String>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::new("Lock poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows to an entity's table as-is.
    pub fn seed(&self, entity: &str, rows: impl IntoIterator<Item = Record>) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.entry(entity.to_string()).or_default().extend(rows);
        Ok(())
    }

    /// Snapshot of every stored row of an entity.
    pub fn rows(&self, entity: &str) -> StoreResult<Vec<Record>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(entity).cloned().unwrap_or_default())
    }

    /// Makes every following call fail until cleared with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = message;
        }
    }

    fn check_available(&self) -> StoreResult<()> {
        let failure = self.failure.read().map_err(poisoned)?;
        match failure.as_ref() {
            Some(message) => Err(StoreError::with_source(
                "memory store unavailable",
                io::Error::new(io::ErrorKind::Other, message.clone()),
            )),
            None => Ok(()),
        }
    }

    fn select(&self, entity: &EntityDescriptor, query: &BuiltQuery) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let tables = self.tables.read().map_err(poisoned)?;
        let expr = query.where_expr();

        let mut rows: Vec<Record> = tables
            .get(&entity.name)
            .map(|rows| rows.iter().filter(|r| matches(&expr, r)).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        sort_records(&mut rows, &query.order_by);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, &query.projection))
            .collect();
        Ok(rows)
    }

    fn count_rows(&self, entity: &EntityDescriptor, query: &BuiltQuery) -> StoreResult<u64> {
        self.check_available()?;
        let tables = self.tables.read().map_err(poisoned)?;
        let expr = query.where_expr();
        Ok(tables
            .get(&entity.name)
            .map(|rows| rows.iter().filter(|r| matches(&expr, r)).count() as u64)
            .unwrap_or(0))
    }

    fn insert(&self, entity: &EntityDescriptor, mut record: Record) -> StoreResult<Record> {
        self.check_available()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let rows = tables.entry(entity.name.clone()).or_default();

        if let [pk] = entity.primary_key_columns.as_slice() {
            let missing = record.get(pk).map_or(true, Value::is_null);
            let numeric = entity
                .column(pk)
                .map_or(false, |c| c.declared_type.is_numeric());

            if missing && numeric {
                let next = rows
                    .iter()
                    .filter_map(|r| r.get(pk).and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                record.insert(pk.clone(), Value::from(next));
            } else if let Some(key) = record.get(pk).filter(|v| !v.is_null()) {
                if rows.iter().any(|r| r.get(pk) == Some(key)) {
                    return Err(StoreError::new(format!(
                        "duplicate key {}={} in {}",
                        pk, key, entity.name
                    )));
                }
            }
        }

        rows.push(record.clone());
        Ok(record)
    }

    fn remove(&self, entity: &EntityDescriptor, query: &BuiltQuery) -> StoreResult<u64> {
        self.check_available()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let expr = query.where_expr();

        let rows = match tables.get_mut(&entity.name) {
            Some(rows) => rows,
            None => return Ok(0),
        };
        let before = rows.len();
        rows.retain(|r| !matches(&expr, r));
        Ok((before - rows.len()) as u64)
    }

    fn modify(
        &self,
        entity: &EntityDescriptor,
        query: &BuiltQuery,
        changes: Record,
    ) -> StoreResult<Option<Record>> {
        self.check_available()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let expr = query.where_expr();

        let rows = match tables.get_mut(&entity.name) {
            Some(rows) => rows,
            None => return Ok(None),
        };
        let index = match rows.iter().position(|r| matches(&expr, r)) {
            Some(index) => index,
            None => return Ok(None),
        };

        if let [pk] = entity.primary_key_columns.as_slice() {
            if let Some(key) = changes.get(pk).filter(|v| !v.is_null()) {
                let taken = rows
                    .iter()
                    .enumerate()
                    .any(|(i, r)| i != index && r.get(pk) == Some(key));
                if taken {
                    return Err(StoreError::new(format!(
                        "duplicate key {}={} in {}",
                        pk, key, entity.name
                    )));
                }
            }
        }

        let row = &mut rows[index];
        for (key, value) in changes {
            row.insert(key, value);
        }
        Ok(Some(row.clone()))
    }

    fn next_value(&self, sequence: &SequenceSpec) -> StoreResult<Value> {
        self.check_available()?;
        let mut sequences = self.sequences.write().map_err(poisoned)?;
        let counter = sequences.entry(sequence.name.clone()).or_insert(0);
        *counter += 1;
        Ok(Value::from(*counter))
    }
}

fn project(row: Record, projection: &[String]) -> Record {
    if projection.is_empty() {
        return row;
    }
    row.into_iter()
        .filter(|(key, _)| projection.iter().any(|p| p == key))
        .collect()
}

impl Store for MemoryStore {
    fn find_all<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, Vec<Record>> {
        let result = self.select(entity, query);
        Box::pin(async move { result })
    }

    fn find_one<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, Option<Record>> {
        let result = self.select(entity, query).map(|rows| rows.into_iter().next());
        Box::pin(async move { result })
    }

    fn count<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, u64> {
        let result = self.count_rows(entity, query);
        Box::pin(async move { result })
    }

    fn create<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        record: Record,
    ) -> StoreFuture<'a, Record> {
        let result = self.insert(entity, record);
        Box::pin(async move { result })
    }

    fn destroy<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, u64> {
        let result = self.remove(entity, query);
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
        changes: Record,
    ) -> StoreFuture<'a, Option<Record>> {
        let result = self.modify(entity, query, changes);
        Box::pin(async move { result })
    }

    fn next_sequence_value<'a>(
        &'a self,
        _entity: &'a EntityDescriptor,
        sequence: &'a SequenceSpec,
    ) -> StoreFuture<'a, Value> {
        let result = self.next_value(sequence);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{OrderBy, Predicate, TypedValue};
    use crate::schema::{ColumnMeta, DeclaredType};
    use serde_json::json;
    use std::error::Error;

    fn items() -> EntityDescriptor {
        EntityDescriptor::new(
            "items",
            vec![
                ColumnMeta::new("id", DeclaredType::Integer).primary_key(),
                ColumnMeta::new("name", DeclaredType::String),
            ],
        )
        .unwrap()
    }

    fn row(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_integer_key() {
        let store = MemoryStore::new();
        let entity = items();

        let first = store.create(&entity, row(json!({"name": "a"}))).await.unwrap();
        let second = store.create(&entity, row(json!({"name": "b"}))).await.unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));

        let dup = store.create(&entity, row(json!({"id": 1, "name": "c"}))).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_find_all_pages_and_projects() {
        let store = MemoryStore::new();
        let entity = items();
        for name in ["c", "a", "b"] {
            store.create(&entity, row(json!({"name": name}))).await.unwrap();
        }

        let query = BuiltQuery {
            order_by: vec![OrderBy::asc("name")],
            offset: Some(1),
            limit: Some(1),
            projection: vec!["name".to_string()],
            ..BuiltQuery::default()
        };
        let rows = store.find_all(&entity, &query).await.unwrap();
        assert_eq!(rows, vec![row(json!({"name": "b"}))]);
    }

    #[tokio::test]
    async fn test_update_and_destroy() {
        let store = MemoryStore::new();
        let entity = items();
        store.create(&entity, row(json!({"name": "a"}))).await.unwrap();

        let by_id = BuiltQuery::new().filter("id", Predicate::Equals(TypedValue::Number(1.0)));
        let updated = store
            .update(&entity, &by_id, row(json!({"name": "z"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("z"));

        assert_eq!(store.destroy(&entity, &by_id).await.unwrap(), 1);
        assert_eq!(store.destroy(&entity, &by_id).await.unwrap(), 0);
        assert!(store.update(&entity, &by_id, Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_taken_key() {
        let store = MemoryStore::new();
        let entity = items();
        store.create(&entity, row(json!({"name": "a"}))).await.unwrap();
        store.create(&entity, row(json!({"name": "b"}))).await.unwrap();

        let second = BuiltQuery::new().filter("id", Predicate::Equals(TypedValue::Number(2.0)));
        let err = store
            .update(&entity, &second, row(json!({"id": 1, "name": "z"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"));

        // Rewriting a row's own key is fine.
        let same = store
            .update(&entity, &second, row(json!({"id": 2, "name": "z"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same["name"], json!("z"));

        let names: Vec<_> = store.rows("items").unwrap().iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("z")]);
    }

    #[tokio::test]
    async fn test_rows_snapshot() {
        let store = MemoryStore::new();
        assert!(store.rows("items").unwrap().is_empty());
        store.seed("items", vec![row(json!({"id": 5}))]).unwrap();
        assert_eq!(store.rows("items").unwrap(), vec![row(json!({"id": 5}))]);
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let store = MemoryStore::new();
        let entity = items();
        let a = SequenceSpec { name: "a_seq".into(), column: "id".into() };
        let b = SequenceSpec { name: "b_seq".into(), column: "id".into() };

        assert_eq!(store.next_sequence_value(&entity, &a).await.unwrap(), json!(1));
        assert_eq!(store.next_sequence_value(&entity, &a).await.unwrap(), json!(2));
        assert_eq!(store.next_sequence_value(&entity, &b).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.set_failure(Some("connection refused".to_string()));

        let err = store.count(&items(), &BuiltQuery::new()).await.unwrap_err();
        assert!(err.source().unwrap().to_string().contains("connection refused"));

        store.set_failure(None);
        assert_eq!(store.count(&items(), &BuiltQuery::new()).await.unwrap(), 0);
    }
}
