use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use axum::async_trait;
use serde_json::{json, Map, Value};
use sqlx::types::Json;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Top-level equality filter over document fields.
#[derive(Debug, Clone, Default)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn as_json(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Used by the in-memory adapter; Postgres evaluates the same
    /// semantics with jsonb containment.
    pub fn matches(&self, doc: &Value) -> bool {
        self.0.iter().all(|(k, v)| doc.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Order {
    Asc,
    Desc,
}

/// The external document-storage collaborator. The quiz backend only needs
/// these few operations; everything else about storage (timeouts, pooling,
/// replication) is the adapter's business.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, stamping `_id` and `created_at` when absent.
    /// Returns the document as stored.
    async fn insert(&self, collection: &str, doc: Value) -> anyhow::Result<Value>;

    /// Insert unless another document in the collection already carries the
    /// same value for `unique_field`. Returns `None` on a duplicate.
    async fn insert_unique(
        &self,
        collection: &str,
        unique_field: &str,
        doc: Value,
    ) -> anyhow::Result<Option<Value>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> anyhow::Result<Option<Value>>;

    /// Unsorted reads come back in insertion order.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<(&str, Order)>,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Value>>;

    /// Delete every match; returns how many were removed. Deleting nothing
    /// is not an error.
    async fn delete(&self, collection: &str, filter: &Filter) -> anyhow::Result<u64>;

    async fn count(&self, collection: &str, filter: &Filter) -> anyhow::Result<i64>;

    /// Names of collections currently holding documents, for diagnostics.
    async fn collection_names(&self) -> anyhow::Result<Vec<String>>;
}

fn stamp_metadata(doc: &mut Value) -> anyhow::Result<()> {
    let obj = doc
        .as_object_mut()
        .context("document must be a JSON object")?;
    if !obj.contains_key("_id") {
        obj.insert("_id".into(), json!(Uuid::new_v4()));
    }
    if !obj.contains_key("created_at") {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format created_at")?;
        obj.insert("created_at".into(), json!(now));
    }
    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Postgres adapter: one JSONB table, logical collections.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &str, mut doc: Value) -> anyhow::Result<Value> {
        stamp_metadata(&mut doc)?;
        sqlx::query("INSERT INTO documents (collection, doc) VALUES ($1, $2)")
            .bind(collection)
            .bind(Json(&doc))
            .execute(&self.pool)
            .await
            .context("insert document")?;
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        _unique_field: &str,
        mut doc: Value,
    ) -> anyhow::Result<Option<Value>> {
        // Uniqueness comes from the partial indexes in the schema; the
        // field name only matters to the in-memory adapter.
        stamp_metadata(&mut doc)?;
        let result = sqlx::query("INSERT INTO documents (collection, doc) VALUES ($1, $2)")
            .bind(collection)
            .bind(Json(&doc))
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(Some(doc)),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("insert document"),
        }
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> anyhow::Result<Option<Value>> {
        let row: Option<Json<Value>> = sqlx::query_scalar(
            "SELECT doc FROM documents WHERE collection = $1 AND doc @> $2 ORDER BY seq LIMIT 1",
        )
        .bind(collection)
        .bind(Json(filter.as_json()))
        .fetch_optional(&self.pool)
        .await
        .context("find document")?;
        Ok(row.map(|row| row.0))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<(&str, Order)>,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT doc FROM documents WHERE collection = ",
        );
        qb.push_bind(collection);
        qb.push(" AND doc @> ");
        qb.push_bind(Json(filter.as_json()));
        match sort {
            Some((field, order)) => {
                // jsonb comparison sorts numbers numerically.
                qb.push(" ORDER BY doc -> ");
                qb.push_bind(field.to_string());
                qb.push(match order {
                    Order::Asc => " ASC",
                    Order::Desc => " DESC",
                });
            }
            None => {
                qb.push(" ORDER BY seq");
            }
        }
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        let rows: Vec<Json<Value>> = qb
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .context("find documents")?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND doc @> $2")
            .bind(collection)
            .bind(Json(filter.as_json()))
            .execute(&self.pool)
            .await
            .context("delete documents")?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND doc @> $2",
        )
        .bind(collection)
        .bind(Json(filter.as_json()))
        .fetch_one(&self.pool)
        .await
        .context("count documents")?;
        Ok(count)
    }

    async fn collection_names(&self) -> anyhow::Result<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT collection FROM documents ORDER BY collection")
                .fetch_all(&self.pool)
                .await
                .context("list collections")?;
        Ok(names)
    }
}

/// In-memory adapter backing `AppState::fake()` and the unit tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn json_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, mut doc: Value) -> anyhow::Result<Value> {
        stamp_metadata(&mut doc)?;
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        unique_field: &str,
        mut doc: Value,
    ) -> anyhow::Result<Option<Value>> {
        stamp_metadata(&mut doc)?;
        let mut guard = self.lock();
        let docs = guard.entry(collection.to_string()).or_default();
        let key = doc.get(unique_field);
        if key.is_some() && docs.iter().any(|d| d.get(unique_field) == key) {
            return Ok(None);
        }
        docs.push(doc.clone());
        Ok(Some(doc))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> anyhow::Result<Option<Value>> {
        let guard = self.lock();
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<(&str, Order)>,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Value>> {
        let guard = self.lock();
        let mut docs: Vec<Value> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        if let Some((field, order)) = sort {
            // Stable sort keeps insertion order for ties.
            docs.sort_by(|a, b| {
                let cmp = json_cmp(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                match order {
                    Order::Asc => cmp,
                    Order::Desc => cmp.reverse(),
                }
            });
        }
        if let Some(limit) = limit {
            docs.truncate(limit.max(0) as usize);
        }
        Ok(docs)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> anyhow::Result<u64> {
        let mut guard = self.lock();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> anyhow::Result<i64> {
        let guard = self.lock();
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as i64)
            .unwrap_or(0))
    }

    async fn collection_names(&self) -> anyhow::Result<Vec<String>> {
        let guard = self.lock();
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_stamps_id_and_created_at() {
        let store = MemoryStore::new();
        let doc = store
            .insert("things", json!({"name": "rex"}))
            .await
            .expect("insert");
        assert!(doc.get("_id").is_some());
        assert!(doc.get("created_at").is_some());
    }

    #[tokio::test]
    async fn insert_rejects_non_objects() {
        let store = MemoryStore::new();
        assert!(store.insert("things", json!(42)).await.is_err());
    }

    #[tokio::test]
    async fn insert_unique_returns_none_on_duplicate() {
        let store = MemoryStore::new();
        let first = store
            .insert_unique("appuser", "email", json!({"email": "a@b.c"}))
            .await
            .expect("insert");
        assert!(first.is_some());
        let second = store
            .insert_unique("appuser", "email", json!({"email": "a@b.c"}))
            .await
            .expect("insert");
        assert!(second.is_none());
        assert_eq!(store.count("appuser", &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_many_preserves_insertion_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert("q", json!({"n": i})).await.expect("insert");
        }
        let docs = store
            .find_many("q", &Filter::new(), None, None)
            .await
            .expect("find");
        let ns: Vec<i64> = docs.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn find_many_sorts_descending_and_limits() {
        let store = MemoryStore::new();
        for score in [3, 9, 1, 7] {
            store
                .insert("quizresult", json!({"score": score}))
                .await
                .expect("insert");
        }
        let docs = store
            .find_many(
                "quizresult",
                &Filter::new(),
                Some(("score", Order::Desc)),
                Some(2),
            )
            .await
            .expect("find");
        let scores: Vec<i64> = docs.iter().map(|d| d["score"].as_i64().unwrap()).collect();
        assert_eq!(scores, vec![9, 7]);
    }

    #[tokio::test]
    async fn filter_matches_on_all_fields() {
        let store = MemoryStore::new();
        store
            .insert("q", json!({"theme": "jurassic", "difficulty": "easy"}))
            .await
            .expect("insert");
        store
            .insert("q", json!({"theme": "jurassic", "difficulty": "hard"}))
            .await
            .expect("insert");
        let filter = Filter::new().eq("theme", "jurassic").eq("difficulty", "hard");
        let docs = store.find_many("q", &filter, None, None).await.expect("find");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["difficulty"], "hard");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store
            .insert("session", json!({"token": "abc"}))
            .await
            .expect("insert");
        let filter = Filter::new().eq("token", "abc");
        assert_eq!(store.delete("session", &filter).await.unwrap(), 1);
        assert_eq!(store.delete("session", &filter).await.unwrap(), 0);
    }
}
