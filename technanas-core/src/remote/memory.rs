//! In-process remote store.
//!
//! Behaves like the hosted document store for everything the sync layer
//! relies on (generated ids, upsert, equality filters, ordering, limits) and
//! additionally records every call and can be told to fail a given kind of
//! operation.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{Direction, Document, Fields, Query, RemoteError, RemoteOp, RemoteStore};

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub op: RemoteOp,
    pub collection: String,
    pub id: Option<String>,
}

#[derive(Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Fields>>>,
    failures: Mutex<HashMap<RemoteOp, RemoteError>>,
    calls: Mutex<Vec<RemoteCall>>,
    next_id: AtomicU64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation of kind `op` fail with `error`.
    pub async fn fail_with(&self, op: RemoteOp, error: RemoteError) {
        self.failures.lock().await.insert(op, error);
    }

    /// A store that is permanently offline: every operation fails with
    /// [`RemoteError::Unavailable`].
    pub fn unreachable() -> Self {
        let mut store = Self::default();
        offline_failures(store.failures.get_mut());
        store
    }

    /// Makes every operation fail as if the network were down.
    pub async fn go_offline(&self) {
        offline_failures(&mut *self.failures.lock().await);
    }

    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Stores a document directly, bypassing failure injection and the call log.
    pub async fn put(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Reads a document directly, bypassing failure injection and the call log.
    pub async fn peek(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    /// Number of documents currently in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    async fn record(
        &self,
        op: RemoteOp,
        collection: &str,
        id: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.calls.lock().await.push(RemoteCall {
            op,
            collection: collection.to_string(),
            id: id.map(str::to_string),
        });
        match self.failures.lock().await.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn generate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("doc{}", n)
    }
}

fn offline_failures(failures: &mut HashMap<RemoteOp, RemoteError>) {
    for op in [
        RemoteOp::Get,
        RemoteOp::Query,
        RemoteOp::Add,
        RemoteOp::Set,
        RemoteOp::Update,
        RemoteOp::Delete,
    ] {
        failures.insert(op, RemoteError::Unavailable("offline".to_string()));
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, RemoteError> {
        self.record(RemoteOp::Get, collection, Some(id)).await?;
        Ok(self.peek(collection, id).await)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, RemoteError> {
        self.record(RemoteOp::Query, &query.collection, None).await?;

        let collections = self.collections.lock().await;
        let mut docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| {
                        query.filters.iter().all(|(field, value)| {
                            fields.get(field).is_some_and(|v| v.matches(value))
                        })
                    })
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            // Ordered queries only return documents that have the field.
            docs.retain(|doc| doc.get(field).is_some());
            docs.sort_by(|a, b| {
                let (Some(a), Some(b)) = (a.get(field), b.get(field)) else {
                    return std::cmp::Ordering::Equal;
                };
                match direction {
                    Direction::Ascending => a.compare(b),
                    Direction::Descending => b.compare(a),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError> {
        self.record(RemoteOp::Add, collection, None).await?;
        let id = self.generate_id();
        self.put(collection, &id, fields).await;
        Ok(id)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        self.record(RemoteOp::Set, collection, Some(id)).await?;
        self.put(collection, id, fields).await;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        self.record(RemoteOp::Update, collection, Some(id)).await?;
        let mut collections = self.collections.lock().await;
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, id)))?;
        existing.extend(fields);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.record(RemoteOp::Delete, collection, Some(id)).await?;
        if let Some(docs) = self.collections.lock().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FieldValue;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_add_generates_sequential_ids() {
        let store = MemoryRemoteStore::new();
        let first = store.add_document("farms", Fields::new()).await.unwrap();
        let second = store.add_document("farms", Fields::new()).await.unwrap();
        assert_eq!(first, "doc1");
        assert_eq!(second, "doc2");
        assert_eq!(store.len("farms").await, 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryRemoteStore::new();
        let doc = store.get_document("users", "nobody@x.com").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let store = MemoryRemoteStore::new();
        store
            .set_document("users", "a@x.com", fields(&[("a", 1i64.into()), ("b", 2i64.into())]))
            .await
            .unwrap();
        store
            .set_document("users", "a@x.com", fields(&[("a", 3i64.into())]))
            .await
            .unwrap();

        let doc = store.peek("users", "a@x.com").await.unwrap();
        assert_eq!(doc.get_i64("a"), Some(3));
        assert!(doc.get("b").is_none());
    }

    #[tokio::test]
    async fn test_update_fields_merges_and_requires_existing() {
        let store = MemoryRemoteStore::new();
        let missing = store
            .update_fields("users", "a@x.com", fields(&[("a", 1i64.into())]))
            .await;
        assert!(matches!(missing, Err(RemoteError::NotFound(_))));

        store
            .put("users", "a@x.com", fields(&[("a", 1i64.into()), ("b", 2i64.into())]))
            .await;
        store
            .update_fields("users", "a@x.com", fields(&[("a", 9i64.into())]))
            .await
            .unwrap();

        let doc = store.peek("users", "a@x.com").await.unwrap();
        assert_eq!(doc.get_i64("a"), Some(9));
        assert_eq!(doc.get_i64("b"), Some(2));
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryRemoteStore::new();
        store
            .put("ann", "x", fields(&[("owner", "a".into()), ("date", 100i64.into())]))
            .await;
        store
            .put("ann", "y", fields(&[("owner", "a".into()), ("date", 300i64.into())]))
            .await;
        store
            .put("ann", "z", fields(&[("owner", "b".into()), ("date", 200i64.into())]))
            .await;
        store.put("ann", "undated", fields(&[("owner", "a".into())])).await;

        let ordered = store
            .query(&Query::collection("ann").order_by("date", Direction::Descending))
            .await
            .unwrap();
        let ids: Vec<&str> = ordered.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z", "x"]);

        let owned = store
            .query(&Query::collection("ann").where_eq("owner", "a"))
            .await
            .unwrap();
        assert_eq!(owned.len(), 3);

        let limited = store
            .query(
                &Query::collection("ann")
                    .where_eq("owner", "a")
                    .order_by("date", Direction::Ascending)
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "x");
    }

    #[tokio::test]
    async fn test_failure_injection_and_call_log() {
        let store = MemoryRemoteStore::new();
        store
            .fail_with(RemoteOp::Delete, RemoteError::Unavailable("down".into()))
            .await;

        let result = store.delete_document("farms", "doc1").await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        assert!(store.get_document("farms", "doc1").await.is_ok());

        let calls = store.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].op, RemoteOp::Delete);
        assert_eq!(calls[0].id.as_deref(), Some("doc1"));

        store.clear_failures().await;
        assert!(store.delete_document("farms", "doc1").await.is_ok());
    }

    #[tokio::test]
    async fn test_offline_fails_everything() {
        let store = MemoryRemoteStore::new();
        store.go_offline().await;
        assert!(store.query(&Query::collection("x")).await.is_err());
        assert!(store.add_document("x", Fields::new()).await.is_err());
        assert_eq!(store.len("x").await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = MemoryRemoteStore::unreachable();
        assert_eq!(
            store.get_document("users", "a@x.com").await,
            Err(RemoteError::Unavailable("offline".to_string()))
        );
        store.clear_failures().await;
        assert_eq!(store.get_document("users", "a@x.com").await, Ok(None));
    }
}
