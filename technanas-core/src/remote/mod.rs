//! Remote document store contract.
//!
//! The remote store is the source of truth for content. It is addressed by
//! collection and document id, supports equality-filtered queries, and every
//! operation is asynchronous and can fail with a [`RemoteError`].
//!
//! Two adapters are provided:
//! - [`FirestoreClient`]: Firestore REST v1 over `reqwest`
//! - [`MemoryRemoteStore`]: in-process store with failure injection and a
//!   call log, used in tests

mod document;
mod error;
mod firestore;
mod memory;

use async_trait::async_trait;
use std::fmt;

pub use document::{Document, FieldValue, Fields};
pub use error::RemoteError;
pub use firestore::{FirestoreClient, FirestoreConfig};
pub use memory::{MemoryRemoteStore, RemoteCall};

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// An equality-filtered, optionally ordered and limited collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, FieldValue)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Kinds of remote operation, used for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Get,
    Query,
    Add,
    Set,
    Update,
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOp::Get => write!(f, "get"),
            RemoteOp::Query => write!(f, "query"),
            RemoteOp::Add => write!(f, "add"),
            RemoteOp::Set => write!(f, "set"),
            RemoteOp::Update => write!(f, "update"),
            RemoteOp::Delete => write!(f, "delete"),
        }
    }
}

/// Network-authoritative document store.
///
/// Implementations are shared process-wide behind an `Arc<dyn RemoteStore>`.
/// Calls are not cancellable once issued.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads one document. An absent document is `Ok(None)`.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, RemoteError>;

    /// Runs an equality-filtered query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, RemoteError>;

    /// Creates a document with a store-generated id and returns that id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError>;

    /// Creates or fully replaces the document with the given id.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError>;

    /// Merges the given fields into an existing document.
    /// Fails with [`RemoteError::NotFound`] if the document does not exist.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError>;

    /// Deletes a document. Deleting an absent document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), RemoteError>;
}
