//! Document store abstraction.
//!
//! [`DocumentStore`] is the seam between this core and whatever database
//! the surrounding system runs. Implementations must be `Send + Sync`;
//! every service in the workspace holds one as `Arc<dyn DocumentStore>`.
//!
//! # Design Principles
//!
//! - **Async**: all operations are async; callers supply timeouts at
//!   their layer (a timed-out call surfaces as
//!   [`StoreError::Unavailable`](crate::StoreError::Unavailable)).
//! - **Documents are JSON**: typed models live in the domain crates and
//!   cross this boundary as `serde_json::Value`.
//! - **Batches are atomic**: [`write_batch`](DocumentStore::write_batch)
//!   commits all writes or none — the audit pipeline's at-most-one-batch
//!   loss guarantee depends on this.

use crate::{Query, StoreError};
use async_trait::async_trait;
use serde_json::Value;

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub struct BatchWrite {
    /// Target collection.
    pub collection: String,
    /// Target document id.
    pub id: String,
    /// Full document body to set.
    pub doc: Value,
}

impl BatchWrite {
    /// Creates a set-document write.
    #[must_use]
    pub fn set(collection: impl Into<String>, id: impl Into<String>, doc: Value) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            doc,
        }
    }
}

/// Key-value document store addressed by collection + id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    ///
    /// Returns `Ok(None)` when the backend definitively answers "absent";
    /// a backend fault is `Err(Unavailable)`, never `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Creates or fully replaces a document.
    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    /// Returns all documents in a collection matching the query,
    /// honoring its ordering and limit.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Commits a batch of writes atomically — all or nothing.
    async fn write_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError>;

    /// Returns the number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}
