//! In-memory [`DocumentStore`] implementation.
//!
//! Backs every test suite in the workspace and doubles as the store for
//! single-process embeddings. Documents live in a two-level map guarded
//! by a `parking_lot::RwLock`; queries are evaluated against the JSON
//! values directly.
//!
//! # Failure injection
//!
//! [`MemoryStore::fail_next`] arms the store to fail the next *n*
//! mutating calls with [`StoreError::Unavailable`] — the partial-failure
//! tests (one lost audit batch out of three) are built on this.
//! [`MemoryStore::fail_reads`] does the same for reads, for the
//! fail-closed decision tests.

use crate::query::compare;
use crate::{BatchWrite, Direction, DocumentStore, Query, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe in-memory document store.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use vigil_store::{DocumentStore, MemoryStore, StoreError};
///
/// # async fn demo() -> Result<(), StoreError> {
/// let store = MemoryStore::new();
/// store.put("roles", "r-1", json!({"name": "clinician"})).await?;
///
/// let doc = store.get("roles", "r-1").await?.expect("present");
/// assert_eq!(doc["name"], "clinician");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
    /// Remaining mutating calls to fail with `Unavailable`.
    write_failures_armed: AtomicUsize,
    /// Remaining read calls to fail with `Unavailable`.
    read_failures_armed: AtomicUsize,
    /// Total calls that were failed by injection.
    failures_delivered: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the store to fail the next `n` mutating calls
    /// (`put` / `write_batch`) with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: usize) {
        self.write_failures_armed.store(n, Ordering::SeqCst);
    }

    /// Arms the store to fail the next `n` read calls
    /// (`get` / `query` / `count`) with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, n: usize) {
        self.read_failures_armed.store(n, Ordering::SeqCst);
    }

    /// Returns how many calls have been failed by injection.
    #[must_use]
    pub fn failures_delivered(&self) -> usize {
        self.failures_delivered.load(Ordering::SeqCst)
    }

    fn take_failure(&self, armed: &AtomicUsize) -> bool {
        let mut remaining = armed.load(Ordering::SeqCst);
        while remaining > 0 {
            match armed.compare_exchange(
                remaining,
                remaining - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.failures_delivered.fetch_add(1, Ordering::SeqCst);
                    return true;
                }
                Err(current) => remaining = current,
            }
        }
        false
    }

    fn take_write_failure(&self) -> bool {
        self.take_failure(&self.write_failures_armed)
    }

    fn take_read_failure(&self) -> bool {
        self.take_failure(&self.read_failures_armed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        if self.take_read_failure() {
            return Err(StoreError::unavailable("injected failure"));
        }
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        if self.take_write_failure() {
            return Err(StoreError::unavailable("injected failure"));
        }
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        if self.take_read_failure() {
            return Err(StoreError::unavailable("injected failure"));
        }
        let collections = self.collections.read();
        let mut results: Vec<Value> = collections
            .get(collection)
            .map(|docs| docs.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order {
            results.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(std::cmp::Ordering::Equal),
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.max_results {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn write_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError> {
        if self.take_write_failure() {
            return Err(StoreError::unavailable("injected failure"));
        }
        // Single write-lock scope keeps the batch atomic.
        let mut collections = self.collections.write();
        for write in writes {
            collections
                .entry(write.collection)
                .or_default()
                .insert(write.id, write.doc);
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        if self.take_read_failure() {
            return Err(StoreError::unavailable("injected failure"));
        }
        Ok(self
            .collections
            .read()
            .get(collection)
            .map_or(0, HashMap::len))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read();
        let sizes: HashMap<&str, usize> = collections
            .iter()
            .map(|(name, docs)| (name.as_str(), docs.len()))
            .collect();
        f.debug_struct("MemoryStore")
            .field("collections", &sizes)
            .finish()
    }
}
