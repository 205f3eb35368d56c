//! Prefix-scoped views over a shared datastore.
//!
//! Each schema version keeps its records under its own key prefix in one
//! underlying store. A [`NamespacedStore`] hides that prefix: `/apples` read
//! through a view scoped to `/2` is `/2/apples` in the underlying store.

use std::sync::Arc;

use crate::error::VersioningResult;
use crate::key::Key;
use crate::query::{Entry, Query, QueryResults};
use crate::traits::datastore::{Batch, Datastore};

#[derive(Clone)]
pub struct NamespacedStore {
    inner: Arc<dyn Datastore>,
    prefix: Key,
}

impl NamespacedStore {
    pub fn new(inner: Arc<dyn Datastore>, prefix: impl Into<Key>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    fn outer(&self, key: &Key) -> Key {
        self.prefix.child(key)
    }
}

impl std::fmt::Debug for NamespacedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Datastore for NamespacedStore {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        self.inner.get(&self.outer(key))
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        self.inner.has(&self.outer(key))
    }

    fn get_size(&self, key: &Key) -> VersioningResult<Option<usize>> {
        self.inner.get_size(&self.outer(key))
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.inner.put(&self.outer(key), value)
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.inner.delete(&self.outer(key))
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        // Filters name keys as seen through this view, so they are applied
        // after the prefix is stripped.
        let inner_query = Query::with_prefix(self.outer(&query.prefix));
        let results = self.inner.query(&inner_query)?;
        let prefix = self.prefix.clone();
        let query = query.clone();
        Ok(Box::new(results.filter_map(move |result| {
            match result {
                Ok(entry) => {
                    let key = entry.key.strip_prefix(&prefix)?;
                    query.matches(&key).then_some(Ok(Entry {
                        key,
                        value: entry.value,
                    }))
                }
                Err(e) => Some(Err(e)),
            }
        })))
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        Ok(Box::new(NamespacedBatch {
            inner: self.inner.batch()?,
            prefix: &self.prefix,
        }))
    }

    fn sync(&self, prefix: &Key) -> VersioningResult<()> {
        self.inner.sync(&self.outer(prefix))
    }

    fn close(&self) -> VersioningResult<()> {
        self.inner.close()
    }
}

struct NamespacedBatch<'a> {
    inner: Box<dyn Batch + 'a>,
    prefix: &'a Key,
}

impl Batch for NamespacedBatch<'_> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()> {
        self.inner.put(self.prefix.child(&key), value)
    }

    fn delete(&mut self, key: Key) -> VersioningResult<()> {
        self.inner.delete(self.prefix.child(&key))
    }

    fn commit(self: Box<Self>) -> VersioningResult<()> {
        self.inner.commit()
    }
}
