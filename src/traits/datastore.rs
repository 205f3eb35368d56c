//! The key-value store capability everything in this crate runs against.
//!
//! Backends ([`MemoryStore`](crate::databases::MemoryStore),
//! [`SledStore`](crate::databases::SledStore),
//! [`RedbStore`](crate::databases::RedbStore)) and views over them
//! ([`NamespacedStore`](crate::databases::NamespacedStore), the gated
//! [`MigratedDatastore`](crate::gated::MigratedDatastore)) all implement
//! [`Datastore`], so migrations never care which one they are given.

use crate::error::VersioningResult;
use crate::key::Key;
use crate::query::{Query, QueryResults};

/// A set of writes and deletes applied atomically on [`Batch::commit`].
///
/// Operations are buffered; nothing is visible to readers until the commit
/// succeeds, and a failed commit applies nothing.
pub trait Batch: Send {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()>;

    fn delete(&mut self, key: Key) -> VersioningResult<()>;

    fn commit(self: Box<Self>) -> VersioningResult<()>;
}

pub trait Datastore: Send + Sync {
    /// `Ok(None)` when the key is absent. An empty value is still `Some`.
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>>;

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn get_size(&self, key: &Key) -> VersioningResult<Option<usize>> {
        Ok(self.get(key)?.map(|value| value.len()))
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()>;

    /// Deleting an absent key is not an error.
    fn delete(&self, key: &Key) -> VersioningResult<()>;

    /// Entries matching `query`, in key order for the bundled backends.
    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>>;

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>>;

    /// Flush everything at or below `prefix` to durable storage.
    fn sync(&self, _prefix: &Key) -> VersioningResult<()> {
        Ok(())
    }

    fn close(&self) -> VersioningResult<()> {
        Ok(())
    }
}

/// Buffered operation used by backends that assemble a batch before
/// applying it in one write.
#[derive(Debug, Clone)]
pub(crate) enum BatchOp {
    Put(Key, Vec<u8>),
    Delete(Key),
}

impl<T: Datastore + ?Sized> Datastore for std::sync::Arc<T> {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        (**self).has(key)
    }

    fn get_size(&self, key: &Key) -> VersioningResult<Option<usize>> {
        (**self).get_size(key)
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        (**self).delete(key)
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        (**self).query(query)
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        (**self).batch()
    }

    fn sync(&self, prefix: &Key) -> VersioningResult<()> {
        (**self).sync(prefix)
    }

    fn close(&self) -> VersioningResult<()> {
        (**self).close()
    }
}
