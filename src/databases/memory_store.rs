//! In-memory datastore backed by an ordered map.
//!
//! Cloning a [`MemoryStore`] shares the underlying map, so a clone handed to
//! a migration sees the same data as the original.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{VersioningError, VersioningResult};
use crate::key::Key;
use crate::query::{Entry, Query, QueryResults};
use crate::traits::datastore::{Batch, BatchOp, Datastore};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<Key, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> VersioningResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> VersioningResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Copy of every entry currently stored.
    pub fn snapshot(&self) -> VersioningResult<BTreeMap<Key, Vec<u8>>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> VersioningResult<RwLockReadGuard<'_, BTreeMap<Key, Vec<u8>>>> {
        self.data
            .read()
            .map_err(|_| VersioningError::Storage("Lock error".to_string()))
    }

    fn write(&self) -> VersioningResult<RwLockWriteGuard<'_, BTreeMap<Key, Vec<u8>>>> {
        self.data
            .write()
            .map_err(|_| VersioningError::Storage("Lock error".to_string()))
    }
}

impl Datastore for MemoryStore {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.write()?.insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        // Snapshot the matching range so callers can write while iterating.
        let data = self.read()?;
        let entries: Vec<Entry> = data
            .range(query.prefix.clone()..)
            .take_while(|(key, _)| key.as_str().starts_with(query.prefix.as_str()))
            .filter(|(key, _)| query.matches(key))
            .map(|(key, value)| Entry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        Ok(Box::new(MemoryBatch {
            store: self,
            ops: Vec::new(),
        }))
    }
}

struct MemoryBatch<'a> {
    store: &'a MemoryStore,
    ops: Vec<BatchOp>,
}

impl Batch for MemoryBatch<'_> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()> {
        self.ops.push(BatchOp::Put(key, value));
        Ok(())
    }

    fn delete(&mut self, key: Key) -> VersioningResult<()> {
        self.ops.push(BatchOp::Delete(key));
        Ok(())
    }

    fn commit(self: Box<Self>) -> VersioningResult<()> {
        let MemoryBatch { store, ops } = *self;
        let mut data = store.write()?;
        for op in ops {
            match op {
                BatchOp::Put(key, value) => {
                    data.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_invisible_until_commit() {
        let store = MemoryStore::new();
        let mut batch = store.batch().unwrap();
        batch.put(Key::new("/apples"), vec![7]).unwrap();
        assert!(!store.has(&Key::new("/apples")).unwrap());
        batch.commit().unwrap();
        assert_eq!(store.get(&Key::new("/apples")).unwrap(), Some(vec![7]));
    }

    #[test]
    fn empty_value_is_not_absent() {
        let store = MemoryStore::new();
        store.put(&Key::new("/versions/current"), b"").unwrap();
        assert_eq!(store.get(&Key::new("/versions/current")).unwrap(), Some(vec![]));
        assert_eq!(store.get(&Key::new("/versions/other")).unwrap(), None);
    }

    #[test]
    fn query_respects_path_prefix() {
        let store = MemoryStore::new();
        store.put(&Key::new("/1/apples"), &[1]).unwrap();
        store.put(&Key::new("/10/apples"), &[10]).unwrap();
        store.put(&Key::new("/1-old"), &[0]).unwrap();
        let keys: Vec<Key> = store
            .query(&Query::with_prefix("/1"))
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect();
        assert_eq!(keys, vec![Key::new("/1/apples")]);
    }
}
