//! Datastore backed by a single [redb](https://docs.rs/redb) table.
//!
//! Every key lives in one `&str -> &[u8]` table. redb orders `&str` keys
//! bytewise, which is the same order [`Key`] uses, so a prefix query is a
//! range scan that stops at the first key outside the prefix.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::config::FileConfig;
use crate::error::VersioningResult;
use crate::key::Key;
use crate::query::{Entry, Query, QueryResults};
use crate::traits::datastore::{Batch, BatchOp, Datastore};

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Create a new RedbStore at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> VersioningResult<Self> {
        Self::with_config(&FileConfig::new(path.as_ref()))
    }

    /// Open a RedbStore from a full [`FileConfig`]
    pub fn with_config(config: &FileConfig) -> VersioningResult<Self> {
        let start = Instant::now();
        if config.truncate && config.path.exists() {
            std::fs::remove_file(&config.path)?;
        }
        let mut builder = Database::builder();
        builder.set_cache_size(config.cache_size_mb * 1024 * 1024);
        let db = if config.create_if_missing {
            builder.create(&config.path)?
        } else {
            builder.open(&config.path)?
        };
        debug!(
            "redb_store.opened path={} duration_ms={}",
            config.path.display(),
            start.elapsed().as_millis()
        );
        Ok(Self { db: Arc::new(db) })
    }

    /// Get direct access to the underlying redb database
    pub fn db(&self) -> &Database {
        &self.db
    }

    fn write(&self, ops: Vec<BatchOp>) -> VersioningResult<()> {
        let start = Instant::now();
        let count = ops.len();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECORDS)?;
            for op in ops {
                match op {
                    BatchOp::Put(key, value) => {
                        table.insert(key.as_str(), value.as_slice())?;
                    }
                    BatchOp::Delete(key) => {
                        table.remove(key.as_str())?;
                    }
                }
            }
        }
        txn.commit()?;
        debug!(
            "redb_write.committed ops={} duration_us={}",
            count,
            start.elapsed().as_micros()
        );
        Ok(())
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl Datastore for RedbStore {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RECORDS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(table.get(key.as_str())?.map(|guard| guard.value().to_vec()))
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.write(vec![BatchOp::Put(key.clone(), value.to_vec())])
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.write(vec![BatchOp::Delete(key.clone())])
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RECORDS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Box::new(std::iter::empty())),
            Err(e) => return Err(e.into()),
        };

        let prefix = query.prefix.as_str();
        let mut entries = Vec::new();
        for item in table.range(prefix..)? {
            let (key, value) = item?;
            if !key.value().starts_with(prefix) {
                break;
            }
            let key = Key::new(key.value());
            if query.matches(&key) {
                entries.push(Entry {
                    key,
                    value: value.value().to_vec(),
                });
            }
        }
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        Ok(Box::new(RedbBatch {
            store: self,
            ops: Vec::new(),
        }))
    }
}

struct RedbBatch<'a> {
    store: &'a RedbStore,
    ops: Vec<BatchOp>,
}

impl Batch for RedbBatch<'_> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()> {
        self.ops.push(BatchOp::Put(key, value));
        Ok(())
    }

    fn delete(&mut self, key: Key) -> VersioningResult<()> {
        self.ops.push(BatchOp::Delete(key));
        Ok(())
    }

    fn commit(self: Box<Self>) -> VersioningResult<()> {
        let RedbBatch { store, ops } = *self;
        store.write(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::new(dir.path().join("store.redb")).unwrap();
        assert_eq!(store.get(&Key::new("/apples")).unwrap(), None);
        assert_eq!(store.query(&Query::all()).unwrap().count(), 0);
    }

    #[test]
    fn batch_applies_in_one_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::new(dir.path().join("store.redb")).unwrap();
        store.put(&Key::new("/1/apples"), &[7]).unwrap();

        let mut batch = store.batch().unwrap();
        batch.put(Key::new("/2/apples"), vec![14]).unwrap();
        batch.delete(Key::new("/1/apples")).unwrap();
        batch.commit().unwrap();

        let keys: Vec<Key> = store
            .query(&Query::all())
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect();
        assert_eq!(keys, vec![Key::new("/2/apples")]);
    }
}
