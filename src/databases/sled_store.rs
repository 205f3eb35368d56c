use std::path::Path;
use std::time::Instant;

use log::debug;

use crate::config::FileConfig;
use crate::error::VersioningResult;
use crate::key::Key;
use crate::query::{Entry, Query, QueryResults};
use crate::traits::datastore::{Batch, Datastore};

/// Datastore wrapper around a [sled](https://docs.rs/sled) database.
///
/// Keys are stored as their UTF-8 path bytes in the default tree, so sled's
/// byte ordering matches [`Key`] ordering and prefix scans line up with
/// [`Query`] prefixes.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    flush_on_commit: bool,
}

impl SledStore {
    /// Open a SledStore at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> VersioningResult<Self> {
        Self::with_config(&FileConfig::new(path.as_ref()))
    }

    /// Open a SledStore from a full [`FileConfig`]
    pub fn with_config(config: &FileConfig) -> VersioningResult<Self> {
        let start = Instant::now();
        if config.truncate && config.path.exists() {
            std::fs::remove_dir_all(&config.path)?;
        }
        if !config.create_if_missing && !config.temporary && !config.path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no sled database at {}", config.path.display()),
            )
            .into());
        }
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity((config.cache_size_mb as u64) * 1024 * 1024)
            .temporary(config.temporary)
            .open()?;
        debug!(
            "sled_store.opened path={} duration_ms={}",
            config.path.display(),
            start.elapsed().as_millis()
        );
        Ok(Self {
            db,
            flush_on_commit: config.use_fsync,
        })
    }

    /// Create an in-memory SledStore (useful for testing)
    pub fn temp() -> VersioningResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            flush_on_commit: false,
        })
    }

    /// Get direct access to the underlying sled database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

impl Datastore for SledStore {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        Ok(self.db.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.db.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        let prefix = if query.prefix.is_root() {
            Vec::new()
        } else {
            query.prefix.as_bytes().to_vec()
        };
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, value) = item?;
            let key = Key::from_bytes(&key);
            if query.matches(&key) {
                entries.push(Entry {
                    key,
                    value: value.to_vec(),
                });
            }
        }
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        Ok(Box::new(SledBatch {
            store: self,
            batch: sled::Batch::default(),
            ops: 0,
        }))
    }

    fn sync(&self, _prefix: &Key) -> VersioningResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn close(&self) -> VersioningResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

struct SledBatch<'a> {
    store: &'a SledStore,
    batch: sled::Batch,
    ops: usize,
}

impl Batch for SledBatch<'_> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()> {
        self.batch.insert(key.as_bytes(), value);
        self.ops += 1;
        Ok(())
    }

    fn delete(&mut self, key: Key) -> VersioningResult<()> {
        self.batch.remove(key.as_bytes());
        self.ops += 1;
        Ok(())
    }

    fn commit(self: Box<Self>) -> VersioningResult<()> {
        let SledBatch { store, batch, ops } = *self;
        let start = Instant::now();
        store.db.apply_batch(batch)?;
        if store.flush_on_commit {
            store.db.flush()?;
        }
        debug!(
            "sled_batch.committed ops={} duration_us={}",
            ops,
            start.elapsed().as_micros()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_stops_at_path_boundary() {
        let store = SledStore::temp().unwrap();
        store.put(&Key::new("/1/apples"), &[1]).unwrap();
        store.put(&Key::new("/10/apples"), &[10]).unwrap();
        let keys: Vec<Key> = store
            .query(&Query::with_prefix("/1"))
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect();
        assert_eq!(keys, vec![Key::new("/1/apples")]);
    }

    #[test]
    fn missing_database_is_not_created_unless_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sled");
        let config = FileConfig::builder()
            .path(path.clone())
            .create_if_missing(false)
            .build();

        let err = SledStore::with_config(&config).unwrap_err();

        assert!(matches!(
            err,
            crate::error::VersioningError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound
        ));
        assert!(!path.exists());
    }
}
