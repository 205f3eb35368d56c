use crate::error::VersioningResult;
use crate::key::Key;
use crate::query::{Query, QueryResults};
use crate::traits::datastore::{Batch, Datastore};

use super::gate::Gate;

/// A datastore that refuses every operation until its migrations have run.
pub struct MigratedDatastore<D> {
    inner: D,
    gate: Gate,
}

impl<D: Datastore> MigratedDatastore<D> {
    pub fn new(inner: D, gate: Gate) -> Self {
        Self { inner, gate }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for MigratedDatastore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigratedDatastore")
            .field("inner", &self.inner)
            .field("gate", &self.gate)
            .finish()
    }
}

impl<D: Datastore> Datastore for MigratedDatastore<D> {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        self.gate.call(|| self.inner.get(key))
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        self.gate.call(|| self.inner.has(key))
    }

    fn get_size(&self, key: &Key) -> VersioningResult<Option<usize>> {
        self.gate.call(|| self.inner.get_size(key))
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.gate.call(|| self.inner.put(key, value))
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.gate.call(|| self.inner.delete(key))
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        self.gate.call(|| self.inner.query(query))
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        self.gate.call(|| self.inner.batch())
    }

    fn sync(&self, prefix: &Key) -> VersioningResult<()> {
        self.gate.call(|| self.inner.sync(prefix))
    }

    fn close(&self) -> VersioningResult<()> {
        self.gate.call(|| self.inner.close())
    }
}
