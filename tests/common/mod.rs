// Common test utilities and helpers
#![allow(dead_code)]

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use netabase_versioning::prelude::*;
use netabase_versioning::query::QueryResults;

pub fn encoded(value: i64) -> Vec<u8> {
    value.encode_record().unwrap()
}

pub fn decoded(bytes: &[u8]) -> i64 {
    i64::decode_record(bytes).unwrap()
}

/// Decoded record at `key`, `None` when absent.
pub fn read(store: &dyn Datastore, key: &str) -> Option<i64> {
    store.get(&Key::new(key)).unwrap().map(|bytes| decoded(&bytes))
}

pub fn seed(store: &dyn Datastore, records: &[(&str, i64)]) {
    for (key, value) in records {
        store.put(&Key::new(key), &encoded(*value)).unwrap();
    }
}

pub fn set_version(store: &dyn Datastore, version: &str) {
    store
        .put(&Key::new(DEFAULT_VERSION_KEY), version.as_bytes())
        .unwrap();
}

pub fn keys_under(store: &dyn Datastore, prefix: &str) -> Vec<String> {
    store
        .query(&Query::with_prefix(prefix))
        .unwrap()
        .map(|entry| entry.unwrap().key.as_str().to_string())
        .collect()
}

pub fn add_seven(value: i64) -> Result<i64, Infallible> {
    Ok(value + 7)
}

pub fn sub_seven(value: i64) -> Result<i64, Infallible> {
    Ok(value - 7)
}

pub fn times_four(value: i64) -> Result<i64, Infallible> {
    Ok(value * 4)
}

pub fn div_four(value: i64) -> Result<i64, Infallible> {
    Ok(value / 4)
}

#[derive(Debug, thiserror::Error)]
#[error("refusing to migrate {0}")]
pub struct Refused(pub i64);

/// Fails on the value 42 and passes everything else through.
pub fn refuse_42(value: i64) -> Result<i64, Refused> {
    if value == 42 { Err(Refused(value)) } else { Ok(value) }
}

/// The fruit store at version 1: apples 7, oranges 3.
pub fn fruit_store() -> Arc<dyn Datastore> {
    let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
    seed(store.as_ref(), &[("/1/apples", 7), ("/1/oranges", 3)]);
    set_version(store.as_ref(), "1");
    store
}

/// 1 -> 2 adds seven, 2 -> 3 multiplies by four. Both are reversible.
pub fn fruit_migrations() -> VersionedMigrationList {
    VersionedBuilderList::new(vec![
        VersionedBuilder::new(times_four, "3")
            .old_version("2")
            .reversible(div_four),
        VersionedBuilder::new(add_seven, "2")
            .old_version("1")
            .reversible(sub_seven),
    ])
    .build()
    .unwrap()
}

/// Store operations a [`FlakyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Opening a query.
    Query,
    /// The second item of every query stream.
    QueryItem,
    Has,
    /// Direct writes, which is how the version record is written.
    Put,
    BatchPut,
    BatchDelete,
    Commit,
}

impl Op {
    fn error(self) -> VersioningError {
        match self {
            Op::Commit => VersioningError::Storage("disk full".to_string()),
            other => VersioningError::Storage(format!("{other:?} failed")),
        }
    }
}

/// A [`MemoryStore`] whose operations can be told to fail one by one.
/// Clones share the data and the switches.
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: Arc<Mutex<HashSet<Op>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    fn check(&self, op: Op) -> VersioningResult<()> {
        if self.failing.lock().unwrap().contains(&op) {
            Err(op.error())
        } else {
            Ok(())
        }
    }
}

struct FlakyBatch<'a> {
    inner: Box<dyn Batch + 'a>,
    store: &'a FlakyStore,
}

impl Batch for FlakyBatch<'_> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> VersioningResult<()> {
        self.store.check(Op::BatchPut)?;
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: Key) -> VersioningResult<()> {
        self.store.check(Op::BatchDelete)?;
        self.inner.delete(key)
    }

    fn commit(self: Box<Self>) -> VersioningResult<()> {
        self.store.check(Op::Commit)?;
        self.inner.commit()
    }
}

impl Datastore for FlakyStore {
    fn get(&self, key: &Key) -> VersioningResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn has(&self, key: &Key) -> VersioningResult<bool> {
        self.check(Op::Has)?;
        self.inner.has(key)
    }

    fn put(&self, key: &Key, value: &[u8]) -> VersioningResult<()> {
        self.check(Op::Put)?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &Key) -> VersioningResult<()> {
        self.inner.delete(key)
    }

    fn query(&self, query: &Query) -> VersioningResult<QueryResults<'_>> {
        self.check(Op::Query)?;
        let results = self.inner.query(query)?;
        if self.check(Op::QueryItem).is_err() {
            let broken = std::iter::once(Err(Op::QueryItem.error()));
            return Ok(Box::new(results.take(1).chain(broken)));
        }
        Ok(results)
    }

    fn batch(&self) -> VersioningResult<Box<dyn Batch + '_>> {
        Ok(Box::new(FlakyBatch {
            inner: self.inner.batch()?,
            store: self,
        }))
    }
}

/// Counters kept under `/<id>`. An event adds to the counter; a counter at
/// 100 or more is finished.
pub struct CounterGroup {
    counters: StateStore<i64>,
}

impl CounterGroup {
    pub fn new(store: NamespacedStore) -> Self {
        Self {
            counters: StateStore::new(Arc::new(store)),
        }
    }
}

impl StateMachineGroup for CounterGroup {
    type Id = Key;
    type Event = i64;
    type State = i64;
    type StateType = i64;
    type Handle = StoredState<i64>;

    fn begin(&self, id: Key, state: i64) -> VersioningResult<()> {
        self.counters.begin(id, state)
    }

    fn send(&self, id: Key, event: i64) -> VersioningResult<()> {
        self.counters
            .get(id)
            .mutate(|count| Ok::<(), Infallible>(*count += event))
    }

    fn send_sync(
        &self,
        _cancel: &tokio_util::sync::CancellationToken,
        id: Key,
        event: i64,
    ) -> impl std::future::Future<Output = VersioningResult<()>> + Send {
        async move { self.send(id, event) }
    }

    fn get(&self, id: Key) -> StoredState<i64> {
        self.counters.get(id)
    }

    fn get_sync(
        &self,
        _cancel: &tokio_util::sync::CancellationToken,
        id: Key,
    ) -> impl std::future::Future<Output = VersioningResult<i64>> + Send {
        async move { self.counters.get(id).get() }
    }

    fn has(&self, id: Key) -> VersioningResult<bool> {
        self.counters.has(id)
    }

    fn list(&self) -> VersioningResult<Vec<i64>> {
        self.counters.list()
    }

    fn is_terminated(&self, state: &i64) -> bool {
        *state >= 100
    }

    fn stop(
        &self,
        _cancel: &tokio_util::sync::CancellationToken,
    ) -> impl std::future::Future<Output = VersioningResult<()>> + Send {
        async { Ok(()) }
    }
}
