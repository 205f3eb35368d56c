//! A per-key object store over any [`Datastore`].
//!
//! Each object is bincode encoded under `/<id>`. Pointing a [`StateStore`]
//! at a [`NamespacedStore`](super::NamespacedStore) keeps every version's
//! objects apart.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, EncodingDecodingError, VersioningError, VersioningResult};
use crate::key::Key;
use crate::query::Query;
use crate::traits::codec::{RecordDecode, RecordEncode};
use crate::traits::datastore::Datastore;
use crate::traits::object_store::{ObjectStore, StateHandle};

pub struct StateStore<S> {
    store: Arc<dyn Datastore>,
    _state: PhantomData<fn() -> S>,
}

impl<S> StateStore<S>
where
    S: RecordDecode + RecordEncode + Send,
{
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            _state: PhantomData,
        }
    }
}

impl<S> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _state: PhantomData,
        }
    }
}

impl<S> std::fmt::Debug for StateStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

impl<S> ObjectStore for StateStore<S>
where
    S: RecordDecode + RecordEncode + Send,
{
    type Id = Key;
    type State = S;
    type Handle = StoredState<S>;

    fn begin(&self, id: Key, state: S) -> VersioningResult<()> {
        if self.store.has(&id)? {
            return Err(VersioningError::AlreadyTracking(id));
        }
        let bytes = state.encode_record().map_err(EncodingDecodingError::from)?;
        self.store.put(&id, &bytes)
    }

    fn get(&self, id: Key) -> StoredState<S> {
        StoredState {
            store: Arc::clone(&self.store),
            key: id,
            _state: PhantomData,
        }
    }

    fn has(&self, id: Key) -> VersioningResult<bool> {
        self.store.has(&id)
    }

    fn list(&self) -> VersioningResult<Vec<S>> {
        self.store
            .query(&Query::all())?
            .map(|entry| -> VersioningResult<S> {
                let entry = entry?;
                Ok(S::decode_record(&entry.value).map_err(EncodingDecodingError::from)?)
            })
            .collect()
    }
}

/// Handle to one object of a [`StateStore`].
pub struct StoredState<S> {
    store: Arc<dyn Datastore>,
    key: Key,
    _state: PhantomData<fn() -> S>,
}

impl<S> StoredState<S> {
    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl<S> std::fmt::Debug for StoredState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredState")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<S> StateHandle for StoredState<S>
where
    S: RecordDecode + RecordEncode,
{
    type State = S;

    fn get(&self) -> VersioningResult<S> {
        let bytes = self
            .store
            .get(&self.key)?
            .ok_or_else(|| VersioningError::NotTracked(self.key.clone()))?;
        Ok(S::decode_record(&bytes).map_err(EncodingDecodingError::from)?)
    }

    fn mutate<F, E>(&self, mutator: F) -> VersioningResult<()>
    where
        F: FnOnce(&mut S) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let mut state = self.get()?;
        mutator(&mut state).map_err(|e| VersioningError::Mutation {
            key: self.key.clone(),
            source: e.into(),
        })?;
        let bytes = state.encode_record().map_err(EncodingDecodingError::from)?;
        self.store.put(&self.key, &bytes)
    }

    fn end(&self) -> VersioningResult<()> {
        if !self.store.has(&self.key)? {
            return Err(VersioningError::NotTracked(self.key.clone()));
        }
        self.store.delete(&self.key)
    }
}
