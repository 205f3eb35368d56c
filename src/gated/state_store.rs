use crate::error::VersioningResult;
use crate::traits::object_store::ObjectStore;

use super::gate::{Gate, GatedStoredState};

/// An object store that refuses every operation until its migrations have
/// run.
pub struct MigratedStateStore<O> {
    inner: O,
    gate: Gate,
}

impl<O: ObjectStore> MigratedStateStore<O> {
    pub fn new(inner: O, gate: Gate) -> Self {
        Self { inner, gate }
    }
}

impl<O: ObjectStore> ObjectStore for MigratedStateStore<O> {
    type Id = O::Id;
    type State = O::State;
    type Handle = GatedStoredState<O::Handle>;

    fn begin(&self, id: O::Id, state: O::State) -> VersioningResult<()> {
        self.gate.call(|| self.inner.begin(id, state))
    }

    fn get(&self, id: O::Id) -> Self::Handle {
        self.gate.handle(|| self.inner.get(id))
    }

    fn has(&self, id: O::Id) -> VersioningResult<bool> {
        self.gate.call(|| self.inner.has(id))
    }

    fn list(&self) -> VersioningResult<Vec<O::State>> {
        self.gate.call(|| self.inner.list())
    }
}

impl<O: std::fmt::Debug> std::fmt::Debug for MigratedStateStore<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigratedStateStore")
            .field("inner", &self.inner)
            .field("gate", &self.gate)
            .finish()
    }
}
