use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::VersioningResult;
use crate::traits::fsm::StateMachineGroup;

use super::gate::{Gate, GatedStoredState};

/// A state machine group that refuses every operation until its migrations
/// have run. [`MigratedStateMachineGroup::is_terminated`] reads no storage
/// and is always forwarded.
pub struct MigratedStateMachineGroup<G> {
    inner: G,
    gate: Gate,
}

impl<G: StateMachineGroup> MigratedStateMachineGroup<G> {
    pub fn new(inner: G, gate: Gate) -> Self {
        Self { inner, gate }
    }

    pub fn begin(&self, id: G::Id, state: G::State) -> VersioningResult<()> {
        self.gate.call(|| self.inner.begin(id, state))
    }

    pub fn send(&self, id: G::Id, event: G::Event) -> VersioningResult<()> {
        self.gate.call(|| self.inner.send(id, event))
    }

    pub async fn send_sync(
        &self,
        cancel: &CancellationToken,
        id: G::Id,
        event: G::Event,
    ) -> VersioningResult<()> {
        self.gate
            .call_async(|| self.inner.send_sync(cancel, id, event))
            .await
    }

    pub fn get(&self, id: G::Id) -> GatedStoredState<G::Handle> {
        self.gate.handle(|| self.inner.get(id))
    }

    pub async fn get_sync(&self, cancel: &CancellationToken, id: G::Id) -> VersioningResult<G::State> {
        self.gate.call_async(|| self.inner.get_sync(cancel, id)).await
    }

    pub fn has(&self, id: G::Id) -> VersioningResult<bool> {
        self.gate.call(|| self.inner.has(id))
    }

    pub fn list(&self) -> VersioningResult<Vec<G::State>> {
        self.gate.call(|| self.inner.list())
    }

    pub fn is_terminated(&self, state: &G::StateType) -> bool {
        self.inner.is_terminated(state)
    }

    pub async fn stop(&self, cancel: &CancellationToken) -> VersioningResult<()> {
        self.gate.call_async(|| self.inner.stop(cancel)).await
    }
}

impl<G: StateMachineGroup> StateMachineGroup for MigratedStateMachineGroup<G> {
    type Id = G::Id;
    type Event = G::Event;
    type State = G::State;
    type StateType = G::StateType;
    type Handle = GatedStoredState<G::Handle>;

    fn begin(&self, id: G::Id, state: G::State) -> VersioningResult<()> {
        MigratedStateMachineGroup::begin(self, id, state)
    }

    fn send(&self, id: G::Id, event: G::Event) -> VersioningResult<()> {
        MigratedStateMachineGroup::send(self, id, event)
    }

    fn send_sync(
        &self,
        cancel: &CancellationToken,
        id: G::Id,
        event: G::Event,
    ) -> impl Future<Output = VersioningResult<()>> + Send {
        MigratedStateMachineGroup::send_sync(self, cancel, id, event)
    }

    fn get(&self, id: G::Id) -> Self::Handle {
        MigratedStateMachineGroup::get(self, id)
    }

    fn get_sync(
        &self,
        cancel: &CancellationToken,
        id: G::Id,
    ) -> impl Future<Output = VersioningResult<G::State>> + Send {
        MigratedStateMachineGroup::get_sync(self, cancel, id)
    }

    fn has(&self, id: G::Id) -> VersioningResult<bool> {
        MigratedStateMachineGroup::has(self, id)
    }

    fn list(&self) -> VersioningResult<Vec<G::State>> {
        MigratedStateMachineGroup::list(self)
    }

    fn is_terminated(&self, state: &G::StateType) -> bool {
        MigratedStateMachineGroup::is_terminated(self, state)
    }

    fn stop(&self, cancel: &CancellationToken) -> impl Future<Output = VersioningResult<()>> + Send {
        MigratedStateMachineGroup::stop(self, cancel)
    }
}
