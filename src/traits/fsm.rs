use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::VersioningResult;

use super::object_store::StateHandle;

/// Operations of a group of finite state machines persisted in a datastore.
///
/// The state machine logic lives outside this crate; this trait only names
/// what a gated wrapper has to forward.
pub trait StateMachineGroup: Send + Sync {
    type Id: Send;
    type Event: Send;
    type State: Send;
    /// The machine's state tag, as opposed to the full user state.
    type StateType;
    type Handle: StateHandle<State = Self::State>;

    fn begin(&self, id: Self::Id, state: Self::State) -> VersioningResult<()>;

    /// Queue `event` for the machine tracked under `id`.
    fn send(&self, id: Self::Id, event: Self::Event) -> VersioningResult<()>;

    /// Send `event` and wait until it has been processed.
    fn send_sync(
        &self,
        cancel: &CancellationToken,
        id: Self::Id,
        event: Self::Event,
    ) -> impl Future<Output = VersioningResult<()>> + Send;

    fn get(&self, id: Self::Id) -> Self::Handle;

    /// Wait for every queued event of `id` before reading its state.
    fn get_sync(
        &self,
        cancel: &CancellationToken,
        id: Self::Id,
    ) -> impl Future<Output = VersioningResult<Self::State>> + Send;

    fn has(&self, id: Self::Id) -> VersioningResult<bool>;

    fn list(&self) -> VersioningResult<Vec<Self::State>>;

    /// Whether `state` is final. Touches no storage.
    fn is_terminated(&self, state: &Self::StateType) -> bool;

    fn stop(&self, cancel: &CancellationToken) -> impl Future<Output = VersioningResult<()>> + Send;
}
