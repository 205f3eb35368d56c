use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, VersioningError, VersioningResult};
use crate::traits::object_store::StateHandle;
use crate::traits::state::MigrationState;

/// The readiness check every gated wrapper runs before forwarding a call.
#[derive(Clone)]
pub struct Gate {
    state: Arc<dyn MigrationState>,
}

impl Gate {
    pub fn new(state: Arc<dyn MigrationState>) -> Self {
        Self { state }
    }

    pub fn check(&self) -> VersioningResult<()> {
        self.state.ready_error()
    }

    /// Run `op` only once the store is ready.
    pub fn call<T>(&self, op: impl FnOnce() -> VersioningResult<T>) -> VersioningResult<T> {
        self.check()?;
        op()
    }

    /// [`Gate::call`] for operations that return a future. The future is
    /// not created while the store is not ready.
    pub async fn call_async<T, F, Fut>(&self, op: F) -> VersioningResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VersioningResult<T>>,
    {
        self.check()?;
        op().await
    }

    /// [`Gate::call`] for operations that hand out a state handle. Before the
    /// store is ready the handle only reports the readiness error.
    pub fn handle<H: StateHandle>(&self, op: impl FnOnce() -> H) -> GatedStoredState<H> {
        match self.check() {
            Ok(()) => GatedStoredState::Ready(op()),
            Err(e) => GatedStoredState::NotReady(NotReadyStoredState::new(e)),
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("ready", &self.check().is_ok())
            .finish()
    }
}

/// A state handle whose every method fails with the readiness error it was
/// created with.
pub struct NotReadyStoredState<S> {
    error: Arc<VersioningError>,
    _state: PhantomData<fn() -> S>,
}

impl<S> NotReadyStoredState<S> {
    pub fn new(error: VersioningError) -> Self {
        Self {
            error: Arc::new(error),
            _state: PhantomData,
        }
    }

    fn error(&self) -> VersioningError {
        match self.error.as_ref() {
            VersioningError::MigrationsNotRun => VersioningError::MigrationsNotRun,
            VersioningError::MigrationFailed(inner) => {
                VersioningError::MigrationFailed(Arc::clone(inner))
            }
            _ => VersioningError::MigrationFailed(Arc::clone(&self.error)),
        }
    }
}

impl<S> std::fmt::Debug for NotReadyStoredState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NotReadyStoredState")
            .field(&self.error)
            .finish()
    }
}

impl<S> StateHandle for NotReadyStoredState<S> {
    type State = S;

    fn get(&self) -> VersioningResult<S> {
        Err(self.error())
    }

    fn mutate<F, E>(&self, _mutator: F) -> VersioningResult<()>
    where
        F: FnOnce(&mut S) -> Result<(), E>,
        E: Into<BoxError>,
    {
        Err(self.error())
    }

    fn end(&self) -> VersioningResult<()> {
        Err(self.error())
    }
}

/// The handle a gated `get` returns: the wrapped store's own handle once the
/// store is ready, a [`NotReadyStoredState`] before.
#[derive(Debug)]
pub enum GatedStoredState<H: StateHandle> {
    Ready(H),
    NotReady(NotReadyStoredState<H::State>),
}

impl<H: StateHandle> GatedStoredState<H> {
    pub fn is_ready(&self) -> bool {
        matches!(self, GatedStoredState::Ready(_))
    }
}

impl<H: StateHandle> StateHandle for GatedStoredState<H> {
    type State = H::State;

    fn get(&self) -> VersioningResult<H::State> {
        match self {
            GatedStoredState::Ready(handle) => handle.get(),
            GatedStoredState::NotReady(handle) => handle.get(),
        }
    }

    fn mutate<F, E>(&self, mutator: F) -> VersioningResult<()>
    where
        F: FnOnce(&mut H::State) -> Result<(), E>,
        E: Into<BoxError>,
    {
        match self {
            GatedStoredState::Ready(handle) => handle.mutate(mutator),
            GatedStoredState::NotReady(handle) => handle.mutate(mutator),
        }
    }

    fn end(&self) -> VersioningResult<()> {
        match self {
            GatedStoredState::Ready(handle) => handle.end(),
            GatedStoredState::NotReady(handle) => handle.end(),
        }
    }
}
