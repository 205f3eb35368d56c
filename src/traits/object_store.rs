//! Per-key object stores and the handles they hand out.

use crate::error::{BoxError, VersioningResult};

/// Access to one tracked object.
///
/// Obtaining a handle never fails; errors surface when it is used.
pub trait StateHandle: Send {
    type State;

    fn get(&self) -> VersioningResult<Self::State>;

    /// Load the state, let `mutator` change it and store the result.
    fn mutate<F, E>(&self, mutator: F) -> VersioningResult<()>
    where
        F: FnOnce(&mut Self::State) -> Result<(), E>,
        E: Into<BoxError>;

    /// Stop tracking the object.
    fn end(&self) -> VersioningResult<()>;
}

/// A store of objects of one type, each tracked under its own id.
pub trait ObjectStore: Send + Sync {
    type Id;
    type State;
    type Handle: StateHandle<State = Self::State>;

    /// Start tracking `id`. Fails if it is already tracked.
    fn begin(&self, id: Self::Id, state: Self::State) -> VersioningResult<()>;

    fn get(&self, id: Self::Id) -> Self::Handle;

    fn has(&self, id: Self::Id) -> VersioningResult<bool>;

    fn list(&self) -> VersioningResult<Vec<Self::State>>;
}
