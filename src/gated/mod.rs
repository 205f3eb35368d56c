//! Wrappers that hold callers off a store until it reaches its target
//! version.
//!
//! Each wrapper checks a shared [`Gate`] before forwarding a call. Until the
//! coordinator behind the gate reports success, every call returns the
//! readiness error without reaching the wrapped store.
//!
//! The `new_versioned_*` factories wire the usual setup: the wrapped store
//! is a view of the target version's namespace, and the returned coordinator
//! runs the migrations that bring the store there.
//!
//! ```
//! use std::sync::Arc;
//! use netabase_versioning::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
//!     let (versioned, coordinator) = new_versioned_datastore(
//!         store,
//!         VersionedMigrationList::default(),
//!         VersioningConfig::new("1"),
//!     );
//!     assert!(versioned.get(&Key::new("/apples")).unwrap_err().is_not_ready());
//!
//!     coordinator.migrate(&CancellationToken::new()).await.unwrap();
//!     versioned.put(&Key::new("/apples"), b"ripe").unwrap();
//! });
//! ```

pub mod datastore;
pub mod fsm;
pub mod gate;
pub mod state_store;

use std::sync::Arc;

use crate::config::VersioningConfig;
use crate::databases::{NamespacedStore, StateStore};
use crate::error::VersioningResult;
use crate::migration::{MigrationCoordinator, VersionedMigrationList};
use crate::traits::codec::{RecordDecode, RecordEncode};
use crate::traits::datastore::Datastore;
use crate::traits::fsm::StateMachineGroup;

pub use datastore::MigratedDatastore;
pub use fsm::MigratedStateMachineGroup;
pub use gate::{Gate, GatedStoredState, NotReadyStoredState};
pub use state_store::MigratedStateStore;

fn coordinate(
    store: Arc<dyn Datastore>,
    migrations: VersionedMigrationList,
    config: VersioningConfig,
) -> (NamespacedStore, Gate, Arc<MigrationCoordinator>) {
    let view = NamespacedStore::new(Arc::clone(&store), config.target.namespace());
    let coordinator = Arc::new(MigrationCoordinator::new(store, migrations, config));
    let gate = Gate::new(coordinator.clone());
    (view, gate, coordinator)
}

/// A datastore scoped to the target version, usable once the returned
/// coordinator has migrated `store`.
pub fn new_versioned_datastore(
    store: Arc<dyn Datastore>,
    migrations: VersionedMigrationList,
    config: VersioningConfig,
) -> (MigratedDatastore<NamespacedStore>, Arc<MigrationCoordinator>) {
    let (view, gate, coordinator) = coordinate(store, migrations, config);
    (MigratedDatastore::new(view, gate), coordinator)
}

/// A [`StateStore`] of `S` values scoped to the target version, usable once
/// the returned coordinator has migrated `store`.
pub fn new_versioned_state_store<S>(
    store: Arc<dyn Datastore>,
    migrations: VersionedMigrationList,
    config: VersioningConfig,
) -> (MigratedStateStore<StateStore<S>>, Arc<MigrationCoordinator>)
where
    S: RecordDecode + RecordEncode + Send,
{
    let (view, gate, coordinator) = coordinate(store, migrations, config);
    let states = StateStore::new(Arc::new(view));
    (MigratedStateStore::new(states, gate), coordinator)
}

/// A state machine group built by `make_group` over the target version's
/// namespace, usable once the returned coordinator has migrated `store`.
pub fn new_versioned_state_machines<G, F>(
    store: Arc<dyn Datastore>,
    migrations: VersionedMigrationList,
    config: VersioningConfig,
    make_group: F,
) -> VersioningResult<(MigratedStateMachineGroup<G>, Arc<MigrationCoordinator>)>
where
    G: StateMachineGroup,
    F: FnOnce(NamespacedStore) -> VersioningResult<G>,
{
    let (view, gate, coordinator) = coordinate(store, migrations, config);
    let group = make_group(view)?;
    Ok((MigratedStateMachineGroup::new(group, gate), coordinator))
}
