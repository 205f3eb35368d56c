//! Prelude module for convenient imports.
//!
//! ```rust
//! use netabase_versioning::prelude::*;
//! ```
//!
//! # What's Included
//!
//! - Keys and versions: [`Key`], [`VersionKey`], [`Query`]
//! - Store traits: [`Datastore`], [`Batch`], [`ObjectStore`],
//!   [`StateHandle`], [`StateMachineGroup`], [`MigrationState`]
//! - Record codecs: [`RecordEncode`], [`RecordDecode`]
//! - Backends: [`MemoryStore`], [`NamespacedStore`], [`StateStore`], and with
//!   the matching features [`SledStore`] and [`RedbStore`]
//! - Migrations: [`MigrationBuilder`], [`VersionedBuilder`],
//!   [`VersionedBuilderList`], [`migrate_to`], [`MigrationCoordinator`]
//! - Gated wrappers and the `new_versioned_*` factories
//! - Errors: [`VersioningError`], [`VersioningResult`]

pub use crate::config::{DEFAULT_VERSION_KEY, FileConfig, VersioningConfig};
pub use crate::error::{RecordError, RecordErrors, VersioningError, VersioningResult};
pub use crate::key::Key;
pub use crate::query::{Entry, Filter, KeyOp, Query};
pub use crate::version::VersionKey;

pub use crate::traits::{
    Batch, Datastore, MigrationState, ObjectStore, RecordDecode, RecordEncode, StateHandle,
    StateMachineGroup,
};

pub use crate::databases::{MemoryStore, NamespacedStore, StateStore, StoredState};
#[cfg(feature = "redb")]
pub use crate::databases::RedbStore;
#[cfg(feature = "sled")]
pub use crate::databases::SledStore;

pub use crate::migration::{
    Migration, MigrationBuilder, MigrationCoordinator, MigrationDirection, VersionedBuilder,
    VersionedBuilderList, VersionedMigration, VersionedMigrationList, current_version, migrate_to,
};

pub use crate::gated::{
    MigratedDatastore, MigratedStateMachineGroup, MigratedStateStore, new_versioned_datastore,
    new_versioned_state_machines, new_versioned_state_store,
};
