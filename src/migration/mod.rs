//! Schema migrations between versioned namespaces of one datastore.
//!
//! Records of each schema generation live under their own key prefix
//! (`/1/...`, `/2/...`). A migration step carries every record from one
//! prefix to the next, transforming it on the way; a chain of steps walks a
//! store from whatever version it holds to the version the program expects.
//!
//! # Architecture
//!
//! - [`validate`]: typed transforms and the inverse-type check for reversible
//!   steps.
//! - [`execute`]: the per-record engine that decodes, transforms, encodes and
//!   writes one namespace into another inside a single batch.
//! - [`builder`]: fluent construction of one [`Migration`].
//! - [`versioned`]: binds a migration to an `(old, new)` version pair and to
//!   concrete prefixes in the store.
//! - [`chain`]: walks a contiguous list of versioned migrations up or down to
//!   a target version and records the version reached.
//! - [`coordinator`]: runs the chain exactly once for any number of callers
//!   and answers readiness queries.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use netabase_versioning::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! fn add_seven(count: i64) -> Result<i64, std::convert::Infallible> {
//!     Ok(count + 7)
//! }
//!
//! let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
//! store.put(&Key::new("/1/apples"), &7i64.encode_record().unwrap()).unwrap();
//! store.put(&Key::new("/versions/current"), b"1").unwrap();
//!
//! let migrations = VersionedBuilderList::new(vec![
//!     VersionedBuilder::new(add_seven, "2").old_version("1"),
//! ])
//! .build()
//! .unwrap();
//!
//! let reached = migrate_to(
//!     &CancellationToken::new(),
//!     &store,
//!     &migrations,
//!     &VersioningConfig::new("2"),
//! )
//! .unwrap();
//! assert_eq!(reached, "2");
//!
//! let apples = store.get(&Key::new("/2/apples")).unwrap().unwrap();
//! assert_eq!(i64::decode_record(&apples).unwrap(), 14);
//! ```

pub mod builder;
pub mod chain;
pub mod coordinator;
pub mod execute;
pub mod validate;
pub mod versioned;

pub use builder::{Migration, MigrationBuilder};
pub use chain::{current_version, migrate_to};
pub use coordinator::MigrationCoordinator;
pub use execute::{MigrationFailure, execute};
pub use validate::{RecordTransform, TransformSignature, TypeInfo, TypedTransform, check_inverse};
pub use versioned::{
    VersionedBuilder, VersionedBuilderList, VersionedMigration, VersionedMigrationList,
    keys_for_version,
};

/// Which way a step moves records between its two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MigrationDirection {
    Up,
    Down,
}
