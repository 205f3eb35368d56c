//! # Netabase Versioning
//!
//! Versioned key-value stores for Rust: ordered schema migrations between
//! namespaces of one datastore, and wrappers that refuse access until the
//! store has reached the version the program expects.
//!
//! ## Features
//!
//! - **Typed transforms**: migrations are plain functions from one record
//!   type to the next, decoded and encoded with bincode
//! - **Atomic steps**: each step writes its namespace in a single batch and
//!   cleans up the namespace it left behind
//! - **Reversible chains**: steps declared with an inverse can walk a store
//!   back down to an older version
//! - **Run once**: a coordinator runs the chain a single time no matter how
//!   many callers wait on it
//! - **Gated access**: datastore, object store and state machine wrappers
//!   fail fast until migrations succeed
//! - **Backends**: in-memory, sled and redb
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use netabase_versioning::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! fn double(count: i64) -> Result<i64, std::convert::Infallible> {
//!     Ok(count * 2)
//! }
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
//!     store.put(&Key::new("/1/apples"), &3i64.encode_record().unwrap()).unwrap();
//!     store.put(&Key::new("/versions/current"), b"1").unwrap();
//!
//!     let migrations = VersionedBuilderList::new(vec![
//!         VersionedBuilder::new(double, "2").old_version("1"),
//!     ])
//!     .build()
//!     .unwrap();
//!
//!     let (apples, coordinator) =
//!         new_versioned_state_store::<i64>(store, migrations, VersioningConfig::new("2"));
//!     coordinator.migrate(&CancellationToken::new()).await.unwrap();
//!
//!     assert_eq!(apples.get(Key::new("/apples")).get().unwrap(), 6);
//! });
//! ```

pub mod config;
pub mod databases;
pub mod error;
pub mod gated;
pub mod key;
pub mod migration;
pub mod prelude;
pub mod query;
pub mod traits;
pub mod version;

pub use config::{DEFAULT_VERSION_KEY, FileConfig, VersioningConfig};
pub use error::{RecordError, RecordErrors, VersioningError, VersioningResult};
pub use key::Key;
pub use version::VersionKey;
