pub mod memory_store;
pub mod namespace;
pub mod state_store;

#[cfg(feature = "sled")]
pub mod sled_store;

#[cfg(feature = "redb")]
pub mod redb_store;

pub use memory_store::MemoryStore;
pub use namespace::NamespacedStore;
pub use state_store::{StateStore, StoredState};

#[cfg(feature = "sled")]
pub use sled_store::SledStore;

#[cfg(feature = "redb")]
pub use redb_store::RedbStore;
