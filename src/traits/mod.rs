pub mod codec;
pub mod datastore;
pub mod fsm;
pub mod object_store;
pub mod state;

pub use codec::{RecordDecode, RecordEncode};
pub use datastore::{Batch, Datastore};
pub use fsm::StateMachineGroup;
pub use object_store::{ObjectStore, StateHandle};
pub use state::MigrationState;
