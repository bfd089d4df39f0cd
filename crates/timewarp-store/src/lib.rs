mod error;
mod memory;
mod sql;
mod traits;

pub use error::{Error, Result};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use sql::{SqlStore, SqlStoreConfig};
pub use traits::SnapshotStore;
