pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryCache;
pub use sqlite::SqliteStore;
pub use store::{CachedStore, ResultStore, StoredResult};
