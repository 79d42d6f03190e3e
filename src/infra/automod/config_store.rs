// Implementations of the automod ConfigStore port.

pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemoryConfigStore;
pub use sqlite_store::SqliteConfigStore;
