//! Data store adapters for the bulk engine.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::{ExecutedStatement, MemoryStore, MemoryTable};
pub use postgres::{PostgresStore, PostgresStoreOptions};
pub use store::DataStore;
