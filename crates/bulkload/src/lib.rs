//! Public API surface for the bulkload library.
//!
//! Bulk insert, update and upsert of in-memory record batches against one
//! table, with one batched statement per step instead of per-row saves.

pub mod executor;
pub mod ops;
pub mod options;
pub mod resolver;

pub use executor::{commit_unless_managed, execute_batch};
pub use ops::{insert_many, update_many, upsert_many};
pub use options::{BulkReport, UpsertOptions};
pub use resolver::resolve_existing;

pub use bulkload_core::{
    Dialect, DynamicRecord, Error, ErrorKind, Field, FieldType, KeySet, Preparable, Record, Result,
    Schema, Value, dedupe, validate_schema,
};
pub use bulkload_store::{DataStore, MemoryStore, MemoryTable, PostgresStore, PostgresStoreOptions};
