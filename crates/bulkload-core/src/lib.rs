//! Core contracts and helpers for bulkload.
//!
//! This crate defines the entity schema, record and value types, the SQL
//! dialect contract, and the pure pieces of the bulk pipeline: value
//! preparation, statement building and key deduplication.

pub mod dedupe;
pub mod dialect;
pub mod error;
pub mod prepare;
pub mod record;
pub mod schema;
pub mod sql;
pub mod validation;
pub mod value;

pub use dedupe::{Dedupe, dedupe};
pub use dialect::{Dialect, GenericDialect, PostgresDialect};
pub use error::{Error, ErrorKind, Result};
pub use prepare::prepare;
pub use record::{DynamicRecord, Preparable, Record};
pub use schema::{Encoder, Field, FieldType, KeySet, Schema};
pub use sql::{Statement, StatementKind, exists_statement, insert_statement, update_statement};
pub use validation::validate_schema;
pub use value::{KeyTuple, Value};
