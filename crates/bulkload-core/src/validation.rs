use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Validate internal consistency of an entity schema.
///
/// This checks:
/// - the table name and field list are non-empty
/// - field names and column names are unique
/// - the primary key names a declared field
/// - at least one field is writable
pub fn validate_schema(schema: &Schema) -> Result<()> {
    if schema.table.trim().is_empty() {
        return Err(Error::Configuration("schema has no table name".to_string()));
    }
    if schema.fields.is_empty() {
        return Err(Error::Configuration(format!(
            "schema `{}` declares no fields",
            schema.table
        )));
    }

    let mut names = BTreeSet::new();
    let mut columns = BTreeSet::new();
    for field in &schema.fields {
        if !names.insert(field.name.as_str()) {
            return Err(Error::Configuration(format!(
                "duplicate field name: {}.{}",
                schema.table, field.name
            )));
        }
        if !columns.insert(field.column()) {
            return Err(Error::Configuration(format!(
                "duplicate column name: {}.{}",
                schema.table,
                field.column()
            )));
        }
    }

    if schema.field(&schema.primary_key).is_none() {
        return Err(Error::Configuration(format!(
            "primary key `{}` is not a field of `{}`",
            schema.primary_key, schema.table
        )));
    }

    if schema.writable_fields().is_empty() {
        return Err(Error::Configuration(format!(
            "schema `{}` has no writable fields",
            schema.table
        )));
    }

    Ok(())
}
