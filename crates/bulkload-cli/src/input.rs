use std::fs;
use std::path::Path;

use bulkload::{DynamicRecord, Schema, validate_schema};

use crate::CliError;

/// Read and validate a TOML entity schema.
pub fn load_schema(path: &Path) -> Result<Schema, CliError> {
    let source = read(path)?;
    parse_schema(&source).map_err(|err| match err {
        CliError::InvalidInput(message) => {
            CliError::InvalidInput(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Read a JSON array of record objects.
pub fn load_records(path: &Path) -> Result<Vec<DynamicRecord>, CliError> {
    let source = read(path)?;
    parse_records(&source).map_err(|err| match err {
        CliError::InvalidInput(message) => {
            CliError::InvalidInput(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

pub fn parse_schema(source: &str) -> Result<Schema, CliError> {
    let schema: Schema =
        toml::from_str(source).map_err(|err| CliError::InvalidInput(err.to_string()))?;
    validate_schema(&schema)?;
    Ok(schema)
}

pub fn parse_records(source: &str) -> Result<Vec<DynamicRecord>, CliError> {
    let document: serde_json::Value =
        serde_json::from_str(source).map_err(|err| CliError::InvalidInput(err.to_string()))?;
    let serde_json::Value::Array(items) = document else {
        return Err(CliError::InvalidInput(
            "records must be a JSON array of objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            DynamicRecord::from_json(item).ok_or_else(|| {
                CliError::InvalidInput(format!("record {index} is not a JSON object"))
            })
        })
        .collect()
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
