use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::Value;

/// Custom value encoder for a field, bound to the target dialect.
pub type Encoder = Arc<dyn Fn(Value, &dyn Dialect) -> Result<Value> + Send + Sync>;

/// Table description for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Table name, optionally `schema.table`.
    pub table: String,
    /// Logical name of the primary key field.
    pub primary_key: String,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
}

/// Declared type of a field; drives the default encoder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Any,
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Date,
    Uuid,
    Json,
    Bytes,
}

/// One column-backed attribute of an entity.
#[derive(Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<String>,
    /// Filled by the store (serial, identity); never written by the engine.
    #[serde(default)]
    pub auto_generated: bool,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(skip)]
    encoder: Option<Encoder>,
}

/// Which fields identify a row for update and upsert matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySet {
    /// The schema's primary key.
    #[default]
    Primary,
    /// Explicit field names. Resolved in schema order, not list order.
    Fields(Vec<String>),
}

impl KeySet {
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeySet::Fields(names.into_iter().map(Into::into).collect())
    }
}

impl Field {
    /// A writable field whose column shares its name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column: None,
            auto_generated: false,
            field_type,
            encoder: None,
        }
    }

    /// A store-generated field (serial/identity), excluded from writes.
    pub fn auto(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            auto_generated: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Replace the default type coercion with a custom encoder.
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(Value, &dyn Dialect) -> Result<Value> + Send + Sync + 'static,
    {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Physical column name.
    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Convert a raw attribute value into a store-ready scalar.
    ///
    /// Timestamps are truncated to the precision the dialect stores, so a
    /// prepared key equals the value the store hands back.
    pub fn encode(&self, value: Value, dialect: &dyn Dialect) -> Result<Value> {
        let encoded = match &self.encoder {
            Some(encoder) => encoder(value, dialect)?,
            None => coerce(&self.name, self.field_type, value)?,
        };
        Ok(match (encoded, dialect.timestamp_precision()) {
            (Value::Timestamp(ts), Some(digits)) => Value::Timestamp(ts.trunc_subsecs(digits)),
            (encoded, _) => encoded,
        })
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column())
            .field("auto_generated", &self.auto_generated)
            .field("field_type", &self.field_type)
            .field("custom_encoder", &self.encoder.is_some())
            .finish()
    }
}

impl Schema {
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        fields: Vec<Field>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields the engine writes: everything not store-generated.
    pub fn writable_fields(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|field| !field.auto_generated)
            .collect()
    }

    /// Resolve a key set to fields, in schema declaration order.
    pub fn key_fields(&self, keys: &KeySet) -> Result<Vec<&Field>> {
        let names: Vec<&str> = match keys {
            KeySet::Primary => vec![self.primary_key.as_str()],
            KeySet::Fields(names) => names.iter().map(String::as_str).collect(),
        };

        if let Some(unknown) = names.iter().find(|name| self.field(name).is_none()) {
            return Err(Error::Configuration(format!(
                "key field `{unknown}` is not declared on `{}`",
                self.table
            )));
        }

        let resolved: Vec<&Field> = self
            .fields
            .iter()
            .filter(|field| names.contains(&field.name.as_str()))
            .collect();

        if resolved.is_empty() {
            return Err(Error::Configuration(format!(
                "empty key set for `{}`",
                self.table
            )));
        }
        Ok(resolved)
    }

    /// Writable fields that are not part of the key, in schema order.
    pub fn value_fields(&self, key_fields: &[&Field]) -> Vec<&Field> {
        self.writable_fields()
            .into_iter()
            .filter(|field| !key_fields.iter().any(|key| key.name == field.name))
            .collect()
    }
}

fn coerce(field: &str, field_type: FieldType, value: Value) -> Result<Value> {
    let mismatch = |value: &Value| {
        Error::encoding(
            field,
            format!("cannot store {} as {:?}", value.type_name(), field_type),
        )
    };

    let coerced = match (field_type, value) {
        (_, Value::Null) => Value::Null,
        (FieldType::Any, value) => value,
        (FieldType::Text, Value::Text(text)) => Value::Text(text),
        (FieldType::Integer, Value::Int(int)) => Value::Int(int),
        (FieldType::Integer, Value::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| Error::encoding(field, err.to_string()))?,
        (FieldType::Float, Value::Float(float)) => Value::Float(float),
        (FieldType::Float, Value::Int(int)) => Value::Float(int as f64),
        (FieldType::Boolean, Value::Bool(flag)) => Value::Bool(flag),
        (FieldType::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(ts),
        (FieldType::Timestamp, Value::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|err| Error::encoding(field, err.to_string()))?,
        (FieldType::Date, Value::Date(date)) => Value::Date(date),
        (FieldType::Date, Value::Text(text)) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|err| Error::encoding(field, err.to_string()))?,
        (FieldType::Uuid, Value::Uuid(uuid)) => Value::Uuid(uuid),
        (FieldType::Uuid, Value::Text(text)) => Uuid::parse_str(&text)
            .map(Value::Uuid)
            .map_err(|err| Error::encoding(field, err.to_string()))?,
        (FieldType::Json, Value::Json(json)) => Value::Json(json),
        (FieldType::Json, Value::Text(text)) => Value::Json(serde_json::Value::String(text)),
        (FieldType::Json, Value::Int(int)) => Value::Json(int.into()),
        (FieldType::Json, Value::Bool(flag)) => Value::Json(flag.into()),
        (FieldType::Json, Value::Float(float)) => Value::Json(float.into()),
        (FieldType::Bytes, Value::Bytes(bytes)) => Value::Bytes(bytes),
        (_, other) => return Err(mismatch(&other)),
    };
    Ok(coerced)
}
