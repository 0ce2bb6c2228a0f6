use std::collections::BTreeMap;

use crate::error::Result;
use crate::value::Value;

/// An application value persisted through a [`Schema`](crate::Schema).
pub trait Record {
    /// Read the attribute backing the field with this logical name.
    ///
    /// `None` means the record does not carry the attribute; it is stored as NULL.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Expose the pre-persist capability, if the record has one.
    fn as_preparable(&mut self) -> Option<&mut dyn Preparable> {
        None
    }
}

/// Hook run on a record right before its values are extracted.
pub trait Preparable {
    fn pre_persist(&mut self) -> Result<()>;
}

/// Map-backed record for data that has no dedicated Rust type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: BTreeMap<String, Value>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Build a record from a JSON object; other JSON values are rejected.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self {
                values: map
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            }),
            _ => None,
        }
    }
}

impl Record for DynamicRecord {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

impl FromIterator<(String, Value)> for DynamicRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
