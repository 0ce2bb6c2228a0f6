use serde::{Deserialize, Serialize};

use bulkload_core::KeySet;

/// Options that control how upsert behaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertOptions {
    /// Fields identifying existing rows; defaults to the primary key.
    #[serde(default)]
    pub keys: KeySet,
    /// Only insert records whose key is absent; leave existing rows untouched.
    #[serde(default)]
    pub skip_update: bool,
}

impl UpsertOptions {
    pub fn keyed_by<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: KeySet::fields(names),
            skip_update: false,
        }
    }

    pub fn skip_update(mut self, skip: bool) -> Self {
        self.skip_update = skip;
        self
    }
}

/// Outcome counters for one bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Records sent in the insert batch.
    pub inserted: usize,
    /// Records sent in the update batch.
    pub updated: usize,
    /// Existing records left alone because of `skip_update`.
    pub skipped: usize,
    /// Earlier insert candidates dropped for sharing a key with a later one.
    pub duplicates: usize,
    /// Rows the store reported as affected by writes.
    pub affected: u64,
    /// Statements sent to the store, commits excluded.
    pub round_trips: usize,
}
