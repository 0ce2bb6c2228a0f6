use std::collections::HashSet;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::prepare::prepare;
use crate::record::Record;
use crate::schema::Field;
use crate::value::KeyTuple;

/// Lazy filter keeping one record per key-tuple; the latest record wins.
///
/// Records are yielded in reverse batch order. Each record's key-tuple is
/// prepared (running its hook) as the scan reaches it.
pub struct Dedupe<'f, I> {
    records: I,
    key_fields: &'f [&'f Field],
    dialect: &'f dyn Dialect,
    seen: HashSet<KeyTuple>,
    dropped: usize,
}

/// Drop all but the last record for each key-tuple in `records`.
pub fn dedupe<'a, 'f, R, I>(
    records: I,
    key_fields: &'f [&'f Field],
    dialect: &'f dyn Dialect,
) -> Dedupe<'f, std::iter::Rev<I::IntoIter>>
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a mut R>,
    I::IntoIter: DoubleEndedIterator,
{
    Dedupe {
        records: records.into_iter().rev(),
        key_fields,
        dialect,
        seen: HashSet::new(),
        dropped: 0,
    }
}

impl<I> Dedupe<'_, I> {
    /// Number of earlier duplicates skipped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<'a, R, I> Iterator for Dedupe<'_, I>
where
    R: Record + ?Sized + 'a,
    I: Iterator<Item = &'a mut R>,
{
    type Item = Result<&'a mut R>;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.records.by_ref() {
            let key = match prepare(self.key_fields, record, self.dialect) {
                Ok(key) => key,
                Err(err) => return Some(Err(err)),
            };
            if self.seen.insert(key) {
                return Some(Ok(record));
            }
            self.dropped += 1;
        }
        None
    }
}
