use std::collections::HashSet;

use bulkload_core::{Error, Field, KeyTuple, Record, Result, Schema, exists_statement, prepare};
use bulkload_store::DataStore;

/// Query which of the records' key-tuples already exist in the store.
pub async fn resolve_existing<S, R>(
    store: &mut S,
    schema: &Schema,
    key_fields: &[&Field],
    records: &mut [R],
) -> Result<HashSet<KeyTuple>>
where
    S: DataStore + ?Sized,
    R: Record,
{
    ensure_tuple_comparison(store)?;
    let keys = {
        let dialect = store.dialect();
        records
            .iter_mut()
            .map(|record| prepare(key_fields, record, dialect))
            .collect::<Result<Vec<_>>>()?
    };
    let (existing, _) = lookup_existing(store, schema, key_fields, &keys).await?;
    Ok(existing)
}

/// Fail early when the store cannot evaluate `(a, b) IN ((..), ..)`.
pub(crate) fn ensure_tuple_comparison<S>(store: &S) -> Result<()>
where
    S: DataStore + ?Sized,
{
    let dialect = store.dialect();
    if dialect.supports_tuple_comparison() {
        Ok(())
    } else {
        Err(Error::Store(format!(
            "{} does not support tuple comparison; upsert is unavailable",
            dialect.engine()
        )))
    }
}

/// Look up prepared key-tuples, chunked to the store's bind-parameter ceiling.
///
/// Returns the existing tuples and the number of round-trips made.
pub(crate) async fn lookup_existing<S>(
    store: &mut S,
    schema: &Schema,
    key_fields: &[&Field],
    keys: &[KeyTuple],
) -> Result<(HashSet<KeyTuple>, usize)>
where
    S: DataStore + ?Sized,
{
    let mut existing = HashSet::new();
    if keys.is_empty() {
        return Ok((existing, 0));
    }

    let width = key_fields.len();
    if width == 0 {
        return Err(Error::Configuration(
            "existence lookup needs at least one key field".to_string(),
        ));
    }
    let chunk_size = match store.dialect().max_bind_parameters() {
        Some(max) if max < width => {
            return Err(Error::Configuration(format!(
                "a key of {width} fields exceeds the store's limit of {max} bind parameters"
            )));
        }
        Some(max) => max / width,
        None => keys.len(),
    };

    let mut round_trips = 0;
    for chunk in keys.chunks(chunk_size) {
        let statement = exists_statement(store.dialect(), schema, key_fields, chunk.len())?;
        let params: Vec<_> = chunk.iter().flatten().cloned().collect();
        tracing::debug!(event = "lookup_started", sql = %statement.sql, tuples = chunk.len());
        let rows = store.fetch_all(&statement, &params).await?;
        round_trips += 1;
        existing.extend(rows);
    }

    Ok((existing, round_trips))
}
