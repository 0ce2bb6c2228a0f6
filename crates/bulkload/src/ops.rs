//! Bulk insert, update and upsert over a single table.
//!
//! Every operation is a no-op on an empty batch, validates the schema, and
//! settles the store once: commit on success unless the caller manages the
//! transaction, roll back an implicit transaction on failure.

use std::time::Instant;

use bulkload_core::{
    Dialect, Field, KeySet, Record, Result, Schema, Statement, Value, dedupe, insert_statement,
    prepare, update_statement, validate_schema,
};
use bulkload_store::DataStore;

use crate::executor::{commit_unless_managed, execute_batch, rollback_unless_managed};
use crate::options::{BulkReport, UpsertOptions};
use crate::resolver::{ensure_tuple_comparison, lookup_existing};

/// Insert every record. Store-generated fields are left to the store.
pub async fn insert_many<S, R>(
    store: &mut S,
    schema: &Schema,
    records: &mut [R],
) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    if records.is_empty() {
        return Ok(BulkReport::default());
    }
    validate_schema(schema)?;

    let timer = Instant::now();
    tracing::info!(event = "insert_started", table = %schema.table, records = records.len());
    let outcome = insert_inner(store, schema, records).await;
    let report = settle(store, outcome).await?;
    tracing::info!(
        event = "insert_finished",
        table = %schema.table,
        inserted = report.inserted,
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(report)
}

/// Update the rows matching each record's key-tuple.
pub async fn update_many<S, R>(
    store: &mut S,
    schema: &Schema,
    records: &mut [R],
    keys: &KeySet,
) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    if records.is_empty() {
        return Ok(BulkReport::default());
    }
    validate_schema(schema)?;

    let timer = Instant::now();
    tracing::info!(event = "update_started", table = %schema.table, records = records.len());
    let outcome = update_inner(store, schema, records, keys).await;
    let report = settle(store, outcome).await?;
    tracing::info!(
        event = "update_finished",
        table = %schema.table,
        updated = report.updated,
        affected = report.affected,
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(report)
}

/// Update records whose key-tuple exists and insert the rest.
///
/// Insert candidates sharing a key-tuple collapse to the latest one in the
/// batch. Updates and inserts share one commit.
pub async fn upsert_many<S, R>(
    store: &mut S,
    schema: &Schema,
    records: &mut [R],
    options: &UpsertOptions,
) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    if records.is_empty() {
        return Ok(BulkReport::default());
    }
    validate_schema(schema)?;

    let timer = Instant::now();
    tracing::info!(
        event = "upsert_started",
        table = %schema.table,
        records = records.len(),
        skip_update = options.skip_update
    );
    let outcome = upsert_inner(store, schema, records, options).await;
    let report = settle(store, outcome).await?;
    tracing::info!(
        event = "upsert_finished",
        table = %schema.table,
        inserted = report.inserted,
        updated = report.updated,
        skipped = report.skipped,
        duplicates = report.duplicates,
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(report)
}

async fn insert_inner<S, R>(store: &mut S, schema: &Schema, records: &mut [R]) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    let (statement, params) = insert_batch(store.dialect(), schema, records.iter_mut().map(Ok))?;
    let mut report = BulkReport::default();
    send(store, &statement, &params, &mut report).await?;
    report.inserted = params.len();
    Ok(report)
}

async fn update_inner<S, R>(
    store: &mut S,
    schema: &Schema,
    records: &mut [R],
    keys: &KeySet,
) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    let key_fields = schema.key_fields(keys)?;
    let mut report = BulkReport::default();
    let total = records.len();
    match update_batch(store.dialect(), schema, &key_fields, records.iter_mut())? {
        Some((statement, params)) => {
            send(store, &statement, &params, &mut report).await?;
            report.updated = params.len();
        }
        None => {
            tracing::info!(
                event = "update_skipped",
                table = %schema.table,
                reason = "no value fields"
            );
            report.skipped = total;
        }
    }
    Ok(report)
}

async fn upsert_inner<S, R>(
    store: &mut S,
    schema: &Schema,
    records: &mut [R],
    options: &UpsertOptions,
) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
    R: Record,
{
    let key_fields = schema.key_fields(&options.keys)?;
    ensure_tuple_comparison(store)?;

    let keys = {
        let dialect = store.dialect();
        records
            .iter_mut()
            .map(|record| prepare(&key_fields, record, dialect))
            .collect::<Result<Vec<_>>>()?
    };
    let (existing, lookups) = lookup_existing(store, schema, &key_fields, &keys).await?;
    let mut report = BulkReport {
        round_trips: lookups,
        ..BulkReport::default()
    };

    let (present, absent): (Vec<_>, Vec<_>) = records
        .iter_mut()
        .zip(&keys)
        .partition(|(_, key)| existing.contains(*key));
    let present: Vec<&mut R> = present.into_iter().map(|(record, _)| record).collect();
    let absent: Vec<&mut R> = absent.into_iter().map(|(record, _)| record).collect();
    tracing::debug!(event = "upsert_partitioned", existing = present.len(), missing = absent.len());

    if options.skip_update {
        report.skipped = present.len();
    } else if !present.is_empty() {
        let total = present.len();
        match update_batch(store.dialect(), schema, &key_fields, present)? {
            Some((statement, params)) => {
                send(store, &statement, &params, &mut report).await?;
                report.updated = params.len();
            }
            None => {
                tracing::info!(
                    event = "update_skipped",
                    table = %schema.table,
                    reason = "no value fields"
                );
                report.skipped = total;
            }
        }
    }

    let (statement, params, duplicates) = {
        let dialect = store.dialect();
        let mut unique = dedupe(absent, &key_fields, dialect);
        let (statement, params) = insert_batch(dialect, schema, unique.by_ref())?;
        (statement, params, unique.dropped())
    };
    report.duplicates = duplicates;
    send(store, &statement, &params, &mut report).await?;
    report.inserted = params.len();

    Ok(report)
}

fn insert_batch<'a, R, I>(
    dialect: &dyn Dialect,
    schema: &Schema,
    records: I,
) -> Result<(Statement, Vec<Vec<Value>>)>
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = Result<&'a mut R>>,
{
    let statement = insert_statement(dialect, schema)?;
    let fields = schema.writable_fields();
    let params = records
        .into_iter()
        .map(|record| prepare(&fields, record?, dialect))
        .collect::<Result<Vec<_>>>()?;
    Ok((statement, params))
}

// Parameters are the SET values followed by the WHERE keys.
fn update_batch<'a, R, I>(
    dialect: &dyn Dialect,
    schema: &Schema,
    key_fields: &[&Field],
    records: I,
) -> Result<Option<(Statement, Vec<Vec<Value>>)>>
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a mut R>,
{
    let Some(statement) = update_statement(dialect, schema, key_fields) else {
        return Ok(None);
    };
    let param_fields: Vec<&Field> = schema
        .value_fields(key_fields)
        .into_iter()
        .chain(key_fields.iter().copied())
        .collect();
    let params = records
        .into_iter()
        .map(|record| prepare(&param_fields, record, dialect))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some((statement, params)))
}

async fn send<S>(
    store: &mut S,
    statement: &Statement,
    params: &[Vec<Value>],
    report: &mut BulkReport,
) -> Result<()>
where
    S: DataStore + ?Sized,
{
    if params.is_empty() {
        return Ok(());
    }
    report.affected += execute_batch(store, statement, params).await?;
    report.round_trips += 1;
    Ok(())
}

async fn settle<S>(store: &mut S, outcome: Result<BulkReport>) -> Result<BulkReport>
where
    S: DataStore + ?Sized,
{
    match outcome {
        Ok(report) => {
            commit_unless_managed(store).await?;
            Ok(report)
        }
        Err(err) => {
            tracing::warn!(event = "bulk_failed", error = %err);
            rollback_unless_managed(store, &err).await;
            Err(err)
        }
    }
}
