use bulkload_core::{Error, Result, Statement, Value};
use bulkload_store::DataStore;

/// Send `statement` with every parameter tuple as one batched call.
///
/// An empty batch sends nothing. Returns the rows the store reports affected.
pub async fn execute_batch<S>(
    store: &mut S,
    statement: &Statement,
    params: &[Vec<Value>],
) -> Result<u64>
where
    S: DataStore + ?Sized,
{
    if params.is_empty() {
        return Ok(0);
    }

    if let Some((index, tuple)) = params
        .iter()
        .enumerate()
        .find(|(_, tuple)| tuple.len() != statement.arity)
    {
        return Err(Error::Configuration(format!(
            "parameter tuple {index} has {} values, statement expects {}",
            tuple.len(),
            statement.arity
        )));
    }

    tracing::debug!(event = "batch_started", sql = %statement.sql, tuples = params.len());
    let affected = store.execute_many(statement, params).await?;
    tracing::debug!(event = "batch_finished", affected = affected);

    Ok(affected)
}

/// Commit unless the caller is managing a transaction. Returns whether it committed.
pub async fn commit_unless_managed<S>(store: &mut S) -> Result<bool>
where
    S: DataStore + ?Sized,
{
    if store.in_explicit_transaction() {
        tracing::debug!(event = "commit_deferred");
        return Ok(false);
    }
    store.commit().await?;
    tracing::debug!(event = "committed");
    Ok(true)
}

/// Undo an implicit transaction after a failed operation.
///
/// Caller-managed transactions are left alone. A failing rollback is logged
/// and the original error is kept.
pub(crate) async fn rollback_unless_managed<S>(store: &mut S, cause: &Error)
where
    S: DataStore + ?Sized,
{
    if store.in_explicit_transaction() {
        return;
    }
    if let Err(err) = store.rollback().await {
        tracing::warn!(event = "rollback_failed", error = %err, cause = %cause);
    }
}
