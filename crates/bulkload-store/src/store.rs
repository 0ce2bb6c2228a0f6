use async_trait::async_trait;

use bulkload_core::{Dialect, Result, Statement, Value};

/// Connection-level operations the bulk engine needs from a data store.
#[async_trait]
pub trait DataStore: Send {
    /// SQL flavour used to render statements for this store.
    fn dialect(&self) -> &dyn Dialect;

    /// True while the caller manages the transaction; the engine never commits then.
    fn in_explicit_transaction(&self) -> bool;

    /// Execute `statement` once per parameter tuple and return affected rows.
    async fn execute_many(&mut self, statement: &Statement, params: &[Vec<Value>]) -> Result<u64>;

    /// Execute a query and return every row as an ordered tuple of values.
    async fn fetch_all(
        &mut self,
        statement: &Statement,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>>;

    /// Commit pending work on the store.
    async fn commit(&mut self) -> Result<()>;

    /// Discard work since the last commit and leave any caller-managed transaction.
    async fn rollback(&mut self) -> Result<()>;
}

