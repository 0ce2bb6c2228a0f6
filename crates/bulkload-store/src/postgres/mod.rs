use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use bulkload_core::{Dialect, Error, PostgresDialect, Result, Statement, Value};

use crate::store::DataStore;

mod bind;

/// Options used when opening a pool for [`PostgresStore::connect`].
#[derive(Debug, Clone)]
pub struct PostgresStoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PostgresStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Data store backed by a PostgreSQL pool.
///
/// Writes run inside a transaction opened on first use. Outside of
/// [`begin`](Self::begin) the engine commits it after each operation;
/// dropping the store with uncommitted work rolls it back.
pub struct PostgresStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    explicit: bool,
}

impl PostgresStore {
    /// Create a new store using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            explicit: false,
        }
    }

    /// Open a pool for `url` and wrap it.
    pub async fn connect(url: &str, options: PostgresStoreOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(url)
            .await
            .map_err(store_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Start a caller-managed transaction; bulk operations stop committing.
    pub async fn begin(&mut self) -> Result<()> {
        self.transaction().await?;
        self.explicit = true;
        Ok(())
    }

    /// Commit the caller-managed transaction.
    pub async fn commit_transaction(&mut self) -> Result<()> {
        self.explicit = false;
        self.finish_commit().await
    }

    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        if self.tx.is_none() {
            let tx = self.pool.begin().await.map_err(store_error)?;
            tracing::debug!(event = "transaction_opened");
            self.tx = Some(tx);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Store("transaction unavailable".to_string()))
    }

    async fn finish_commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(store_error)?;
            tracing::debug!(event = "transaction_committed");
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    fn dialect(&self) -> &dyn Dialect {
        &PostgresDialect
    }

    fn in_explicit_transaction(&self) -> bool {
        self.explicit
    }

    async fn execute_many(&mut self, statement: &Statement, params: &[Vec<Value>]) -> Result<u64> {
        let tx = self.transaction().await?;
        let mut affected = 0;
        for values in params {
            let query = bind::bind_all(sqlx::query(&statement.sql), values);
            let result = query.execute(&mut **tx).await.map_err(store_error)?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    async fn fetch_all(
        &mut self,
        statement: &Statement,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>> {
        let query = bind::bind_all(sqlx::query(&statement.sql), params);
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(store_error)?;

        rows.iter().map(bind::decode_row).collect()
    }

    async fn commit(&mut self) -> Result<()> {
        self.finish_commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.explicit = false;
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(store_error)?;
            tracing::debug!(event = "transaction_rolled_back");
        }
        Ok(())
    }
}

fn store_error(err: sqlx::Error) -> Error {
    Error::Store(err.to_string())
}
