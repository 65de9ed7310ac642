//! `sqlx`-backed implementation of the transaction contract.

use callstack_core::transaction::{Transaction, TransactionProvider};
use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool, Postgres};
use std::any::Any;
use thiserror::Error;

/// Errors from the `PostgreSQL` transaction provider.
#[derive(Error, Debug)]
pub enum PgTransactionError {
    /// Could not connect to the database.
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Could not start a transaction.
    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// Commit failed; the transaction's work is lost.
    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    /// Rollback could not be confirmed.
    #[error("Failed to roll back transaction: {0}")]
    Rollback(#[source] sqlx::Error),
}

/// Opens one `PostgreSQL` transaction per request.
#[derive(Clone, Debug)]
pub struct PgTransactionProvider {
    pool: PgPool,
}

impl PgTransactionProvider {
    /// Connect a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PgTransactionError::Connect`] if the pool cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, PgTransactionError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(PgTransactionError::Connect)?;
        Ok(Self::from_pool(pool))
    }

    /// Use an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for work outside a request transaction.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TransactionProvider for PgTransactionProvider {
    fn begin(&self) -> BoxFuture<'_, anyhow::Result<Box<dyn Transaction>>> {
        Box::pin(async move {
            let inner = self.pool.begin().await.map_err(PgTransactionError::Begin)?;
            tracing::debug!("Transaction started");
            Ok(Box::new(PgTransaction { inner }) as Box<dyn Transaction>)
        })
    }
}

/// An open `PostgreSQL` transaction.
#[derive(Debug)]
pub struct PgTransaction {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    /// Connection to run queries on, inside the transaction.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.inner
    }
}

impl Transaction for PgTransaction {
    fn commit(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>> {
        let inner = self.inner;
        Box::pin(async move {
            inner.commit().await.map_err(PgTransactionError::Commit)?;
            tracing::debug!("Transaction committed");
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>> {
        let inner = self.inner;
        Box::pin(async move {
            inner.rollback().await.map_err(PgTransactionError::Rollback)?;
            tracing::debug!("Transaction rolled back");
            Ok(())
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
