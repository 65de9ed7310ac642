//! Transaction boundary contract.
//!
//! The execution context does not know what a transaction is. It only needs
//! to open one before the first step, then commit it on success or roll it
//! back on failure. Providers (e.g. the PostgreSQL one) implement these
//! traits; steps reach the live handle through
//! [`RequestScope::transaction_mut`](crate::context::RequestScope::transaction_mut).
//!
//! Returns `BoxFuture` instead of async fn to be dyn-compatible (object-safe).

use futures::future::BoxFuture;
use std::any::Any;

/// Opens transactions.
pub trait TransactionProvider: Send + Sync {
    /// Open a new transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot start a transaction.
    fn begin(&self) -> BoxFuture<'_, anyhow::Result<Box<dyn Transaction>>>;
}

/// One open transaction. Consumed by either `commit` or `rollback`.
pub trait Transaction: Send {
    /// Make all work done in the transaction durable.
    ///
    /// # Errors
    ///
    /// Returns error if the commit fails; the work is then lost.
    fn commit(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>>;

    /// Discard all work done in the transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the rollback could not be confirmed.
    fn rollback(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>>;

    /// Access the concrete handle, for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
