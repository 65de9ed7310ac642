//! Mock transaction provider.
//!
//! Every transaction the provider opens reports how it ended into a shared
//! log, so tests can assert commit/rollback after the context is consumed.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned test locks

use callstack_core::transaction::{Transaction, TransactionProvider};
use futures::future::BoxFuture;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How a mock transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Still open (or dropped without commit/rollback).
    Open,
    /// `commit` was called.
    Committed,
    /// `rollback` was called.
    RolledBack,
}

/// In-memory [`TransactionProvider`].
///
/// # Example
///
/// ```
/// use callstack_testing::{MockTransactionProvider, TransactionOutcome};
/// use callstack_core::transaction::TransactionProvider;
///
/// # tokio_test::block_on(async {
/// let provider = MockTransactionProvider::new();
/// let transaction = provider.begin().await.unwrap();
/// transaction.rollback().await.unwrap();
/// assert_eq!(provider.outcomes(), vec![TransactionOutcome::RolledBack]);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransactionProvider {
    outcomes: Arc<Mutex<Vec<TransactionOutcome>>>,
    fail_begin: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl MockTransactionProvider {
    /// Create a provider that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `begin` fail.
    #[must_use]
    pub fn failing_begin(self) -> Self {
        self.fail_begin.store(true, Ordering::SeqCst);
        self
    }

    /// Make every subsequent `commit` fail.
    #[must_use]
    pub fn failing_commit(self) -> Self {
        self.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    /// Outcome of every transaction opened so far, in opening order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<TransactionOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    /// Number of transactions opened.
    #[must_use]
    pub fn begun(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }
}

impl TransactionProvider for MockTransactionProvider {
    fn begin(&self) -> BoxFuture<'_, anyhow::Result<Box<dyn Transaction>>> {
        Box::pin(async move {
            if self.fail_begin.load(Ordering::SeqCst) {
                anyhow::bail!("mock: begin failed");
            }

            let mut outcomes = self.outcomes.lock().unwrap();
            outcomes.push(TransactionOutcome::Open);
            let transaction: Box<dyn Transaction> = Box::new(MockTransaction {
                index: outcomes.len() - 1,
                outcomes: Arc::clone(&self.outcomes),
                fail_commit: self.fail_commit.load(Ordering::SeqCst),
                writes: Vec::new(),
            });
            Ok(transaction)
        })
    }
}

/// A transaction opened by [`MockTransactionProvider`].
///
/// Steps can reach it through `RequestScope::transaction_mut::<MockTransaction>()`
/// and record pretend writes.
#[derive(Debug)]
pub struct MockTransaction {
    index: usize,
    outcomes: Arc<Mutex<Vec<TransactionOutcome>>>,
    fail_commit: bool,
    writes: Vec<String>,
}

impl MockTransaction {
    /// Record a pretend write.
    pub fn write(&mut self, statement: impl Into<String>) {
        self.writes.push(statement.into());
    }

    /// Writes recorded so far.
    #[must_use]
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    fn settle(&self, outcome: TransactionOutcome) {
        self.outcomes.lock().unwrap()[self.index] = outcome;
    }
}

impl Transaction for MockTransaction {
    fn commit(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            if self.fail_commit {
                anyhow::bail!("mock: commit failed");
            }
            self.settle(TransactionOutcome::Committed);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            self.settle(TransactionOutcome::RolledBack);
            Ok(())
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
