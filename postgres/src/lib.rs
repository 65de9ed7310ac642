//! `PostgreSQL` transaction provider for callstack execution contexts.
//!
//! Attach a [`PgTransactionProvider`] to a context and every request runs
//! inside one `PostgreSQL` transaction: committed when the response is a
//! success, rolled back otherwise. Steps reach the open transaction through
//! `RequestScope::transaction_mut::<PgTransaction>()`.
//!
//! # Example
//!
//! ```ignore
//! use callstack_postgres::{PgTransaction, PgTransactionProvider};
//!
//! let provider = Arc::new(PgTransactionProvider::connect("postgres://localhost/app").await?);
//! let mut context = ExecutionContext::new(request, &config).with_transactions(provider);
//!
//! context.push(step("insert_user", |scope| Box::pin(async move {
//!     let tx = scope
//!         .transaction_mut::<PgTransaction>()
//!         .ok_or_else(|| anyhow::anyhow!("no transaction"))?;
//!     sqlx::query("INSERT INTO users (email) VALUES ($1)")
//!         .bind("a@b.c")
//!         .execute(tx.connection())
//!         .await?;
//!     Ok(None)
//! })));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod transaction;

pub use transaction::{PgTransaction, PgTransactionError, PgTransactionProvider};
