//! # Callstack Testing
//!
//! Testing utilities for code built on `callstack-core`.
//!
//! This crate provides:
//! - [`MockTransactionProvider`]: records begin/commit/rollback, can be told to fail
//! - [`RecordingSink`]: a response sink that hands back what it was sent
//! - Request builders and a tracing subscriber for tests
//!
//! ## Example
//!
//! ```
//! use callstack_core::{CallstackConfig, ExecutionContext};
//! use callstack_core::step::ValueStep;
//! use callstack_testing::{get, RecordingSink};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut context = ExecutionContext::new(get("/ping"), &CallstackConfig::default());
//! context.push(ValueStep::new("pong", Some(json!("pong"))));
//!
//! let response = context.make_response(RecordingSink).await;
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, Some(json!("pong")));
//! # });
//! ```

pub mod mocks;
pub mod sink;

use callstack_core::request::{AuthenticatedUser, RequestInfo};

/// Test helpers.
pub mod helpers {
    use super::{AuthenticatedUser, RequestInfo};

    /// A `GET` request to `path`.
    #[must_use]
    pub fn get(path: &str) -> RequestInfo {
        RequestInfo::new(http::Method::GET, path)
    }

    /// A `POST` request to `path` with a JSON body.
    #[must_use]
    pub fn post(path: &str, body: serde_json::Value) -> RequestInfo {
        RequestInfo::new(http::Method::POST, path).with_body(body)
    }

    /// A user with the given id and roles.
    #[must_use]
    pub fn user(id: &str, roles: &[&str]) -> AuthenticatedUser {
        roles
            .iter()
            .fold(AuthenticatedUser::new(id), |user, role| user.with_role(*role))
    }

    /// Install a test-friendly tracing subscriber.
    ///
    /// Output is captured by the test harness. Safe to call from every test:
    /// only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::{get, init_tracing, post, user};
pub use mocks::{MockTransaction, MockTransactionProvider, TransactionOutcome};
pub use sink::{RecordedResponse, RecordingSink};
