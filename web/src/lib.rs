//! Axum integration for callstack execution contexts.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** a [`Callstack`] (method, path, query, body, user, correlation id)
//! 3. **Configure** it: permission gate, steps, response mode
//! 4. **Respond**: the stack drains LIFO and the reply is rendered through [`AxumSink`]
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, response::Response};
//! use callstack_core::{step, permission::authenticated};
//! use callstack_web::{Callstack, CallstackSettings, correlation_id_layer};
//!
//! async fn list_users(mut cs: Callstack) -> Response {
//!     cs.set_permission(authenticated());
//!     cs.push(step("list_users", |scope| Box::pin(async move {
//!         let (skip, take) = scope.pagination().window()?;
//!         Ok(Some(serde_json::json!([])))
//!     })));
//!     cs.respond().await
//! }
//!
//! let app = Router::new()
//!     .route("/api/users", get(list_users))
//!     .layer(correlation_id_layer())
//!     .with_state(CallstackSettings::default());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod responder;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{Callstack, CorrelationId, MALFORMED_BODY};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use responder::{AxumSink, ReplyResponse};
pub use state::CallstackSettings;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
