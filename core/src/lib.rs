//! # Callstack Core
//!
//! Per-request execution control for HTTP handlers.
//!
//! A handler registers an ordered callstack of asynchronous steps, optionally
//! gates it behind a composable permission check, and asks the context for a
//! response. The context drains the steps one at a time (last pushed first),
//! threads a shared object store between them, and turns every outcome
//! (success, typed error, unclassified error, permission failure) into one
//! well-formed reply.
//!
//! ## Core Concepts
//!
//! - **Step**: one asynchronous unit of work ([`step::Step`])
//! - **Callstack**: the per-request LIFO list of pending steps
//! - **Permission**: a composable async access check ([`permission::Permission`])
//! - **Execution context**: all mutable state of one request ([`ExecutionContext`])
//! - **Responder**: terminal state → [`Reply`] → [`ResponseSink`]
//!
//! ## Request Flow
//!
//! ```text
//! request ──► ExecutionContext::new ──► push / set_permission / serializers
//!                                              │
//!                                   make_response(sink)
//!                                              │
//!                     ┌────────── permission gate ──────────┐
//!                     │ ok                                  │ denied
//!               pop, run, pop, run ...                      │
//!                     │ all ok           │ step failed      │
//!              success reply       rollback + failure reply ◄┘
//!                     │                  │
//!                     └──── DONE ────────┘──► sink
//! ```
//!
//! ## Example
//!
//! ```
//! use callstack_core::{CallstackConfig, ExecutionContext, Reply, RequestInfo};
//! use callstack_core::permission::authenticated;
//! use callstack_core::request::AuthenticatedUser;
//! use callstack_core::step::step;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let request = RequestInfo::new(http::Method::GET, "/me")
//!     .with_user(AuthenticatedUser::new("u1"));
//! let mut context = ExecutionContext::new(request, &CallstackConfig::default());
//!
//! context.set_permission(authenticated());
//! context.push(step("render", |scope| {
//!     Box::pin(async move {
//!         let user = scope.require_object("user")?.clone();
//!         Ok(Some(json!({ "me": user })))
//!     })
//! }));
//! context.push(step("load", |scope| {
//!     Box::pin(async move {
//!         let id = scope.request().user.as_ref().map(|user| user.id.clone());
//!         scope.add_or_update_object("user", json!(id));
//!         Ok(None)
//!     })
//! }));
//!
//! let completed = context.complete().await;
//! assert_eq!(
//!     completed.reply,
//!     Reply::Json(http::StatusCode::OK, json!({ "me": "u1" }))
//! );
//! # });
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod pagination;
pub mod permission;
pub mod request;
pub mod responder;
pub mod sequencer;
pub mod step;
pub mod transaction;

// Re-export key types for convenience
pub use config::{CallstackConfig, PaginationDefaults};
pub use context::{ExecutionContext, RequestScope};
pub use error::{ApiError, ContextError};
pub use event::{EventLog, EventName, ExecutionEvent};
pub use pagination::{PageResponse, PaginationRequest};
pub use permission::{BoxedPermission, Permission, PermissionExt};
pub use request::{AuthenticatedUser, RequestInfo};
pub use responder::{Completed, Reply, ResponseMode, ResponseSink};
pub use step::{Step, StepResult, step};
pub use transaction::{Transaction, TransactionProvider};
