//! Per-request execution context.
//!
//! One [`ExecutionContext`] is built per inbound request and consumed by
//! [`ExecutionContext::make_response`]. It owns:
//!
//! - the callstack of pending [`Step`]s (LIFO: the last pushed step runs first),
//! - an optional permission gate,
//! - the [`RequestScope`] steps work against: the request, the shared object
//!   store, pagination, response shaping and the open transaction,
//! - the [`EventLog`] and the last produced value.
//!
//! The context derefs to its [`RequestScope`], so handler code calls store and
//! serializer operations directly on the context.
//!
//! # Example
//!
//! ```
//! use callstack_core::{CallstackConfig, ExecutionContext, RequestInfo};
//! use callstack_core::step::ValueStep;
//! use serde_json::json;
//!
//! let mut context = ExecutionContext::new(
//!     RequestInfo::new(http::Method::GET, "/users"),
//!     &CallstackConfig::default(),
//! );
//! context.push(ValueStep::new("list", Some(json!([]))));
//! context.add_or_update_object("tenant", json!("acme"));
//! assert!(context.contains_key("tenant"));
//! assert_eq!(context.pending_steps(), 1);
//! ```

use crate::config::CallstackConfig;
use crate::error::ContextError;
use crate::event::EventLog;
use crate::pagination::{PageResponse, PaginationRequest};
use crate::permission::{BoxedPermission, Permission};
use crate::request::RequestInfo;
use crate::responder::ResponseMode;
use crate::step::Step;
use crate::transaction::{Transaction, TransactionProvider};
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Marker logged instead of the body when body logging is disabled.
pub const REDACTED: &str = "<redacted>";

/// Everything a running step may read or change.
pub struct RequestScope {
    request: RequestInfo,
    store: BTreeMap<String, Value>,
    pagination: PaginationRequest,
    page_response: Option<PageResponse>,
    response_mode: Option<ResponseMode>,
    pub(crate) transaction: Option<Box<dyn Transaction>>,
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("request", &self.request)
            .field("store", &self.store)
            .field("pagination", &self.pagination)
            .field("page_response", &self.page_response)
            .field("response_mode", &self.response_mode)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl RequestScope {
    fn new(request: RequestInfo, config: &CallstackConfig) -> Self {
        let pagination = PaginationRequest::from_query(&request.query, &config.pagination);
        Self {
            request,
            store: BTreeMap::new(),
            pagination,
            page_response: None,
            response_mode: None,
            transaction: None,
        }
    }

    /// The inbound request.
    #[must_use]
    pub const fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Pagination derived from the query string.
    #[must_use]
    pub const fn pagination(&self) -> &PaginationRequest {
        &self.pagination
    }

    /// Insert or replace a shared object.
    pub fn add_or_update_object(&mut self, key: impl Into<String>, value: Value) {
        self.store.insert(key.into(), value);
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::InvalidObject` if `value` cannot be serialized.
    pub fn add_or_update_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), ContextError> {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.store.insert(key, value);
                Ok(())
            }
            Err(source) => Err(ContextError::InvalidObject { key, source }),
        }
    }

    /// A shared object, or `None` if it was never stored.
    #[must_use]
    pub fn get_object(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// A shared object that must exist.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingObject` if `key` was never stored.
    pub fn require_object(&self, key: &str) -> Result<&Value, ContextError> {
        self.store.get(key).ok_or_else(|| ContextError::MissingObject {
            key: key.to_string(),
        })
    }

    /// A shared object that must exist, deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingObject` if `key` was never stored, or
    /// `ContextError::InvalidObject` if it does not fit `T`.
    pub fn get_object_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        let value = self.require_object(key)?;
        T::deserialize(value).map_err(|source| ContextError::InvalidObject {
            key: key.to_string(),
            source,
        })
    }

    /// Whether `key` is in the store.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// Remove a shared object, returning it.
    pub fn remove_object(&mut self, key: &str) -> Option<Value> {
        self.store.remove(key)
    }

    /// The whole shared store.
    #[must_use]
    pub const fn objects(&self) -> &BTreeMap<String, Value> {
        &self.store
    }

    /// Attach page metadata; the success body becomes
    /// `{ ...page, results: <result> }`.
    pub fn set_page_response_object(&mut self, page: impl Into<PageResponse>) {
        self.page_response = Some(page.into());
    }

    /// Page metadata, if a step supplied it.
    #[must_use]
    pub const fn page_response(&self) -> Option<&PageResponse> {
        self.page_response.as_ref()
    }

    /// Send the result as JSON with `status` instead of 200.
    pub fn set_status(&mut self, status: StatusCode) {
        self.set_response_mode(ResponseMode::Status(status));
    }

    /// Send `204 No Content` without a body.
    pub fn empty_response_serializer(&mut self) {
        self.set_response_mode(ResponseMode::Empty(StatusCode::NO_CONTENT));
    }

    /// Send `200 OK` without a body.
    pub fn successful_response_serializer(&mut self) {
        self.set_response_mode(ResponseMode::Empty(StatusCode::OK));
    }

    /// Send `201 Created` without a body.
    pub fn created_serializer(&mut self) {
        self.set_response_mode(ResponseMode::Empty(StatusCode::CREATED));
    }

    /// The response mode in effect.
    #[must_use]
    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode.unwrap_or_default()
    }

    fn set_response_mode(&mut self, mode: ResponseMode) {
        if let Some(previous) = self.response_mode {
            tracing::warn!(?previous, next = ?mode, "Response mode set more than once, last one wins");
        }
        self.response_mode = Some(mode);
    }

    pub(crate) fn into_objects(self) -> BTreeMap<String, Value> {
        self.store
    }

    /// Whether a transaction is open for this request.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// The open transaction as its concrete type.
    ///
    /// Returns `None` when there is no transaction or it is of another type.
    pub fn transaction_mut<T: Transaction + 'static>(&mut self) -> Option<&mut T> {
        self.transaction
            .as_mut()
            .and_then(|transaction| transaction.as_any_mut().downcast_mut::<T>())
    }
}

/// The per-request execution controller.
pub struct ExecutionContext {
    pub(crate) scope: RequestScope,
    pub(crate) callstack: Vec<Box<dyn Step>>,
    pub(crate) permission: Option<BoxedPermission>,
    pub(crate) events: EventLog,
    pub(crate) result: Option<Value>,
    pub(crate) transactions: Option<Arc<dyn TransactionProvider>>,
    pub(crate) log_request_body: bool,
    pub(crate) span: tracing::Span,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("scope", &self.scope)
            .field("pending_steps", &self.callstack.len())
            .field("gated", &self.permission.is_some())
            .field("events", &self.events.len())
            .field("transactional", &self.transactions.is_some())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Build the context for one request.
    ///
    /// Derives pagination from the query string and logs the request. Never
    /// fails: malformed pagination values are kept as given.
    #[must_use]
    pub fn new(request: RequestInfo, config: &CallstackConfig) -> Self {
        let span = tracing::info_span!(
            "callstack",
            method = %request.method,
            path = %request.path,
            correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
        );

        let context = Self {
            scope: RequestScope::new(request, config),
            callstack: Vec::new(),
            permission: None,
            events: EventLog::new(),
            result: None,
            transactions: None,
            log_request_body: config.log_request_body,
            span,
        };

        span_scoped(&context.span, || {
            let request = context.scope.request();
            tracing::info!(
                method = %request.method,
                path = %request.path,
                query = ?request.query,
                body = %context.loggable_body(),
                "Request received"
            );
        });

        context
    }

    /// Run the whole response cycle inside a transaction from `provider`.
    #[must_use]
    pub fn with_transactions(mut self, provider: Arc<dyn TransactionProvider>) -> Self {
        self.transactions = Some(provider);
        self
    }

    /// Push a step. The last pushed step runs first.
    pub fn push<S: Step + 'static>(&mut self, step: S) {
        self.callstack.push(Box::new(step));
    }

    /// Push an already boxed step.
    pub fn push_boxed(&mut self, step: Box<dyn Step>) {
        self.callstack.push(step);
    }

    /// Gate execution behind `permission`. Replaces any previous gate.
    pub fn set_permission<P: Permission + 'static>(&mut self, permission: P) {
        self.permission = Some(Arc::new(permission));
    }

    /// Gate execution behind an already shared permission.
    pub fn set_boxed_permission(&mut self, permission: BoxedPermission) {
        self.permission = Some(permission);
    }

    /// Number of steps not yet run.
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.callstack.len()
    }

    /// Whether a permission gate is set.
    #[must_use]
    pub const fn is_gated(&self) -> bool {
        self.permission.is_some()
    }

    /// Events recorded so far.
    #[must_use]
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// The last value a step produced.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The request span all records of this context are emitted in.
    #[must_use]
    pub const fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub(crate) fn loggable_body(&self) -> String {
        if self.log_request_body {
            self.scope.request().body.to_string()
        } else {
            REDACTED.to_string()
        }
    }
}

impl Deref for ExecutionContext {
    type Target = RequestScope;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}

impl DerefMut for ExecutionContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.scope
    }
}

fn span_scoped<R>(span: &tracing::Span, f: impl FnOnce() -> R) -> R {
    let _entered = span.enter();
    f()
}
