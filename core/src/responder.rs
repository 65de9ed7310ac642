//! Response shaping.
//!
//! The responder turns the terminal state of an [`ExecutionContext`] into a
//! [`Reply`] and hands it to a [`ResponseSink`] exactly once.
//!
//! # Success
//!
//! | Response mode | Result | Reply |
//! |---|---|---|
//! | `Empty(s)` | any | status `s`, no body |
//! | `Default` / `Status(s)` | none | status `200` / `s`, no body |
//! | `Default` / `Status(s)` | value | status `200` / `s`, body = value, or `{ ...page, results: value }` |
//!
//! # Failure
//!
//! Status comes from the typed error (500 when untyped) and the body is
//! `{ "Error": <public message> }`. The full state is logged first.
//!
//! # Transactions
//!
//! With a [`TransactionProvider`](crate::transaction::TransactionProvider)
//! attached, the drain and success shaping run inside one transaction: it is
//! committed before a success reply is released and rolled back on failure.
//! A failed commit is reported through the failure path.

use crate::context::ExecutionContext;
use crate::error::classify;
use crate::event::{EventLog, EventName};
use crate::transaction::TransactionProvider;
use http::StatusCode;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::Instrument;

/// Key of the error message in failure bodies.
pub const ERROR_KEY: &str = "Error";

/// How a successful result is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// JSON body with status 200.
    #[default]
    Default,
    /// JSON body with a custom status.
    Status(StatusCode),
    /// No body, just the status.
    Empty(StatusCode),
}

impl ResponseMode {
    /// Status used for a successful result.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Default => StatusCode::OK,
            Self::Status(status) | Self::Empty(status) => status,
        }
    }
}

/// A framework-neutral outbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line only.
    Empty(StatusCode),
    /// Status plus JSON body.
    Json(StatusCode, Value),
}

impl Reply {
    /// Status of the reply.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Empty(status) | Self::Json(status, _) => *status,
        }
    }

    /// Body of the reply, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Empty(_) => None,
            Self::Json(_, body) => Some(body),
        }
    }

    /// Hand the reply to `sink`.
    pub fn send<S: ResponseSink>(self, sink: S) -> S::Output {
        match self {
            Self::Empty(status) => sink.send_empty(status),
            Self::Json(status, body) => sink.send_json(status, body),
        }
    }
}

/// Where replies go. Each method consumes the sink, so a sink sends once.
pub trait ResponseSink {
    /// What sending produces (e.g. a framework response value).
    type Output;

    /// Set `status` and send no body.
    fn send_empty(self, status: StatusCode) -> Self::Output;

    /// Set `status` and send `body` as JSON.
    fn send_json(self, status: StatusCode, body: Value) -> Self::Output;
}

/// Terminal state of a request after the responder ran.
#[derive(Debug)]
pub struct Completed {
    /// What is sent to the caller.
    pub reply: Reply,
    /// Every event, ending with DONE.
    pub events: EventLog,
    /// The shared store as the last step left it.
    pub objects: BTreeMap<String, Value>,
    /// The last produced value.
    pub result: Option<Value>,
    /// The failure, if the request failed.
    pub error: Option<anyhow::Error>,
}

impl Completed {
    /// Whether the request succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl ExecutionContext {
    /// Drain the callstack and send the outcome to `sink`.
    pub async fn make_response<S: ResponseSink>(self, sink: S) -> S::Output {
        self.complete().await.reply.send(sink)
    }

    /// Drain the callstack and shape the outcome, without sending it.
    pub async fn complete(mut self) -> Completed {
        let span = self.span.clone();
        async move {
            let outcome = match self.transactions.clone() {
                Some(provider) => self.drain_in_transaction(provider.as_ref()).await,
                None => self.drain().await.map(|()| self.success_reply()),
            };

            match outcome {
                Ok(reply) => {
                    self.events.record(EventName::Done, json!({ "status": reply.status().as_u16() }));
                    tracing::info!(
                        status = reply.status().as_u16(),
                        events = self.events.len(),
                        "Response sent"
                    );
                    self.finish(reply, None)
                }
                Err(error) => {
                    let reply = self.failure_reply(&error);
                    self.finish(reply, Some(error))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drain_in_transaction(
        &mut self,
        provider: &dyn TransactionProvider,
    ) -> anyhow::Result<Reply> {
        self.scope.transaction = Some(provider.begin().await?);
        tracing::debug!("Transaction opened");

        match self.drain().await {
            Ok(()) => {
                let reply = self.success_reply();
                if let Some(transaction) = self.scope.transaction.take() {
                    transaction.commit().await?;
                    tracing::debug!("Transaction committed");
                }
                Ok(reply)
            }
            Err(error) => {
                if let Some(transaction) = self.scope.transaction.take() {
                    match transaction.rollback().await {
                        Ok(()) => tracing::debug!("Transaction rolled back"),
                        Err(rollback_error) => {
                            tracing::error!(error = %rollback_error, "Transaction rollback failed");
                        }
                    }
                }
                Err(error)
            }
        }
    }

    fn success_reply(&self) -> Reply {
        let mode = self.scope.response_mode();
        match (mode, &self.result) {
            (ResponseMode::Empty(status), _) => Reply::Empty(status),
            (mode, None) => Reply::Empty(mode.status()),
            (mode, Some(value)) => {
                let body = match self.scope.page_response() {
                    Some(page) => page.clone().into_body(value.clone()),
                    None => value.clone(),
                };
                Reply::Json(mode.status(), body)
            }
        }
    }

    fn failure_reply(&mut self, error: &anyhow::Error) -> Reply {
        let (status, message) = classify(error);
        let request = self.scope.request();

        tracing::error!(
            method = %request.method,
            path = %request.path,
            query = ?request.query,
            body = %self.loggable_body(),
            store = %to_log_json(self.scope.objects()),
            events = %to_log_json(&self.events),
            result = %to_log_json(&self.result),
            user = %to_log_json(&request.user),
            status = status.as_u16(),
            error_message = %error,
            error = ?error,
            backtrace = %error.backtrace(),
            "Request failed"
        );

        self.events.record(EventName::Done, json!({ "status": status.as_u16() }));
        Reply::Json(status, json!({ ERROR_KEY: message }))
    }

    fn finish(self, reply: Reply, error: Option<anyhow::Error>) -> Completed {
        let Self {
            scope,
            events,
            result,
            ..
        } = self;
        Completed {
            reply,
            events,
            objects: scope.into_objects(),
            result,
            error,
        }
    }
}

fn to_log_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::CallstackConfig;
    use crate::error::ApiError;
    use crate::pagination::PageResponse;
    use crate::request::RequestInfo;
    use crate::step::{step, ValueStep};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Layer, SubscriberExt};

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            RequestInfo::new(http::Method::GET, "/items"),
            &CallstackConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_default_success() {
        let mut context = context();
        context.push(ValueStep::new("last", Some(json!({"id": 2}))));
        context.push(ValueStep::new("first", Some(json!({"id": 1}))));

        let completed = context.complete().await;
        assert_eq!(completed.reply, Reply::Json(StatusCode::OK, json!({"id": 2})));
        assert!(completed.is_success());
        assert_eq!(completed.events.names().last(), Some(&EventName::Done));
    }

    #[tokio::test]
    async fn test_custom_status_keeps_body() {
        let mut context = context();
        context.push(ValueStep::new("accept", Some(json!("queued"))));
        context.set_status(StatusCode::ACCEPTED);

        let completed = context.complete().await;
        assert_eq!(completed.reply, Reply::Json(StatusCode::ACCEPTED, json!("queued")));
    }

    #[tokio::test]
    async fn test_empty_modes_drop_body() {
        let cases: [(fn(&mut ExecutionContext), StatusCode); 3] = [
            (|context| context.created_serializer(), StatusCode::CREATED),
            (|context| context.empty_response_serializer(), StatusCode::NO_CONTENT),
            (|context| context.successful_response_serializer(), StatusCode::OK),
        ];

        for (set, expected) in cases {
            let mut context = context();
            context.push(ValueStep::new("value", Some(json!({"ignored": true}))));
            set(&mut context);

            assert_eq!(context.complete().await.reply, Reply::Empty(expected));
        }
    }

    #[tokio::test]
    async fn test_no_result_falls_back_to_status_only() {
        let mut context = context();
        context.push(ValueStep::new("nothing", None));
        assert_eq!(context.complete().await.reply, Reply::Empty(StatusCode::OK));

        let untouched = self::context();
        assert_eq!(untouched.complete().await.reply, Reply::Empty(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_paged_body() {
        let mut context = context();
        context.push(step("page", |scope| {
            Box::pin(async move {
                scope.set_page_response_object(PageResponse::with_total(42));
                Ok(Some(json!([{"id": 1}])))
            })
        }));

        let completed = context.complete().await;
        assert_eq!(
            completed.reply,
            Reply::Json(StatusCode::OK, json!({"total": 42, "results": [{"id": 1}]}))
        );
    }

    #[tokio::test]
    async fn test_typed_failure() {
        let mut context = context();
        context.push(step("missing", |_scope| {
            Box::pin(async { Err(anyhow::Error::from(ApiError::not_found("item 3"))) })
        }));

        let completed = context.complete().await;
        assert_eq!(
            completed.reply,
            Reply::Json(StatusCode::NOT_FOUND, json!({"Error": "Not Found"}))
        );
        assert!(!completed.is_success());
        assert_eq!(
            completed.events.names(),
            vec![EventName::Call, EventName::Error, EventName::Done]
        );
    }

    #[tokio::test]
    async fn test_untyped_failure_hides_detail() {
        let mut context = context();
        context.push(step("explode", |_scope| {
            Box::pin(async { Err(anyhow::anyhow!("password=hunter2 leaked in error")) })
        }));

        let completed = context.complete().await;
        assert_eq!(
            completed.reply,
            Reply::Json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"Error": "Internal Server Error"})
            )
        );
    }

    #[tokio::test]
    async fn test_failure_ignores_empty_mode() {
        let mut context = context();
        context.created_serializer();
        context.push(step("bad", |_scope| {
            Box::pin(async { Err(anyhow::Error::from(ApiError::bad_request("name is required"))) })
        }));

        assert_eq!(
            context.complete().await.reply,
            Reply::Json(StatusCode::BAD_REQUEST, json!({"Error": "name is required"}))
        );
    }

    #[test]
    fn test_reply_send() {
        struct Sink;
        impl ResponseSink for Sink {
            type Output = (u16, Option<Value>);
            fn send_empty(self, status: StatusCode) -> Self::Output {
                (status.as_u16(), None)
            }
            fn send_json(self, status: StatusCode, body: Value) -> Self::Output {
                (status.as_u16(), Some(body))
            }
        }

        assert_eq!(Reply::Empty(StatusCode::NO_CONTENT).send(Sink), (204, None));
        assert_eq!(
            Reply::Json(StatusCode::OK, json!(1)).send(Sink),
            (200, Some(json!(1)))
        );
    }

    /// Collects the fields of every event emitted while installed.
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<BTreeMap<String, String>>>>);

    struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let mut fields = BTreeMap::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.0.lock().unwrap().push(fields);
        }
    }

    #[tokio::test]
    async fn test_failure_log_carries_full_state() {
        let captured = CapturedEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));

        let request = RequestInfo::new(http::Method::POST, "/accounts")
            .with_query_param("dry_run", "yes")
            .with_body(json!({"name": "acme"}))
            .with_user(crate::request::AuthenticatedUser::new("u9"));
        let mut context = ExecutionContext::new(request, &CallstackConfig::default());
        context.push(step("explode", |_scope| {
            Box::pin(async { Err(anyhow::anyhow!("disk on fire")) })
        }));
        context.push(step("draft", |scope| {
            Box::pin(async move {
                scope.add_or_update_object("draft", json!({"id": 7}));
                Ok(Some(json!("partial")))
            })
        }));

        let completed = context.complete().await;
        assert_eq!(completed.reply.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let records = captured.0.lock().unwrap();
        let failed = records
            .iter()
            .find(|fields| fields.get("message").is_some_and(|m| m == "Request failed"))
            .expect("failure record emitted");

        assert_eq!(failed["method"], "POST");
        assert_eq!(failed["path"], "/accounts");
        assert!(failed["query"].contains("dry_run"));
        assert!(failed["body"].contains("acme"));
        assert!(failed["store"].contains("draft"));
        assert!(failed["events"].contains("CALL"));
        assert!(failed["events"].contains("explode"));
        assert!(failed["result"].contains("partial"));
        assert!(failed["user"].contains("u9"));
        assert_eq!(failed["status"], "500");
        assert_eq!(failed["error_message"], "disk on fire");
        assert!(failed["error"].contains("disk on fire"));
        assert!(failed.contains_key("backtrace"));
    }
}
