//! Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`Callstack`]: a ready-to-use [`ExecutionContext`] built from the request

use crate::error::AppError;
use crate::responder::AxumSink;
use crate::state::CallstackSettings;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    response::Response,
};
use callstack_core::context::ExecutionContext;
use callstack_core::request::{AuthenticatedUser, RequestInfo};
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

/// Correlation id of the current request.
///
/// Taken from the extension set by
/// [`correlation_id_layer`](crate::middleware::correlation_id_layer) when the
/// layer is installed, otherwise from the `X-Correlation-ID` header, otherwise
/// freshly generated.
///
/// # Example
///
/// ```ignore
/// async fn handler(CorrelationId(id): CorrelationId) -> String {
///     format!("request {id}")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self::from_headers(&parts.headers)))
    }
}

/// Per-request execution context.
///
/// Built from the method, path, query string, JSON body, the
/// [`AuthenticatedUser`] extension (if an auth layer set one) and the
/// correlation id. Configuration and the optional transaction provider come
/// from [`CallstackSettings`] in router state.
///
/// An empty body becomes `null`. A body that is not JSON is rejected with
/// `400 {"Error": "Malformed JSON body"}` before any step runs.
///
/// # Example
///
/// ```ignore
/// async fn list_users(mut cs: Callstack) -> Response {
///     cs.set_permission(authenticated());
///     cs.push(step("list", |scope| Box::pin(async move { ... })));
///     cs.respond().await
/// }
/// ```
#[derive(Debug)]
pub struct Callstack(pub ExecutionContext);

impl Callstack {
    /// Drain the callstack and render the reply.
    pub async fn respond(self) -> Response {
        self.0.make_response(AxumSink).await
    }

    /// The underlying context.
    #[must_use]
    pub fn into_inner(self) -> ExecutionContext {
        self.0
    }
}

impl Deref for Callstack {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Callstack {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Message sent when the request body is not valid JSON.
pub const MALFORMED_BODY: &str = "Malformed JSON body";

#[async_trait]
impl<S> FromRequest<S> for Callstack
where
    S: Send + Sync,
    CallstackSettings: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let settings = CallstackSettings::from_ref(state);

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let Query(query) = Query::<BTreeMap<String, String>>::try_from_uri(req.uri())
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        let correlation_id = req
            .extensions()
            .get::<CorrelationId>()
            .copied()
            .unwrap_or_else(|| CorrelationId::from_headers(req.headers()));

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        let body = parse_body(&bytes)?;

        let mut info = RequestInfo::new(method, path)
            .with_query(query)
            .with_body(body)
            .with_correlation_id(correlation_id.0.to_string());
        if let Some(user) = user {
            info = info.with_user(user);
        }

        let mut context = ExecutionContext::new(info, settings.config());
        if let Some(provider) = settings.transactions() {
            context = context.with_transactions(provider.clone());
        }

        Ok(Self(context))
    }
}

fn parse_body(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::bad_request(MALFORMED_BODY).with_source(e.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b"  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_json_body() {
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_malformed_body() {
        let err = parse_body(b"{not json").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), MALFORMED_BODY);
    }
}
