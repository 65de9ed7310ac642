//! Axum response sink.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callstack_core::responder::{Reply, ResponseSink};
use serde_json::Value;

/// Turns a callstack reply into an axum [`Response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AxumSink;

impl ResponseSink for AxumSink {
    type Output = Response;

    fn send_empty(self, status: StatusCode) -> Self::Output {
        status.into_response()
    }

    fn send_json(self, status: StatusCode, body: Value) -> Self::Output {
        (status, Json(body)).into_response()
    }
}

/// Lets handlers return a [`Reply`] directly.
#[derive(Debug, Clone)]
pub struct ReplyResponse(pub Reply);

impl IntoResponse for ReplyResponse {
    fn into_response(self) -> Response {
        self.0.send(AxumSink)
    }
}
