//! A response sink for assertions.

use callstack_core::responder::ResponseSink;
use http::StatusCode;
use serde_json::Value;

/// What a [`RecordingSink`] was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    /// Numeric status.
    pub status: u16,
    /// JSON body, `None` for status-only responses.
    pub body: Option<Value>,
}

impl RecordedResponse {
    /// The `Error` message of a failure body, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("Error")?.as_str()
    }
}

/// Sink that returns the response instead of writing it anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingSink;

impl ResponseSink for RecordingSink {
    type Output = RecordedResponse;

    fn send_empty(self, status: StatusCode) -> Self::Output {
        RecordedResponse {
            status: status.as_u16(),
            body: None,
        }
    }

    fn send_json(self, status: StatusCode, body: Value) -> Self::Output {
        RecordedResponse {
            status: status.as_u16(),
            body: Some(body),
        }
    }
}
