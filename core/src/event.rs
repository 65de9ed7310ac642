//! Audit trail of one request's execution.
//!
//! Events are appended in occurrence order and never reordered, deduplicated
//! or read back by the execution logic. They exist for the log records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Kind of an execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    /// A step is about to run.
    Call,
    /// A step produced a value.
    Return,
    /// Execution stopped on a failure.
    Error,
    /// A response is about to be sent.
    Done,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::Error => "ERROR",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// One entry in the [`EventLog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionEvent {
    /// Event kind.
    pub name: EventName,
    /// Free-form diagnostic payload.
    pub payload: Value,
    /// When the event was appended.
    pub at: DateTime<Utc>,
}

/// Append-only list of [`ExecutionEvent`]s.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<ExecutionEvent>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event stamped with the current time.
    pub fn record(&mut self, name: EventName, payload: Value) {
        self.events.push(ExecutionEvent {
            name,
            payload,
            at: Utc::now(),
        });
    }

    /// All events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    /// Event names, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<EventName> {
        self.events.iter().map(|event| event.name).collect()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
