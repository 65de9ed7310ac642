//! Steps: the units of work pushed onto a request's callstack.
//!
//! A step borrows the [`RequestScope`] for the duration of its run and
//! resolves to an optional JSON value. `None` means "no value", which the
//! responder turns into a status-only response if it is the final result.
//!
//! # Example
//!
//! ```
//! use callstack_core::step::{step, Step};
//! use serde_json::json;
//!
//! let load_user = step("load_user", |scope| {
//!     Box::pin(async move {
//!         scope.add_or_update_object("user", json!({"id": 1}));
//!         Ok(Some(json!({"id": 1})))
//!     })
//! });
//! assert_eq!(load_user.name(), "load_user");
//! ```

use crate::context::RequestScope;
use futures::future::BoxFuture;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// What a step resolves to.
pub type StepResult = anyhow::Result<Option<Value>>;

/// One asynchronous unit of request-handling logic.
pub trait Step: Send {
    /// Name recorded in CALL/RETURN events.
    fn name(&self) -> &str;

    /// Run the step. Consumes it: a step runs at most once.
    fn call<'a>(self: Box<Self>, scope: &'a mut RequestScope) -> BoxFuture<'a, StepResult>;
}

/// A step built from a closure. See [`step`].
pub struct FnStep<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

impl<F> Step for FnStep<F>
where
    F: for<'a> FnOnce(&'a mut RequestScope) -> BoxFuture<'a, StepResult> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(self: Box<Self>, scope: &'a mut RequestScope) -> BoxFuture<'a, StepResult> {
        let this = *self;
        (this.f)(scope)
    }
}

/// Build a named step from a closure returning a boxed future.
pub fn step<F>(name: impl Into<Cow<'static, str>>, f: F) -> FnStep<F>
where
    F: for<'a> FnOnce(&'a mut RequestScope) -> BoxFuture<'a, StepResult> + Send,
{
    FnStep {
        name: name.into(),
        f,
    }
}

/// A step that resolves to a fixed value without touching the scope.
#[derive(Debug, Clone)]
pub struct ValueStep {
    name: Cow<'static, str>,
    value: Option<Value>,
}

impl ValueStep {
    /// Create a step resolving to `value`.
    pub fn new(name: impl Into<Cow<'static, str>>, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Step for ValueStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(self: Box<Self>, _scope: &'a mut RequestScope) -> BoxFuture<'a, StepResult> {
        Box::pin(async move { Ok(self.value) })
    }
}
