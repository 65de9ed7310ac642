//! Callstack execution.
//!
//! Draining runs the permission gate (if any) and then pops steps one at a
//! time until the stack is empty or a step fails. Only one step is in flight
//! at any moment; a failure abandons every step still on the stack.

use crate::context::ExecutionContext;
use crate::event::EventName;
use serde_json::{Value, json};

/// Step name recorded when the permission gate rejects a request.
pub const PERMISSION_GATE: &str = "permission";

impl ExecutionContext {
    /// Drain the callstack to a terminal state.
    ///
    /// On success the last produced value is in [`ExecutionContext::result`].
    ///
    /// # Errors
    ///
    /// Returns the gate's failure (no step runs) or the first failing step's
    /// error (later steps are abandoned). An ERROR event is recorded either way.
    pub(crate) async fn drain(&mut self) -> anyhow::Result<()> {
        if let Some(permission) = self.permission.clone() {
            let request = self.scope.request();
            let verdict = permission.check(request).await;
            if let Err(denied) = verdict {
                tracing::info!(error = %denied, "Permission gate rejected request");
                self.events.record(
                    EventName::Error,
                    json!({ "step": PERMISSION_GATE, "error": denied.to_string() }),
                );
                return Err(denied.into());
            }
        }

        while let Some(step) = self.callstack.pop() {
            let name = step.name().to_string();

            self.events.record(EventName::Call, json!({ "step": name }));
            tracing::debug!(step = %name, "Calling step");

            match step.call(&mut self.scope).await {
                Ok(value) => {
                    tracing::debug!(step = %name, "Step returned");
                    self.events.record(
                        EventName::Return,
                        json!({ "step": name, "value": value.clone().unwrap_or(Value::Null) }),
                    );
                    self.result = value;
                }
                Err(error) => {
                    let abandoned = self.callstack.len();
                    self.callstack.clear();
                    self.events.record(
                        EventName::Error,
                        json!({ "step": name, "error": format!("{error:#}"), "abandoned": abandoned }),
                    );
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
