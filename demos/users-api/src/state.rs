//! Application state.

use crate::users::UserRepository;
use axum::extract::FromRef;
use callstack_web::CallstackSettings;
use std::sync::Arc;

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Execution context settings
    pub callstack: CallstackSettings,
    /// User storage
    pub users: Arc<UserRepository>,
}

impl AppState {
    /// Create the state.
    #[must_use]
    pub fn new(callstack: CallstackSettings, users: Arc<UserRepository>) -> Self {
        Self { callstack, users }
    }
}

// FromRef lets the `Callstack` extractor and `State<Arc<UserRepository>>` pick their part.
impl FromRef<AppState> for CallstackSettings {
    fn from_ref(state: &AppState) -> Self {
        state.callstack.clone()
    }
}

impl FromRef<AppState> for Arc<UserRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}
