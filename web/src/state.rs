//! Shared settings for building execution contexts.
//!
//! Applications keep one [`CallstackSettings`] in their router state and
//! expose it through [`FromRef`](axum::extract::FromRef); the
//! [`Callstack`](crate::extractors::Callstack) extractor reads it on every
//! request.
//!
//! # Examples
//!
//! ```ignore
//! use axum::extract::FromRef;
//! use callstack_web::CallstackSettings;
//!
//! #[derive(Clone)]
//! struct MyAppState {
//!     callstack: CallstackSettings,
//!     users: Arc<UserRepository>,
//! }
//!
//! impl FromRef<MyAppState> for CallstackSettings {
//!     fn from_ref(state: &MyAppState) -> Self {
//!         state.callstack.clone()
//!     }
//! }
//! ```

use callstack_core::config::CallstackConfig;
use callstack_core::transaction::TransactionProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration and collaborators shared by every request.
#[derive(Clone, Default)]
pub struct CallstackSettings {
    config: Arc<CallstackConfig>,
    transactions: Option<Arc<dyn TransactionProvider>>,
}

impl fmt::Debug for CallstackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallstackSettings")
            .field("config", &self.config)
            .field("transactional", &self.transactions.is_some())
            .finish()
    }
}

impl CallstackSettings {
    /// Settings with the given configuration and no transaction provider.
    #[must_use]
    pub fn new(config: CallstackConfig) -> Self {
        Self {
            config: Arc::new(config),
            transactions: None,
        }
    }

    /// Wrap every request's response cycle in a transaction from `provider`.
    #[must_use]
    pub fn with_transactions(mut self, provider: Arc<dyn TransactionProvider>) -> Self {
        self.transactions = Some(provider);
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &CallstackConfig {
        &self.config
    }

    /// The transaction provider, if any.
    #[must_use]
    pub fn transactions(&self) -> Option<&Arc<dyn TransactionProvider>> {
        self.transactions.as_ref()
    }
}
