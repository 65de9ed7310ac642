//! Execution context configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.
//! The defaults match what most list endpoints expect.

use serde::{Deserialize, Serialize};

/// Defaults applied to pagination query parameters that are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationDefaults {
    /// `limit` in offset mode.
    ///
    /// Default: 10
    pub limit: u64,

    /// `offset` in offset mode.
    ///
    /// Default: 0
    pub offset: u64,

    /// `pageSize` in page mode.
    ///
    /// Default: 10
    pub page_size: u64,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            page_size: 10,
        }
    }
}

/// Per-application settings shared by every execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallstackConfig {
    /// Pagination defaults.
    pub pagination: PaginationDefaults,

    /// Whether request bodies appear in log records.
    ///
    /// Default: true
    pub log_request_body: bool,
}

impl Default for CallstackConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationDefaults::default(),
            log_request_body: true,
        }
    }
}

impl CallstackConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pagination defaults.
    #[must_use]
    pub const fn with_pagination(mut self, pagination: PaginationDefaults) -> Self {
        self.pagination = pagination;
        self
    }

    /// Enable or disable request body logging.
    #[must_use]
    pub const fn with_log_request_body(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }
}
