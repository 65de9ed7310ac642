//! Configuration management for the users service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first, if present; variables
//! already set in the process environment win.

use callstack_core::CallstackConfig;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Configuration error
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but its value cannot be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Environment variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on (`BIND_ADDR`)
    pub bind_addr: SocketAddr,
    /// `PostgreSQL` URL (`DATABASE_URL`). Requests run in a transaction when set.
    pub database_url: Option<String>,
    /// Whether request bodies appear in logs (`LOG_REQUEST_BODY`, default true)
    pub log_request_body: bool,
}

impl ServerConfig {
    /// Load `.env` (if present) into the environment, then read it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                var: "BIND_ADDR",
                value: bind_addr.clone(),
            })?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_request_body = match lookup("LOG_REQUEST_BODY") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                var: "LOG_REQUEST_BODY",
                value,
            })?,
        };

        Ok(Self {
            bind_addr,
            database_url,
            log_request_body,
        })
    }

    /// Execution context configuration derived from this server configuration.
    #[must_use]
    pub fn callstack(&self) -> CallstackConfig {
        CallstackConfig::default().with_log_request_body(self.log_request_body)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
