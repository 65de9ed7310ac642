//! Error taxonomy for request handling.
//!
//! Failures fall into two groups:
//!
//! - **Typed errors** ([`ApiError`]): a closed set of kinds, each carrying an
//!   HTTP status and a public-facing message.
//! - **Unclassified errors**: anything else a step returns. These always map to
//!   `500 Internal Server Error`; their detail is only ever logged.
//!
//! Steps return `anyhow::Error`, so both groups travel through the same
//! channel. [`classify`] recovers the typed error, if there is one.
//!
//! # Example
//!
//! ```
//! use callstack_core::error::{classify, ApiError};
//! use http::StatusCode;
//!
//! let err: anyhow::Error = ApiError::not_found("user 42").into();
//! let (status, message) = classify(&err);
//! assert_eq!(status, StatusCode::NOT_FOUND);
//! assert_eq!(message, "Not Found");
//!
//! let err = anyhow::anyhow!("connection reset");
//! assert_eq!(classify(&err).0, StatusCode::INTERNAL_SERVER_ERROR);
//! ```

use http::StatusCode;
use thiserror::Error;

/// Public message used for every unclassified failure.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";

/// Typed, HTTP-aware errors.
///
/// `detail` fields are for the server-side log only. The caller sees
/// [`ApiError::public_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request carries no (valid) authenticated user.
    #[error("Unauthorized: {detail}")]
    Unauthorized {
        /// Logged reason
        detail: String,
    },

    /// The user is known but not allowed to do this.
    #[error("Forbidden: {detail}")]
    Forbidden {
        /// Logged reason
        detail: String,
    },

    /// The request is malformed. The message is shown to the caller.
    #[error("Bad Request: {message}")]
    BadRequest {
        /// Public message
        message: String,
    },

    /// The addressed resource does not exist.
    #[error("Not Found: {detail}")]
    NotFound {
        /// Logged reason
        detail: String,
    },

    /// Application-specific failure with a caller-chosen status and message.
    #[error("{message}")]
    Domain {
        /// HTTP status
        status: StatusCode,
        /// Public message
        message: String,
    },
}

impl ApiError {
    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized {
            detail: detail.into(),
        }
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Create an application-specific error.
    #[must_use]
    pub fn domain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Domain {
            status,
            message: message.into(),
        }
    }

    /// The email address is already registered.
    #[must_use]
    pub fn email_already_taken() -> Self {
        Self::domain(StatusCode::INTERNAL_SERVER_ERROR, "Email already taken")
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Domain { status, .. } => *status,
        }
    }

    /// Message safe to send to the caller.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::Forbidden { .. } => "Forbidden",
            Self::NotFound { .. } => "Not Found",
            Self::BadRequest { message } | Self::Domain { message, .. } => message,
        }
    }
}

/// Errors raised by misuse of the execution context itself.
///
/// These carry no HTTP status and are reported as unclassified failures.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A required object was never stored.
    #[error("Object '{key}' not found in request store")]
    MissingObject {
        /// Store key
        key: String,
    },

    /// A stored object could not be converted to or from the requested type.
    #[error("Object '{key}' has an unexpected shape: {source}")]
    InvalidObject {
        /// Store key
        key: String,
        /// Serde failure
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve the status and public message for any step failure.
///
/// Typed errors anywhere in the `anyhow` chain keep their own status and
/// message; everything else is `500 Internal Server Error`.
#[must_use]
pub fn classify(error: &anyhow::Error) -> (StatusCode, String) {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map_or_else(
            || {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
                )
            },
            |typed| (typed.status(), typed.public_message().to_string()),
        )
}
