//! Header-based authentication for the demo.
//!
//! Not a real authentication scheme: whoever sends `X-User-Id` is that user.
//! It stands in for a session or token layer, which would attach the same
//! [`AuthenticatedUser`] extension.

use axum::{extract::Request, middleware::Next, response::Response};
use callstack_core::request::AuthenticatedUser;

/// Header carrying the user id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying comma-separated roles.
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

/// Attach an [`AuthenticatedUser`] built from the identity headers, if present.
pub async fn header_auth(mut req: Request, next: Next) -> Response {
    if let Some(user) = user_from_headers(req.headers()) {
        tracing::debug!(user_id = %user.id, "User authenticated");
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

fn user_from_headers(headers: &axum::http::HeaderMap) -> Option<AuthenticatedUser> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let roles = headers
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    Some(
        roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .fold(AuthenticatedUser::new(id), AuthenticatedUser::with_role),
    )
}
