//! Router configuration for the users service.

use crate::auth::header_auth;
use crate::state::AppState;
use crate::users;
use axum::{
    Json, Router, middleware,
    routing::get,
};
use callstack_web::correlation_id_layer;
use serde_json::{Value, json};

/// Build the complete Axum router.
///
/// Layers run outside-in: correlation id first, then authentication, so
/// every handler sees both.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).delete(users::delete_user));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(header_auth))
        .layer(correlation_id_layer())
        .with_state(state)
}

/// Liveness check, outside the callstack.
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
