//! Router round trips through the `Callstack` extractor.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use callstack_core::error::ApiError;
use callstack_core::pagination::PageResponse;
use callstack_core::permission::{PermissionExt, authenticated, has_role};
use callstack_core::step::step;
use callstack_core::{CallstackConfig, PaginationDefaults};
use callstack_testing::{MockTransaction, MockTransactionProvider, TransactionOutcome, user};
use callstack_web::{CORRELATION_ID_HEADER, Callstack, CallstackSettings, correlation_id_layer};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn list(mut cs: Callstack) -> Response {
    cs.push(step("list", |scope| {
        Box::pin(async move {
            let (skip, take) = scope.pagination().window()?;
            scope.set_page_response_object(PageResponse::with_total(100).field("skip", skip));
            Ok(Some(json!({ "take": take })))
        })
    }));
    cs.respond().await
}

async fn create(mut cs: Callstack) -> Response {
    cs.set_permission(authenticated());
    cs.created_serializer();
    cs.push(step("insert", |scope| {
        Box::pin(async move {
            let email = scope.request().body["email"].clone();
            if email.is_null() {
                return Err(ApiError::bad_request("email is required").into());
            }
            if let Some(tx) = scope.transaction_mut::<MockTransaction>() {
                tx.write("insert user");
            }
            Ok(Some(json!({ "email": email })))
        })
    }));
    cs.respond().await
}

async fn remove(mut cs: Callstack) -> Response {
    cs.set_permission(authenticated().and(has_role("admin")));
    cs.empty_response_serializer();
    cs.push(step("delete", |_scope| Box::pin(async { Ok(None) })));
    cs.respond().await
}

async fn echo(cs: Callstack) -> Response {
    let request = cs.request().clone();
    let mut cs = cs;
    cs.push(step("echo", move |_scope| {
        Box::pin(async move { Ok(Some(serde_json::to_value(&request)?)) })
    }));
    cs.respond().await
}

/// Test auth: `X-User-Roles: admin,staff` logs in user `u1` with those roles.
async fn header_auth(mut req: Request, next: Next) -> Response {
    let roles = req
        .headers()
        .get("X-User-Roles")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(str::to_owned).collect::<Vec<_>>());
    if let Some(roles) = roles {
        let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
        req.extensions_mut().insert(user("u1", &roles));
    }
    next.run(req).await
}

fn app(settings: CallstackSettings) -> Router {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/:id", delete(remove))
        .route("/echo", post(echo))
        .layer(middleware::from_fn(header_auth))
        .layer(correlation_id_layer())
        .with_state(settings)
}

async fn send(app: Router, request: Request) -> (StatusCode, Option<Value>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, body)
}

fn get_request(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-User-Roles", "member")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_paginated_list_defaults() {
    let (status, body) = send(app(CallstackSettings::default()), get_request("/users")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({"total": 100, "skip": 0, "results": {"take": 10}}))
    );
}

#[tokio::test]
async fn test_page_mode_query() {
    let (status, body) = send(
        app(CallstackSettings::default()),
        get_request("/users?page=3&pageSize=5"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({"total": 100, "skip": 10, "results": {"take": 5}}))
    );
}

#[tokio::test]
async fn test_configured_defaults_apply() {
    let config = CallstackConfig::default().with_pagination(PaginationDefaults {
        limit: 25,
        ..PaginationDefaults::default()
    });
    let (_, body) = send(app(CallstackSettings::new(config)), get_request("/users")).await;

    assert_eq!(body.unwrap()["results"], json!({"take": 25}));
}

#[tokio::test]
async fn test_malformed_limit_is_bad_request() {
    let (status, body) = send(
        app(CallstackSettings::default()),
        get_request("/users?limit=ten"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap().get("Error").is_some());
}

#[tokio::test]
async fn test_create_requires_user() {
    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .body(Body::from(r#"{"email":"a@b.c"}"#))
        .unwrap();
    let (status, body) = send(app(CallstackSettings::default()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Some(json!({"Error": "Unauthorized"})));
}

#[tokio::test]
async fn test_create_returns_created_without_body() {
    let (status, body) = send(
        app(CallstackSettings::default()),
        json_request("POST", "/users", r#"{"email":"a@b.c"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (status, body) = send(
        app(CallstackSettings::default()),
        json_request("POST", "/users", "{email"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Some(json!({"Error": "Malformed JSON body"})));
}

#[tokio::test]
async fn test_domain_error_from_step() {
    let (status, body) = send(
        app(CallstackSettings::default()),
        json_request("POST", "/users", r#"{"name":"x"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Some(json!({"Error": "email is required"})));
}

#[tokio::test]
async fn test_delete_forbidden_without_admin() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/users/7")
        .header("X-User-Roles", "member")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(CallstackSettings::default()), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, Some(json!({"Error": "Forbidden"})));
}

#[tokio::test]
async fn test_delete_as_admin_is_no_content() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/users/7")
        .header("X-User-Roles", "member,admin")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(CallstackSettings::default()), request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_request_info_reaches_steps() {
    let correlation_id = uuid::Uuid::new_v4();
    let request = Request::builder()
        .method("POST")
        .uri("/echo?q=rust")
        .header(CORRELATION_ID_HEADER, correlation_id.to_string())
        .header("X-User-Roles", "admin")
        .body(Body::from(r#"{"a":1}"#))
        .unwrap();
    let (status, body) = send(app(CallstackSettings::default()), request).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/echo");
    assert_eq!(body["query"], json!({"q": "rust"}));
    assert_eq!(body["body"], json!({"a": 1}));
    assert_eq!(body["user"]["id"], "u1");
    assert_eq!(body["correlation_id"], correlation_id.to_string());
}

#[tokio::test]
async fn test_transaction_committed_on_success() {
    let provider = MockTransactionProvider::new();
    let settings = CallstackSettings::default().with_transactions(Arc::new(provider.clone()));

    let (status, _) = send(
        app(settings),
        json_request("POST", "/users", r#"{"email":"a@b.c"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(provider.outcomes(), vec![TransactionOutcome::Committed]);
}

#[tokio::test]
async fn test_transaction_rolled_back_on_failure() {
    let provider = MockTransactionProvider::new();
    let settings = CallstackSettings::default().with_transactions(Arc::new(provider.clone()));

    let (status, _) = send(
        app(settings),
        json_request("POST", "/users", r#"{"name":"x"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.outcomes(), vec![TransactionOutcome::RolledBack]);
}
