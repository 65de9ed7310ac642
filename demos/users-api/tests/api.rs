//! HTTP-level tests for the users service.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use callstack_testing::{MockTransactionProvider, TransactionOutcome, init_tracing};
use callstack_web::CallstackSettings;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use users_api::auth::{USER_ID_HEADER, USER_ROLES_HEADER};
use users_api::{AppState, NewUser, UserRepository, build_router};

struct TestApp {
    router: Router,
    users: Arc<UserRepository>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_settings(CallstackSettings::default())
    }

    fn with_settings(settings: CallstackSettings) -> Self {
        init_tracing();
        let users = Arc::new(UserRepository::new());
        let router = build_router(AppState::new(settings, users.clone()));
        Self { router, users }
    }

    async fn seed(&self, count: usize) {
        for i in 0..count {
            self.users
                .insert(NewUser {
                    email: format!("user{i}@example.com"),
                    name: None,
                })
                .await
                .unwrap();
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<Value>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
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
}

fn request(method: &str, uri: &str, identity: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, roles)) = identity {
        builder = builder
            .header(USER_ID_HEADER, id)
            .header(USER_ROLES_HEADER, roles);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const MEMBER: Option<(&str, &str)> = Some(("7", "member"));
const ADMIN: Option<(&str, &str)> = Some(("1", "admin"));

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "ok");
}

#[tokio::test]
async fn test_list_requires_user() {
    let app = TestApp::new();
    let (status, body) = app.send(request("GET", "/api/users", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Some(json!({"Error": "Unauthorized"})));
}

#[tokio::test]
async fn test_list_default_pagination() {
    let app = TestApp::new();
    app.seed(15).await;

    let (status, body) = app.send(request("GET", "/api/users", MEMBER, None)).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 15);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert_eq!(body["results"][0]["id"], 1);
}

#[tokio::test]
async fn test_list_page_mode() {
    let app = TestApp::new();
    app.seed(15).await;

    let (status, body) = app
        .send(request("GET", "/api/users?page=2&pageSize=4", MEMBER, None))
        .await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageSize"], 4);
    let ids: Vec<u64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 6, 7, 8]);
}

#[tokio::test]
async fn test_list_malformed_offset() {
    let app = TestApp::new();
    let (status, _) = app
        .send(request("GET", "/api/users?offset=-1", MEMBER, None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_missing_user() {
    let app = TestApp::new();
    let (status, body) = app.send(request("GET", "/api/users/99", MEMBER, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, Some(json!({"Error": "Not Found"})));
}

#[tokio::test]
async fn test_create_user() {
    let app = TestApp::new();
    let (status, body) = app
        .send(request(
            "POST",
            "/api/users",
            Some(("2", "staff")),
            Some(json!({"email": "ada@example.com", "name": "Ada"})),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, None);

    let (status, body) = app.send(request("GET", "/api/users/1", MEMBER, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({"id": 1, "email": "ada@example.com", "name": "Ada"}))
    );
}

#[tokio::test]
async fn test_create_forbidden_for_member() {
    let app = TestApp::new();
    let (status, _) = app
        .send(request(
            "POST",
            "/api/users",
            MEMBER,
            Some(json!({"email": "ada@example.com"})),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.users.page(0, 10).await.1, 0);
}

#[tokio::test]
async fn test_create_invalid_email() {
    let app = TestApp::new();
    let (status, body) = app
        .send(request("POST", "/api/users", ADMIN, Some(json!({"email": "nope"}))))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Some(json!({"Error": "Invalid email address"})));
}

#[tokio::test]
async fn test_create_duplicate_email() {
    let app = TestApp::new();
    app.seed(1).await;

    let (status, body) = app
        .send(request(
            "POST",
            "/api/users",
            ADMIN,
            Some(json!({"email": "user0@example.com"})),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, Some(json!({"Error": "Email already taken"})));
}

#[tokio::test]
async fn test_delete_as_admin() {
    let app = TestApp::new();
    app.seed(2).await;

    let (status, body) = app.send(request("DELETE", "/api/users/2", ADMIN, None)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, None);
    assert!(app.users.get(2).await.is_none());
}

#[tokio::test]
async fn test_delete_self() {
    let app = TestApp::new();
    app.seed(7).await;

    let (status, _) = app.send(request("DELETE", "/api/users/7", MEMBER, None)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_delete_other_user_forbidden() {
    let app = TestApp::new();
    app.seed(3).await;

    let (status, body) = app.send(request("DELETE", "/api/users/3", MEMBER, None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, Some(json!({"Error": "Forbidden"})));
    assert!(app.users.get(3).await.is_some());
}

#[tokio::test]
async fn test_requests_are_transactional() {
    let provider = MockTransactionProvider::new();
    let app = TestApp::with_settings(
        CallstackSettings::default().with_transactions(Arc::new(provider.clone())),
    );

    app.send(request(
        "POST",
        "/api/users",
        ADMIN,
        Some(json!({"email": "ada@example.com"})),
    ))
    .await;
    app.send(request("GET", "/api/users/42", ADMIN, None)).await;

    assert_eq!(
        provider.outcomes(),
        vec![TransactionOutcome::Committed, TransactionOutcome::RolledBack]
    );
}
