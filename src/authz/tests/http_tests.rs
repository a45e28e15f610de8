//! HTTP decision service tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use modelguard_authz::{
    http::{router, AppState, DecideResponse},
    AuthorizationBinding, AuthorizationConfig, Collaborators, DirectorySeed, InMemoryDirectory,
    ModelRegistry, Principal, Resource, Role,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> (Router, Arc<InMemoryDirectory>) {
    let registry = Arc::new(
        ModelRegistry::builder()
            .protected("Post", ["find", "update"])
            .unprotected("Tag", ["find"])
            .build()
            .unwrap(),
    );

    // Raw seed: the editor's ACL predates any fingerprint
    let editor: Role = serde_json::from_value(serde_json::json!({
        "id": "r-editor",
        "name": "editor",
        "acl": { "Post_update": true }
    }))
    .unwrap();
    let seed = DirectorySeed {
        principals: vec![Principal::new("alice").with_role("r-editor"), Principal::new("carol")],
        roles: vec![editor],
        resources: vec![Resource::new("Post", "p1").with_role("r-editor")],
    };
    let directory = Arc::new(InMemoryDirectory::from_seed(seed).await);

    let binding = AuthorizationBinding::attach(
        AuthorizationConfig::default(),
        registry,
        Collaborators::from_directory(directory.clone()),
    )
    .unwrap();

    (router(AppState::new(Arc::new(binding))), directory)
}

fn decide_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/decide")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// DECIDE ENDPOINT TESTS
// ============================================================================

#[tokio::test]
async fn test_decide_allows_granted_call() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(decide_request(serde_json::json!({
            "principalId": "alice",
            "operation": "Post.update",
            "resourceId": "p1"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: DecideResponse = read_json(response).await;
    assert!(body.allowed);
    assert_eq!(body.decision, "allow");
    assert_eq!(body.status, None);
    assert!(!body.decision_id.is_empty());
}

#[tokio::test]
async fn test_decide_reports_denial_status() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(decide_request(serde_json::json!({
            "principalId": "alice",
            "operation": "Post.find",
            "resourceId": "p1"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: DecideResponse = read_json(response).await;
    assert!(!body.allowed);
    assert_eq!(body.decision, "deny");
    assert_eq!(body.status, Some(401));
    assert_eq!(body.message, "\"editor\" cannot access \"Post.find\".");
}

#[tokio::test]
async fn test_decide_anonymous_without_guest_access() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(decide_request(serde_json::json!({ "operation": "Post.find" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: DecideResponse = read_json(response).await;
    assert_eq!(body.message, "User not logged in.");
}

#[tokio::test]
async fn test_decide_rejects_bad_operations() {
    let (app, _) = test_app().await;

    let empty = app
        .clone()
        .oneshot(decide_request(serde_json::json!({ "operation": "  " })))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let unprotected = app
        .oneshot(decide_request(serde_json::json!({ "operation": "Tag.find" })))
        .await
        .unwrap();
    assert_eq!(unprotected.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = read_json(unprotected).await;
    assert_eq!(body["status"], 404);
}

// ============================================================================
// MAINTENANCE TESTS
// ============================================================================

#[tokio::test]
async fn test_migrate_endpoint_migrates_seeded_roles() {
    let (app, directory) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/roles/migrate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["examined"], 1);
    assert_eq!(body["migrated"], serde_json::json!(["r-editor"]));
    assert_eq!(directory.save_count("r-editor").await, 1);
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], modelguard_authz::VERSION);
}
