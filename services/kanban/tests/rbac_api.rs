mod common;

use axum::http::StatusCode;
use common::{read_json, test_state};
use http_helpers::{caller_request, json_request};
use kanban::app::build_router;
use serde_json::{Value, json};
use tower::ServiceExt;

type App = axum::routing::RouterIntoService<axum::body::Body, ()>;

const ADMIN: Option<(&str, &str)> = Some(("root", "administrator"));

async fn app() -> App {
    build_router(test_state().await).into_service()
}

async fn call(app: &App, request: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    (status, read_json(response).await)
}

async fn allowed(app: &App, roles: &[&str], permission: &str) -> bool {
    let (status, body) = call(
        app,
        json_request(
            "POST",
            "/v1/rbac/can",
            json!({"roles": roles, "permission": permission}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["allowed"].as_bool().expect("allowed")
}

async fn role_id(app: &App, name: &str) -> String {
    let (status, body) = call(app, caller_request("GET", "/v1/rbac/roles", ADMIN, Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    body["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|role| role["name"] == name)
        .and_then(|role| role["id"].as_str())
        .expect("seeded role")
        .to_string()
}

#[tokio::test]
async fn can_follows_inheritance() {
    let app = app().await;
    assert!(allowed(&app, &["boards-admin"], "boards.create").await);
    assert!(allowed(&app, &["manager"], "users.invite").await);
    assert!(!allowed(&app, &["boards-reader"], "boards.create").await);
    assert!(!allowed(&app, &["ghost"], "boards.list").await);
    assert!(!allowed(&app, &[], "boards.list").await);
}

#[tokio::test]
async fn has_access_mixes_roles_and_permissions() {
    let app = app().await;
    let cases = [
        (json!(["administrator"]), json!(["manager"]), false),
        (json!(["administrator"]), json!(["anything.at.all"]), true),
        (json!(["$authenticated"]), json!(["boards-reader"]), true),
        (json!(["manager"]), json!(["boards-writer"]), true),
        (json!(["boards-reader"]), json!(["boards.remove", "boards.list"]), true),
        (json!(["boards-reader"]), json!([]), false),
    ];
    for (roles, items, expected) in cases {
        let (status, body) = call(
            &app,
            json_request(
                "POST",
                "/v1/rbac/has-access",
                json!({"roles": roles.clone(), "items": items.clone()}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], expected, "roles={roles} items={items}");
    }
}

#[tokio::test]
async fn listing_roles_requires_permission() {
    let app = app().await;
    let (status, body) = call(&app, json_request("GET", "/v1/rbac/roles", Value::Null)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");

    let (status, body) = call(
        &app,
        caller_request("GET", "/v1/rbac/roles", Some(("u1", "users-admin")), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().expect("items").len(), 8);
}

#[tokio::test]
async fn mutations_require_roles_update() {
    let app = app().await;
    let reader = role_id(&app, "boards-reader").await;
    let uri = format!("/v1/rbac/roles/{reader}/permissions");

    let (status, body) = call(
        &app,
        caller_request(
            "POST",
            &uri,
            Some(("u1", "boards-admin")),
            json!({"permission": "boards.archive"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn mutations_take_effect_immediately() {
    let app = app().await;
    let reader = role_id(&app, "boards-reader").await;
    let uri = format!("/v1/rbac/roles/{reader}/permissions");

    // Prime the cache with the old answer.
    assert!(!allowed(&app, &["boards-reader"], "boards.archive").await);

    let (status, body) = call(
        &app,
        caller_request("POST", &uri, ADMIN, json!({"permission": "boards.archive"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["permissions"]
            .as_array()
            .expect("permissions")
            .contains(&json!("boards.archive"))
    );
    assert!(allowed(&app, &["boards-reader"], "boards.archive").await);
    assert!(allowed(&app, &["manager"], "boards.archive").await);

    let (status, _) = call(
        &app,
        caller_request(
            "DELETE",
            &format!("{uri}/boards.archive"),
            ADMIN,
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!allowed(&app, &["boards-reader"], "boards.archive").await);

    let (status, body) = call(
        &app,
        caller_request("PUT", &uri, ADMIN, json!({"permissions": ["boards.list"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"], json!(["boards.list"]));
    assert!(!allowed(&app, &["boards-reader"], "boards.get").await);
    assert!(allowed(&app, &["boards-reader"], "boards.list").await);
}

#[tokio::test]
async fn assign_is_idempotent() {
    let app = app().await;
    let writer = role_id(&app, "boards-writer").await;
    let uri = format!("/v1/rbac/roles/{writer}/permissions");
    let mut lengths = Vec::new();
    for _ in 0..2 {
        let (status, body) = call(
            &app,
            caller_request("POST", &uri, ADMIN, json!({"permission": "boards.create"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        lengths.push(body["permissions"].as_array().expect("permissions").len());
    }
    assert_eq!(lengths, vec![3, 3]);
}

#[tokio::test]
async fn malformed_permission_and_unknown_role() {
    let app = app().await;
    let reader = role_id(&app, "boards-reader").await;

    let (status, body) = call(
        &app,
        caller_request(
            "POST",
            &format!("/v1/rbac/roles/{reader}/permissions"),
            ADMIN,
            json!({"permission": "boards..create"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "permission");

    let (status, body) = call(
        &app,
        caller_request(
            "POST",
            "/v1/rbac/roles/missing/permissions",
            ADMIN,
            json!({"permission": "boards.create"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn health_and_openapi() {
    let app = app().await;
    let (status, body) = call(&app, json_request("GET", "/v1/system/health", Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, json_request("GET", "/v1/openapi.json", Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/v1/rbac/can").is_some());
    assert!(body["paths"].get("/v1/boards/{board_id}").is_some());
}
