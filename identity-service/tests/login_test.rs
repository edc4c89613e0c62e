mod common;

use axum::http::StatusCode;
use common::{body_json, json_request, spawn_app};
use serde_json::json;

#[tokio::test]
async fn login_with_username_returns_token_pair() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "correct horse battery", true);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "alice", "password": "correct horse battery"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 30 * 60);
    assert!(body["access_token"].as_str().unwrap().contains('.'));
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn login_with_email_is_case_insensitive() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "Alice@Example.COM", "password": "pw-123456"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_username_is_case_sensitive() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "Alice", "password": "pw-123456"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn remember_me_extends_token_lifetime() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "alice", "password": "pw-123456", "remember_me": true}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["expires_in"], 1440 * 60);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let wrong_password = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "alice", "password": "nope"}),
        ))
        .await;
    let unknown_user = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "nobody", "password": "nope"}),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    // Same body for both: the response must not reveal whether the account exists.
    let wrong_body = body_json(wrong_password).await;
    let unknown_body = body_json(unknown_user).await;
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn inactive_account_is_told_explicitly() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", false);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "alice", "password": "pw-123456"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("deactivated"));
}

#[tokio::test]
async fn empty_identifier_fails_validation() {
    let harness = spawn_app().await;

    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "", "password": "pw"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
