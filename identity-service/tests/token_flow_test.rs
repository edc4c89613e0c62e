mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{body_json, get_request, json_request, spawn_app};
use serde_json::json;
use std::net::SocketAddr;

fn bearer_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .extension(axum::extract::ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8080,
        ))))
        .body(Body::empty())
        .unwrap()
}

async fn login(harness: &common::TestHarness) -> serde_json::Value {
    let response = harness
        .request(json_request(
            "POST",
            "/auth/login",
            json!({"identifier": "alice", "password": "pw-123456"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn access_token_authenticates_me_endpoint() {
    let harness = spawn_app().await;
    let user = harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let access = tokens["access_token"].as_str().unwrap();

    let response = harness.request(bearer_request("/users/me", access)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["username"], "alice");
    // Password hash never leaves the service
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn missing_and_malformed_tokens_are_unauthorized() {
    let harness = spawn_app().await;

    let response = harness.request(get_request("/users/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = harness
        .request(bearer_request("/users/me", "not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let access = tokens["access_token"].as_str().unwrap().to_string();

    // Past the 30 minute access TTL
    harness.clock.advance_minutes(31);

    let response = harness.request(bearer_request("/users/me", &access)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn refresh_token_buys_a_new_pair() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let response = harness
        .request(json_request(
            "POST",
            "/auth/refresh",
            json!({"refresh_token": refresh}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let new_access = body["access_token"].as_str().unwrap();

    let response = harness
        .request(bearer_request("/users/me", new_access))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn access_token_cannot_be_used_as_refresh_token() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let access = tokens["access_token"].as_str().unwrap();

    let response = harness
        .request(json_request(
            "POST",
            "/auth/refresh",
            json!({"refresh_token": access}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_cannot_be_used_for_access() {
    let harness = spawn_app().await;
    harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let response = harness.request(bearer_request("/users/me", refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_fails_for_a_deactivated_account() {
    let harness = spawn_app().await;
    let mut user = harness.seed_user("alice", "alice@example.com", "pw-123456", true);

    let tokens = login(&harness).await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    // Deactivate behind the token's back
    user.is_active = false;
    harness.users.insert_raw(user);

    let response = harness
        .request(json_request(
            "POST",
            "/auth/refresh",
            json!({"refresh_token": refresh}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
