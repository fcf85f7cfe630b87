//! Authentication tests for the REST surface

use axum::http::StatusCode;

use crate::common::{token_for, TestApp};

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/friends").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/chats")
        .authorization_bearer("not-a-jwt")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = TestApp::new();
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &chat_relay::presentation::middleware::auth::Claims {
            sub: "42".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: 0,
        },
        &jsonwebtoken::EncodingKey::from_secret(b"some-other-secret-that-is-long-enough"),
    )
    .unwrap();

    let response = app
        .server
        .get("/api/v1/friends/requests")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_rejected_before_storage() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/friends/requests")
        .authorization_bearer(token_for(1))
        .json(&serde_json::json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_search_requires_token() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/users/search")
        .add_query_param("email", "alice")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_user_search_rejected_before_storage() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/users/search")
        .add_query_param("email", "")
        .authorization_bearer(token_for(1))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
