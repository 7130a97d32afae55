// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP auth API client tests against a local mock backend.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use realty_session::api::{AuthApi, HttpAuthApi};
use realty_session::error::SessionError;
use realty_session::models::{Role, SessionTokens};
use serde_json::{json, Value};
use std::time::Duration;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn verify(headers: HeaderMap) -> impl IntoResponse {
    match bearer(&headers) {
        Some("good-access") => (
            StatusCode::OK,
            Json(json!({ "user": { "id": "u-1", "name": "Pat", "role": "agent" } })),
        )
            .into_response(),
        Some("broken") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn refresh(Json(body): Json<Value>) -> impl IntoResponse {
    match body["refreshToken"].as_str() {
        Some("rotating") => Json(json!({
            "accessToken": "new-access",
            "refreshToken": "rotated",
            "user": { "id": "u-1", "role": "admin" }
        }))
        .into_response(),
        Some("stable") => Json(json!({ "accessToken": "new-access" })).into_response(),
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}

async fn logout(headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    if bearer(&headers) == Some("good-access") && body["refreshToken"] == "stable" {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn me(headers: HeaderMap) -> impl IntoResponse {
    match bearer(&headers) {
        Some("good-access") => Json(json!({ "id": "u-1", "name": "Pat", "phoneVerified": true }))
            .into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Start the mock backend and return a client pointed at it.
async fn mock_backend() -> HttpAuthApi {
    let app = Router::new()
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/users/me", get(me));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    HttpAuthApi::new(format!("http://{}/api/", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_verify() {
    let api = mock_backend().await;

    let user = api.verify("good-access").await.unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(user.role, Role::Agent);

    let err = api.verify("stale-access").await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(401)));
    assert!(err.is_auth_rejection());

    let err = api.verify("broken").await.unwrap_err();
    assert!(matches!(err, SessionError::Api(_)));
    assert!(!err.is_auth_rejection());
}

#[tokio::test]
async fn test_refresh_with_rotation() {
    let api = mock_backend().await;

    let grant = api.refresh("rotating").await.unwrap();
    assert_eq!(grant.tokens.access_token, "new-access");
    assert_eq!(grant.tokens.refresh_token, "rotated");
    assert_eq!(grant.user.map(|u| u.role), Some(Role::Admin));
}

#[tokio::test]
async fn test_refresh_keeps_unrotated_token() {
    let api = mock_backend().await;

    let grant = api.refresh("stable").await.unwrap();
    assert_eq!(grant.tokens.refresh_token, "stable");
    assert!(grant.user.is_none());

    let err = api.refresh("revoked").await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(403)));
}

#[tokio::test]
async fn test_revoke_sends_both_tokens() {
    let api = mock_backend().await;

    api.revoke(&SessionTokens::new("good-access", "stable"))
        .await
        .unwrap();

    let err = api
        .revoke(&SessionTokens::new("good-access", "other"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Api(_)));
}

#[tokio::test]
async fn test_profile_bare_response() {
    let api = mock_backend().await;

    let user = api.profile("good-access").await.unwrap();
    assert_eq!(user.name, "Pat");
    assert!(user.phone_verified);
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpAuthApi::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = api.verify("good-access").await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
}
