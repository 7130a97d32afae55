// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session status and guarded page routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::claims::decode_claims;
use crate::context::AuthSnapshot;
use crate::middleware::CurrentUser;
use crate::models::UserProfile;
use crate::store::SessionStoreExt;
use crate::time_utils::format_unix_rfc3339;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(flatten)]
    pub snapshot: AuthSnapshot,
    pub is_authenticated: bool,
    pub state: &'static str,
    /// Access token expiry (RFC 3339), when a token is stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Current auth state, as the route guards see it.
pub async fn session_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    let session = state.context.state();
    let snapshot = AuthSnapshot::from(&session);

    let expires_at = state
        .context
        .store()
        .load_tokens()
        .and_then(|tokens| decode_claims(&tokens.access_token).ok())
        .and_then(|claims| claims.exp())
        .and_then(format_unix_rfc3339);

    Json(SessionStatus {
        is_authenticated: snapshot.is_authenticated(),
        snapshot,
        state: session.label(),
        expires_at,
    })
}

/// Page model handed to whatever renders the guarded page.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page: &'static str,
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

pub async fn dashboard(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<PageView> {
    let notice = (!user.onboarding_completed).then_some("Finish onboarding to complete your profile");
    Json(PageView {
        page: "dashboard",
        user,
        notice,
    })
}

pub async fn agent_listings(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<PageView> {
    let notice = (!user.phone_verified).then_some("Verify your phone number to receive inquiries");
    Json(PageView {
        page: "agent-listings",
        user,
        notice,
    })
}

pub async fn admin(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<PageView> {
    Json(PageView {
        page: "admin",
        user,
        notice: None,
    })
}

pub async fn unauthorized() -> (StatusCode, Html<&'static str>) {
    (
        StatusCode::FORBIDDEN,
        Html("<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Unauthorized</title></head><body><p>You do not have access to this page.</p></body></html>\n"),
    )
}
