// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard middleware for the agent's protected pages.

use crate::guard::{GuardDecision, RouteGuard};
use crate::models::UserProfile;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Signed-in user, inserted into request extensions by `require_session`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

/// Middleware that applies a `RouteGuard` to the wrapped routes.
///
/// Install with `from_fn_with_state((state, guard), require_session)`.
pub async fn require_session(
    State((state, guard)): State<(Arc<AppState>, RouteGuard)>,
    mut request: Request,
    next: Next,
) -> Response {
    let snapshot = state.context.snapshot();
    let path = request.uri().path().to_string();

    match guard.check(&snapshot, Some(&path)) {
        GuardDecision::Loading => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            "Loading session",
        )
            .into_response(),
        GuardDecision::Redirect(to) => {
            tracing::debug!(path = %path, to = %to, "Guard redirect");
            Redirect::temporary(&to).into_response()
        }
        GuardDecision::Render => {
            if let Some(user) = snapshot.user {
                request.extensions_mut().insert(CurrentUser(user));
            }
            next.run(request).await
        }
    }
}
