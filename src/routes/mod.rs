// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers for the loopback agent.

pub mod auth;
pub mod pages;

use crate::guard::RouteGuard;
use crate::middleware::auth::require_session;
use crate::models::Role;
use crate::navigation::route;
use crate::AppState;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Routes behind `guard`.
fn guarded(
    state: &Arc<AppState>,
    guard: RouteGuard,
    routes: Router<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    routes.route_layer(middleware::from_fn_with_state(
        (state.clone(), guard),
        require_session,
    ))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/session", get(pages::session_status))
        .route(route::UNAUTHORIZED, get(pages::unauthorized))
        .merge(auth::routes());

    let dashboard = guarded(
        &state,
        RouteGuard::authenticated(),
        Router::new().route(route::DASHBOARD, get(pages::dashboard)),
    );

    let agent = guarded(
        &state,
        RouteGuard::roles([Role::Agent, Role::Admin]),
        Router::new().route("/agent/listings", get(pages::agent_listings)),
    );

    let admin = guarded(
        &state,
        RouteGuard::roles([Role::Admin]),
        Router::new().route("/admin", get(pages::admin)),
    );

    Router::new()
        .merge(public_routes)
        .merge(dashboard)
        .merge(agent)
        .merge(admin)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
