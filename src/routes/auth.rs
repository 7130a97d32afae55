// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, login-redirect callback and logout routes.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::callback::{AuthCallback, CallbackOutcome, CallbackStatus};
use crate::navigation::route;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(route::LOGIN, get(login))
        .route(route::CALLBACK, get(callback))
        .route("/auth/logout", post(logout))
}

/// Start login - redirect to the identity provider, which comes back to
/// our callback.
async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    let callback_url = format!("http://127.0.0.1:{}{}", state.config.port, route::CALLBACK);

    let login_url = &state.config.identity_login_url;
    let separator = if login_url.contains('?') { '&' } else { '?' };
    let redirect = format!(
        "{}{}redirect_uri={}",
        login_url,
        separator,
        urlencoding::encode(&callback_url)
    );

    tracing::info!(callback = %callback_url, "Starting login, redirecting to identity provider");
    Redirect::temporary(&redirect)
}

/// Login redirect target: establish the session and render a status page
/// that moves on after the outcome's delay. Any query, even a malformed
/// one, gets the status page.
async fn callback(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let outcome = AuthCallback::new(state.context.clone()).handle_query(query.as_deref());
    Html(render_callback_page(&outcome))
}

async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.context.logout().await;
    StatusCode::NO_CONTENT
}

fn render_callback_page(outcome: &CallbackOutcome) -> String {
    let title = match outcome.status {
        CallbackStatus::Success => "Signed in",
        CallbackStatus::Error => "Sign-in failed",
    };

    format!(
        "<!doctype html>\n\
         <html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"{};url={}\">\
         <title>{}</title></head>\
         <body><p>{}</p></body></html>\n",
        outcome.redirect_after.as_secs(),
        escape_html(&outcome.redirect_to),
        title,
        escape_html(&outcome.message)
    )
}

/// Provider error codes are attacker-controlled; escape before rendering.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
