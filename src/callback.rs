// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login redirect ingestion.
//!
//! The identity provider redirects to the callback with `token` and
//! `refresh` (or `error`) in the query string. The callback decodes the
//! access token locally, persists the session in one batch, hands it to the
//! auth context and schedules the move to the dashboard.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::claims::{decode_claims, ClaimsError};
use crate::context::AuthContext;
use crate::models::{SessionTokens, UserProfile};
use crate::navigation::{route, Navigation, Navigator};
use crate::store::SessionStoreExt;

/// Query parameters of the login redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string (`token=...&refresh=...`, leading `?` optional).
    /// Unknown keys are ignored; a repeated key is an error.
    pub fn from_query(query: &str) -> Result<Self, CallbackError> {
        serde_urlencoded::from_str(query.trim_start_matches('?')).map_err(|e| {
            tracing::warn!(error = %e, "Unparseable login callback query");
            CallbackError::MissingCredentials
        })
    }

    /// Parse the query part of a full callback URL.
    pub fn from_url(raw: &str) -> Result<Self, CallbackError> {
        let parsed = url::Url::parse(raw).map_err(|e| {
            tracing::warn!(error = %e, "Unparseable login callback URL");
            CallbackError::MissingCredentials
        })?;

        match parsed.query() {
            Some(query) => Self::from_query(query),
            None => Ok(Self::default()),
        }
    }

    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Why a callback could not establish a session.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("identity provider reported an error: {0}")]
    Provider(String),

    #[error("callback is missing the access or refresh token")]
    MissingCredentials,

    #[error("access token could not be decoded: {0}")]
    TokenDecode(#[from] ClaimsError),
}

impl CallbackError {
    /// Message shown to the viewer. Never includes raw error details.
    pub fn user_message(&self) -> String {
        match self {
            CallbackError::Provider(code) => format!("Sign-in failed: {}", code),
            CallbackError::MissingCredentials => {
                "Sign-in failed: missing tokens in the sign-in response".to_string()
            }
            CallbackError::TokenDecode(_) => {
                "Sign-in failed: the sign-in response could not be read".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Success,
    Error,
}

/// Render model for the callback page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
    pub status: CallbackStatus,
    pub message: String,
    pub redirect_to: String,
    #[serde(skip)]
    pub redirect_after: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// One-shot handler for the login redirect.
pub struct AuthCallback {
    context: AuthContext,
}

impl AuthCallback {
    pub fn new(context: AuthContext) -> Self {
        Self { context }
    }

    /// Process the redirect and schedule the follow-up navigation.
    /// Must run inside a Tokio runtime.
    pub fn handle(&self, params: &CallbackParams) -> CallbackOutcome {
        self.finish(self.establish(params))
    }

    /// Like `handle`, starting from the raw query string. A query that
    /// cannot be parsed takes the same recovery path as missing tokens.
    pub fn handle_query(&self, query: Option<&str>) -> CallbackOutcome {
        let params = CallbackParams::from_query(query.unwrap_or_default());
        self.finish(params.and_then(|params| self.establish(&params)))
    }

    fn finish(&self, result: Result<UserProfile, CallbackError>) -> CallbackOutcome {
        let settings = *self.context.settings();

        match result {
            Ok(user) => {
                schedule_navigation(
                    self.context.navigator().clone(),
                    Navigation::hard(route::DASHBOARD),
                    settings.success_redirect_delay,
                );
                CallbackOutcome {
                    status: CallbackStatus::Success,
                    message: format!("Signed in as {}", display_name(&user)),
                    redirect_to: route::DASHBOARD.to_string(),
                    redirect_after: settings.success_redirect_delay,
                    user: Some(user),
                }
            }
            Err(err) => {
                match &err {
                    CallbackError::Provider(code) => {
                        tracing::warn!(error = %code, "Identity provider returned an error")
                    }
                    CallbackError::MissingCredentials => {
                        tracing::warn!("Login callback invoked without tokens")
                    }
                    CallbackError::TokenDecode(e) => {
                        tracing::error!(error = %e, "Failed to decode access token payload")
                    }
                }

                schedule_navigation(
                    self.context.navigator().clone(),
                    Navigation::soft(route::LOGIN),
                    settings.error_redirect_delay,
                );
                CallbackOutcome {
                    status: CallbackStatus::Error,
                    message: err.user_message(),
                    redirect_to: route::LOGIN.to_string(),
                    redirect_after: settings.error_redirect_delay,
                    user: None,
                }
            }
        }
    }

    fn establish(&self, params: &CallbackParams) -> Result<UserProfile, CallbackError> {
        if let Some(code) = CallbackParams::present(&params.error) {
            return Err(CallbackError::Provider(code.to_string()));
        }

        let (Some(token), Some(refresh)) = (
            CallbackParams::present(&params.token),
            CallbackParams::present(&params.refresh),
        ) else {
            return Err(CallbackError::MissingCredentials);
        };

        let tokens = SessionTokens::new(token, refresh);
        let user = UserProfile::from_claims(&decode_claims(&tokens.access_token)?)?;

        // Everything the next reader needs lands in one batch
        self.context.store().persist_session(&tokens, &user, true);
        self.context.login(&tokens)?;

        tracing::info!(user_id = %user.id, role = %user.role, "Login callback accepted");
        Ok(user)
    }
}

fn display_name(user: &UserProfile) -> &str {
    if user.name.is_empty() {
        user.email.as_deref().unwrap_or(&user.id)
    } else {
        &user.name
    }
}

/// Fire-and-forget delayed navigation. Not cancellable once scheduled.
fn schedule_navigation(navigator: Arc<dyn Navigator>, to: Navigation, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        navigator.navigate(to);
    });
}
