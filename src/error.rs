// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session error types with consistent agent responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::claims::ClaimsError;

/// Session error type shared by the API client and the auth context.
///
/// Cloneable so one refresh failure can be handed to every caller waiting
/// on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("No active session")]
    Unauthorized,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] ClaimsError),

    #[error("Credential rejected by auth API (HTTP {0})")]
    Rejected(u16),

    #[error("Auth API error: {0}")]
    Api(String),

    #[error("Auth API unreachable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Internal(Arc::new(err))
    }
}

impl SessionError {
    /// True when the backend (or the token itself) refused the credential,
    /// as opposed to a transport or server fault.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::Rejected(_) | SessionError::InvalidToken(_) | SessionError::Unauthorized
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            SessionError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            SessionError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            SessionError::Rejected(_) => (StatusCode::UNAUTHORIZED, "rejected", None),
            SessionError::Api(msg) => (StatusCode::BAD_GATEWAY, "api_error", Some(msg.clone())),
            SessionError::Transport(msg) => {
                tracing::warn!(error = %msg, "Auth API unreachable");
                (StatusCode::BAD_GATEWAY, "api_unreachable", None)
            }
            SessionError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
