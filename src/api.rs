// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Marketplace auth API client.
//!
//! Handles:
//! - Access token verification
//! - Token refresh
//! - Session revocation on logout
//! - Profile fetch

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, SessionError};
use crate::models::{SessionTokens, TokenGrant, UserProfile};

/// Remote operations the session core depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Validate an access token and return the current profile.
    async fn verify(&self, access_token: &str) -> Result<UserProfile>;

    /// Exchange a refresh token for a new grant.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Revoke the session server-side.
    async fn revoke(&self, tokens: &SessionTokens) -> Result<()>;

    /// Fetch the current user's profile.
    async fn profile(&self, access_token: &str) -> Result<UserProfile>;
}

/// Auth API over HTTP.
#[derive(Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::from(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(SessionError::Rejected(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(SessionError::Api(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    check_response(response)
        .await?
        .json()
        .await
        .map_err(|e| SessionError::Api(format!("JSON parse error: {}", e)))
}

/// Profile responses come either bare or wrapped as `{ "user": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl From<ProfileEnvelope> for UserProfile {
    fn from(envelope: ProfileEnvelope) -> Self {
        match envelope {
            ProfileEnvelope::Wrapped { user } => user,
            ProfileEnvelope::Bare(user) => user,
        }
    }
}

/// Token refresh response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    /// Absent when the backend does not rotate refresh tokens
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn verify(&self, access_token: &str) -> Result<UserProfile> {
        let envelope: ProfileEnvelope = self.get_json("/auth/verify", access_token).await?;
        Ok(envelope.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| SessionError::Transport(format!("Token refresh request failed: {}", e)))?;

        let body: RefreshResponse = check_response_json(response).await?;

        Ok(TokenGrant {
            tokens: SessionTokens {
                access_token: body.access_token,
                refresh_token: body
                    .refresh_token
                    .unwrap_or_else(|| refresh_token.to_string()),
            },
            user: body.user,
        })
    }

    async fn revoke(&self, tokens: &SessionTokens) -> Result<()> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(&tokens.access_token)
            .json(&serde_json::json!({ "refreshToken": tokens.refresh_token }))
            .send()
            .await
            .map_err(|e| SessionError::Transport(format!("Logout request failed: {}", e)))?;

        check_response(response).await?;
        tracing::info!("Session revoked");
        Ok(())
    }

    async fn profile(&self, access_token: &str) -> Result<UserProfile> {
        let envelope: ProfileEnvelope = self.get_json("/users/me", access_token).await?;
        Ok(envelope.into())
    }
}
