// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token pair and refresh grants.

use std::fmt;

use crate::claims::{decode_claims, ClaimsError};
use crate::models::UserProfile;

/// Access/refresh token pair held in the session store.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// Short-lived bearer token with embedded claims
    pub access_token: String,
    /// Long-lived opaque token, only exchanged for new access tokens
    pub refresh_token: String,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Token values must never reach the logs.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Result of a successful token refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub tokens: SessionTokens,
    /// Profile returned by the backend, if it sent one
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    /// Profile for this grant, derived from the new access token when the
    /// backend did not return one.
    pub fn profile(&self) -> Result<UserProfile, ClaimsError> {
        match &self.user {
            Some(user) => Ok(user.clone()),
            None => UserProfile::from_claims(&decode_claims(&self.tokens.access_token)?),
        }
    }
}
