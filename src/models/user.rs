// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile derived from access-token claims.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::claims::{ClaimsError, TokenClaims};

/// Marketplace role carried in the `role` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
    /// Any role this client does not know about, kept verbatim.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "user" => Role::User,
            "agent" => Role::Agent,
            "admin" => Role::Admin,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile as held by the auth context and stored under the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub onboarding_completed: bool,
    /// Avatar URL
    #[serde(rename = "profilePicture", default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Build a profile from decoded claims, applying the client-side defaults.
    pub fn from_claims(claims: &TokenClaims) -> Result<Self, ClaimsError> {
        let id = claims.subject().ok_or(ClaimsError::MissingSubject)?;
        let email = claims.email();

        let name = claims
            .name()
            .or_else(|| {
                email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            email,
            phone: claims.phone(),
            role: claims.role(),
            email_verified: claims.flag("emailVerified"),
            phone_verified: claims.flag("phoneVerified"),
            onboarding_completed: claims.flag("onboardingCompleted"),
            avatar: claims.picture(),
        })
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}
