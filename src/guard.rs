// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guards for protected pages.

use crate::context::{AuthContext, AuthSnapshot};
use crate::models::Role;
use crate::navigation::{login_redirect, route, Navigation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth is still resolving: show a placeholder, don't navigate
    Loading,
    Render,
    Redirect(String),
}

/// Declarative access rule for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    /// `None` admits any authenticated user
    allowed_roles: Option<Vec<Role>>,
}

impl RouteGuard {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: Some(roles.into_iter().collect()),
        }
    }

    pub fn check(&self, auth: &AuthSnapshot, intended: Option<&str>) -> GuardDecision {
        if auth.is_loading {
            return GuardDecision::Loading;
        }

        let Some(user) = &auth.user else {
            return GuardDecision::Redirect(login_redirect(intended));
        };

        match &self.allowed_roles {
            Some(roles) if !user.has_role(roles) => {
                tracing::debug!(user_id = %user.id, role = %user.role, "Role not allowed");
                GuardDecision::Redirect(route::UNAUTHORIZED.to_string())
            }
            _ => GuardDecision::Render,
        }
    }

    /// Check once against the context and issue the redirect, if any.
    pub fn enforce(&self, context: &AuthContext, path: &str) -> GuardDecision {
        let decision = self.check(&context.snapshot(), Some(path));
        if let GuardDecision::Redirect(to) = &decision {
            context.navigator().navigate(Navigation::soft(to.clone()));
        }
        decision
    }
}
