// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation side effects issued by the session core.

use tokio::sync::watch;

/// Well-known client routes.
pub mod route {
    pub const LOGIN: &str = "/auth/login";
    pub const CALLBACK: &str = "/auth/callback";
    pub const DASHBOARD: &str = "/dashboard";
    pub const UNAUTHORIZED: &str = "/unauthorized";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// In-app route change
    Soft,
    /// Full reload of the target; the next page re-reads the session store
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub kind: NavigationKind,
}

impl Navigation {
    pub fn soft(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NavigationKind::Soft,
        }
    }

    pub fn hard(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NavigationKind::Hard,
        }
    }
}

/// Sink for navigation requests (the router of whatever shell embeds us).
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: Navigation);
}

/// Navigator that logs each request and keeps the latest one observable.
#[derive(Debug)]
pub struct LogNavigator {
    current: watch::Sender<Option<Navigation>>,
}

impl LogNavigator {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn current(&self) -> Option<Navigation> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Navigation>> {
        self.current.subscribe()
    }
}

impl Default for LogNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for LogNavigator {
    fn navigate(&self, to: Navigation) {
        tracing::info!(path = %to.path, kind = ?to.kind, "Navigating");
        self.current.send_replace(Some(to));
    }
}

/// Login route, carrying the intended destination as `next` when known.
pub fn login_redirect(intended: Option<&str>) -> String {
    match intended {
        Some(path) if !path.is_empty() && path != route::LOGIN => {
            format!("{}?next={}", route::LOGIN, urlencoding::encode(path))
        }
        _ => route::LOGIN.to_string(),
    }
}
