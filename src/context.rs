// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth context: the single source of truth for who is logged in.
//!
//! One `AuthContext` is constructed at the application root and handed to
//! everything that needs it. Its state moves through:
//!
//! ```text
//! Initializing ──▶ Fresh ──▶ Verified
//!      │             │          │
//!      └─────────────┴──────────┴──▶ Unauthenticated
//! ```
//!
//! `Fresh` is the short trust window right after a login redirect, before
//! the backend has confirmed the token. The first successful refresh or
//! verification promotes it to `Verified`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::AuthApi;
use crate::claims::{decode_claims, ClaimsError};
use crate::error::{Result, SessionError};
use crate::models::{SessionTokens, UserProfile};
use crate::navigation::{route, Navigation, Navigator};
use crate::refresh::{self, RefreshCoordinator, RefreshLocks, RefreshOutcome};
use crate::store::{keys, SessionStore, SessionStoreExt};

/// Silent refresh period (15 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Delay before leaving a failed callback for the login page.
pub const DEFAULT_ERROR_REDIRECT_DELAY: Duration = Duration::from_millis(4000);
/// Delay before leaving a successful callback for the dashboard.
pub const DEFAULT_SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Timings used by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub refresh_interval: Duration,
    pub error_redirect_delay: Duration,
    pub success_redirect_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            error_redirect_delay: DEFAULT_ERROR_REDIRECT_DELAY,
            success_redirect_delay: DEFAULT_SUCCESS_REDIRECT_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored session not yet examined
    Initializing,
    /// Freshly issued, trusted without remote verification
    Fresh(UserProfile),
    /// Confirmed by the backend
    Verified(UserProfile),
    Unauthenticated,
}

impl SessionState {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Fresh(user) | SessionState::Verified(user) => Some(user),
            SessionState::Initializing | SessionState::Unauthenticated => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Initializing => "initializing",
            SessionState::Fresh(_) => "fresh",
            SessionState::Verified(_) => "verified",
            SessionState::Unauthenticated => "unauthenticated",
        }
    }
}

/// What consumers see: the current user and whether auth is still resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub user: Option<UserProfile>,
    pub is_loading: bool,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl From<&SessionState> for AuthSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            user: state.user().cloned(),
            is_loading: state.is_loading(),
        }
    }
}

/// Handle to the application's auth context. Clones share one session.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    store: Arc<dyn SessionStore>,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    settings: SessionSettings,
    coordinator: RefreshCoordinator,
    state: watch::Sender<SessionState>,
    /// Bumped whenever a session begins or ends. Work started under an older
    /// epoch must not touch the current session.
    epoch: AtomicU64,
    /// Serializes state transitions with their store writes.
    transition: Mutex<()>,
    init_lock: tokio::sync::Mutex<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthContext {
    /// Create the context. `refresh_locks` may be shared with other contexts
    /// on the same store so their refreshes coalesce.
    pub fn new(
        store: Arc<dyn SessionStore>,
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
        refresh_locks: RefreshLocks,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);

        Self {
            inner: Arc::new(ContextInner {
                store,
                api,
                navigator,
                settings,
                coordinator: RefreshCoordinator::new(refresh_locks),
                state,
                epoch: AtomicU64::new(0),
                transition: Mutex::new(()),
                init_lock: tokio::sync::Mutex::new(()),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot::from(&*self.inner.state.borrow())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().user().is_some()
    }

    /// Observe state changes (route guards re-check on every change).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Resolve the stored session. Does nothing once resolved.
    pub async fn initialize(&self) {
        let _init = self.inner.init_lock.lock().await;
        if !self.inner.state.borrow().is_loading() {
            return;
        }

        let epoch = self.inner.current_epoch();
        let resolved = self.inner.resolve_stored_session(epoch).await;
        let label = resolved.label();

        let authenticated = self.inner.transition(|| {
            if self.inner.current_epoch() != epoch {
                // A login or logout overtook initialization
                return None;
            }
            match &resolved {
                SessionState::Verified(user) => self.inner.store.store_user(user),
                SessionState::Unauthenticated => self.inner.store.clear_session(),
                _ => {}
            }
            let authenticated = resolved.user().is_some();
            self.inner.state.send_replace(resolved);
            Some(authenticated)
        });

        match authenticated {
            Some(true) => {
                tracing::info!(state = label, "Session initialized");
                self.inner.start_refresh_loop(epoch);
            }
            Some(false) => tracing::info!(state = label, "No usable session"),
            None => tracing::debug!("Initialization superseded"),
        }
    }

    /// Adopt a just-issued session. The tokens must already be persisted.
    pub fn login(&self, tokens: &SessionTokens) -> std::result::Result<UserProfile, ClaimsError> {
        let user = UserProfile::from_claims(&decode_claims(&tokens.access_token)?)?;

        let epoch = self.inner.transition(|| {
            let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner.state.send_replace(SessionState::Fresh(user.clone()));
            epoch
        });
        self.inner.start_refresh_loop(epoch);

        tracing::info!(user_id = %user.id, role = %user.role, "Logged in");
        Ok(user)
    }

    /// End the session: stop refreshing, clear storage, revoke remotely,
    /// then send the viewer to the login page.
    pub async fn logout(&self) {
        self.inner.stop_refresh_loop();
        self.inner.end_session().await;
    }

    /// Re-fetch the profile from the server and replace the current user.
    pub async fn refresh_auth(&self) -> Result<UserProfile> {
        let epoch = self.inner.current_epoch();
        let tokens = self
            .inner
            .store
            .load_tokens()
            .ok_or(SessionError::Unauthorized)?;

        let user = self.inner.api.profile(&tokens.access_token).await?;
        self.inner.adopt(epoch, &user, true)?;

        tracing::info!(user_id = %user.id, "Profile refreshed");
        Ok(user)
    }

    /// Exchange the refresh token now (single-flight). A rejected refresh
    /// ends the session the same way a failed background refresh does.
    pub async fn refresh_session(&self) -> Result<UserProfile> {
        let epoch = self.inner.current_epoch();
        let result = self.inner.refresh_session_at(epoch).await;

        if let Err(e) = &result {
            if e.is_auth_rejection()
                && self.inner.current_epoch() == epoch
                && self.is_authenticated()
            {
                tracing::warn!(error = %e, "Refresh rejected, ending session");
                self.inner.stop_refresh_loop();
                self.inner.end_session().await;
            }
        }

        result
    }

    /// Re-read the session store and resolve it again, without a restart.
    pub async fn reload(&self) {
        self.inner.stop_refresh_loop();
        self.inner.transition(|| {
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.state.send_replace(SessionState::Initializing);
        });
        self.initialize().await;
    }

    /// Tear down background work. Also happens when the last handle drops.
    pub fn unmount(&self) {
        self.inner.stop_refresh_loop();
    }

    pub fn is_refresh_loop_running(&self) -> bool {
        self.inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ContextInner {
    pub(crate) fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn transition<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    async fn resolve_stored_session(&self, epoch: u64) -> SessionState {
        let store = &*self.store;

        // The refresh token is only needed if verification fails
        let access_token = store.get(keys::ACCESS_TOKEN).filter(|t| !t.is_empty());
        let (access_token, user) = match (access_token, store.load_user()) {
            (Some(access_token), Some(user)) => (access_token, user),
            _ => return SessionState::Unauthenticated,
        };

        let fresh = store.take(keys::SKIP_VERIFICATION).as_deref() == Some("true");
        if fresh {
            match decode_claims(&access_token) {
                Ok(claims) if !claims.is_expired() => {
                    tracing::info!(user_id = %user.id, "Trusting freshly issued session");
                    return SessionState::Fresh(user);
                }
                Ok(_) => tracing::info!("Freshly issued token already expired, verifying"),
                Err(e) => tracing::warn!(error = %e, "Freshly issued token unreadable, verifying"),
            }
        }

        match self.api.verify(&access_token).await {
            Ok(profile) => SessionState::Verified(profile),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    rejected = e.is_auth_rejection(),
                    "Session verification failed, attempting refresh"
                );
                match self.refresh_session_at(epoch).await {
                    Ok(profile) => SessionState::Verified(profile),
                    Err(e) => {
                        tracing::warn!(error = %e, "Session refresh failed");
                        SessionState::Unauthenticated
                    }
                }
            }
        }
    }

    pub(crate) async fn refresh_session_at(&self, epoch: u64) -> Result<UserProfile> {
        let commit = |tokens: &SessionTokens, user: &UserProfile| {
            self.transition(|| {
                if self.current_epoch() != epoch {
                    return false;
                }
                self.store.persist_session(tokens, user, false);
                self.state.send_replace(SessionState::Verified(user.clone()));
                true
            })
        };

        match self
            .coordinator
            .refresh(&*self.store, &*self.api, &commit)
            .await?
        {
            RefreshOutcome::Refreshed(user) => Ok(user),
            RefreshOutcome::Coalesced(user) => {
                self.adopt(epoch, &user, false)?;
                Ok(user)
            }
        }
    }

    /// Replace the current user, unless the session has moved on.
    fn adopt(&self, epoch: u64, user: &UserProfile, persist: bool) -> Result<()> {
        self.transition(|| {
            if self.current_epoch() != epoch {
                return Err(SessionError::Unauthorized);
            }
            if persist {
                self.store.store_user(user);
            }
            self.state.send_replace(SessionState::Verified(user.clone()));
            Ok(())
        })
    }

    async fn end_session(&self) {
        // Cleared before the revoke round-trip so the session is gone the
        // moment logout begins.
        let tokens = self.transition(|| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            let tokens = self.store.load_tokens();
            self.store.clear_session();
            self.state.send_replace(SessionState::Unauthenticated);
            tokens
        });

        if let Some(tokens) = tokens {
            if let Err(e) = self.api.revoke(&tokens).await {
                tracing::warn!(error = %e, "Remote revoke failed, session cleared locally");
            }
        }

        tracing::info!("Logged out");
        self.navigator.navigate(Navigation::soft(route::LOGIN));
    }

    /// Called by the refresh loop when its silent refresh fails.
    pub(crate) async fn fail_session(&self, epoch: u64) {
        if self.current_epoch() != epoch {
            return;
        }
        // The loop calling us is finishing on its own; don't abort it mid-logout.
        self.refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.end_session().await;
    }

    fn start_refresh_loop(self: &Arc<Self>, epoch: u64) {
        let handle = tokio::spawn(refresh::run_refresh_loop(
            Arc::downgrade(self),
            self.settings.refresh_interval,
            epoch,
        ));

        let previous = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);

        if let Some(previous) = previous {
            previous.abort();
            tracing::debug!("Replaced running refresh loop");
        }
    }

    fn stop_refresh_loop(&self) {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Refresh loop stopped");
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let slot = self
            .refresh_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
