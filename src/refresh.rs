// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token refresh: the single-flight coordinator and the background loop.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::AuthApi;
use crate::context::ContextInner;
use crate::error::{Result, SessionError};
use crate::models::{SessionTokens, UserProfile};
use crate::store::{SessionStore, SessionStoreExt};

/// Result of one refresh attempt, shared by every caller that joined it.
pub type InFlight = Arc<OnceCell<Result<RefreshOutcome>>>;

/// In-flight refreshes keyed by refresh token, shareable between contexts on
/// the same store.
pub type RefreshLocks = Arc<DashMap<String, InFlight>>;

/// Applies a refresh result to the session. Returns `false` when the session
/// it was started for has ended, in which case the grant is discarded.
pub type CommitFn<'a> = &'a (dyn Fn(&SessionTokens, &UserProfile) -> bool + Sync);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller exchanged the refresh token.
    Refreshed(UserProfile),
    /// Another caller's result was adopted.
    Coalesced(UserProfile),
}

/// Single-flight token refresh.
///
/// At most one refresh request is outstanding per refresh token. Callers
/// that arrive while it runs await the same result, success or failure,
/// instead of spending the refresh token again.
#[derive(Clone)]
pub struct RefreshCoordinator {
    locks: RefreshLocks,
}

impl RefreshCoordinator {
    pub fn new(locks: RefreshLocks) -> Self {
        Self { locks }
    }

    pub async fn refresh(
        &self,
        store: &dyn SessionStore,
        api: &dyn AuthApi,
        commit: CommitFn<'_>,
    ) -> Result<RefreshOutcome> {
        let original = store.load_tokens().ok_or(SessionError::Unauthorized)?;

        let in_flight = self
            .locks
            .entry(original.refresh_token.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut led = false;
        let result = in_flight
            .get_or_init(|| {
                led = true;
                run_exchange(store, api, &original, commit)
            })
            .await
            .clone();

        // Entry stays until the attempt resolves; a later entry under the
        // same key belongs to a newer attempt.
        self.locks
            .remove_if(&original.refresh_token, |_, entry| Arc::ptr_eq(entry, &in_flight));

        match result {
            Ok(RefreshOutcome::Refreshed(user)) if !led => {
                tracing::debug!(user_id = %user.id, "Joined a concurrent refresh");
                Ok(RefreshOutcome::Coalesced(user))
            }
            other => other,
        }
    }
}

async fn run_exchange(
    store: &dyn SessionStore,
    api: &dyn AuthApi,
    original: &SessionTokens,
    commit: CommitFn<'_>,
) -> Result<RefreshOutcome> {
    // A previous attempt may have rotated the tokens after we read them.
    match store.load_tokens() {
        None => return Err(SessionError::Unauthorized),
        Some(current) if current != *original => {
            if let Some(user) = store.load_user() {
                tracing::debug!(user_id = %user.id, "Refresh already completed by a concurrent caller");
                return Ok(RefreshOutcome::Coalesced(user));
            }
        }
        Some(_) => {}
    }

    exchange(api, original, commit).await
}

async fn exchange(
    api: &dyn AuthApi,
    original: &SessionTokens,
    commit: CommitFn<'_>,
) -> Result<RefreshOutcome> {
    let grant = api.refresh(&original.refresh_token).await?;
    let user = grant.profile()?;

    if !commit(&grant.tokens, &user) {
        tracing::debug!("Session ended during refresh, discarding grant");
        return Err(SessionError::Unauthorized);
    }

    tracing::info!(
        user_id = %user.id,
        rotated = grant.tokens.refresh_token != original.refresh_token,
        "Access token refreshed"
    );
    Ok(RefreshOutcome::Refreshed(user))
}

/// Background loop: silently refresh every `period` until the session this
/// loop was started for ends or the context is dropped.
pub(crate) async fn run_refresh_loop(context: Weak<ContextInner>, period: Duration, epoch: u64) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = context.upgrade() else {
            tracing::debug!("Auth context dropped, refresh loop exiting");
            return;
        };
        if inner.current_epoch() != epoch {
            return;
        }

        match inner.refresh_session_at(epoch).await {
            Ok(user) => tracing::debug!(user_id = %user.id, "Silent refresh succeeded"),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    rejected = e.is_auth_rejection(),
                    "Silent refresh failed, ending session"
                );
                inner.fail_session(epoch).await;
                return;
            }
        }
    }
}
