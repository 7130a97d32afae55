// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use realty_session::api::AuthApi;
use realty_session::config::Config;
use realty_session::context::{AuthContext, SessionSettings};
use realty_session::error::{Result, SessionError};
use realty_session::models::{SessionTokens, TokenGrant, UserProfile};
use realty_session::navigation::{Navigation, Navigator};
use realty_session::routes::create_router;
use realty_session::store::{MemoryStore, SessionStore};
use realty_session::AppState;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Mint a signed access token carrying `claims` plus an `exp` offset from now.
/// The session core never checks the signature; any key works.
#[allow(dead_code)]
pub fn mint_token(mut claims: serde_json::Value, expires_in_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    claims["exp"] = json!(now + expires_in_secs);
    claims["iat"] = json!(now);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test_signing_key_32_bytes_long!!"),
    )
    .unwrap()
}

/// Access token for a typical signed-in user.
#[allow(dead_code)]
pub fn user_token(id: &str, role: &str) -> String {
    mint_token(
        json!({
            "sub": id,
            "email": format!("{}@example.com", id),
            "name": "Pat Doe",
            "role": role,
            "emailVerified": true,
            "onboardingCompleted": true,
        }),
        3600,
    )
}

#[allow(dead_code)]
pub fn profile(id: &str, role: &str) -> UserProfile {
    serde_json::from_value(json!({ "id": id, "name": "Pat Doe", "role": role })).unwrap()
}

/// Scripted auth API with call counters.
pub struct FakeApi {
    pub verify_ok: AtomicBool,
    pub refresh_ok: AtomicBool,
    pub revoke_ok: AtomicBool,
    pub verify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    /// Refresh requests currently outstanding, and the most seen at once
    pub refresh_in_flight: AtomicUsize,
    pub max_refresh_in_flight: AtomicUsize,
    /// Simulated refresh round-trip
    pub refresh_delay: Mutex<Duration>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            verify_ok: AtomicBool::new(true),
            refresh_ok: AtomicBool::new(true),
            revoke_ok: AtomicBool::new(true),
            verify_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            refresh_in_flight: AtomicUsize::new(0),
            max_refresh_in_flight: AtomicUsize::new(0),
            refresh_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn set_verify_ok(&self, ok: bool) {
        self.verify_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        self.refresh_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn max_refresh_in_flight(&self) -> usize {
        self.max_refresh_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn verify(&self, _access_token: &str) -> Result<UserProfile> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.verify_ok.load(Ordering::SeqCst) {
            Ok(profile("u-1", "user"))
        } else {
            Err(SessionError::Rejected(401))
        }
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.refresh_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_refresh_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.refresh_in_flight.fetch_sub(1, Ordering::SeqCst);

        if !self.refresh_ok.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected(401));
        }

        Ok(TokenGrant {
            tokens: SessionTokens::new(user_token("u-1", "user"), format!("refresh-{}", n)),
            user: None,
        })
    }

    async fn revoke(&self, _tokens: &SessionTokens) -> Result<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.revoke_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::Transport("connection refused".to_string()))
        }
    }

    async fn profile(&self, _access_token: &str) -> Result<UserProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let mut user = profile("u-1", "agent");
        user.name = "Pat Updated".to_string();
        Ok(user)
    }
}

/// Navigator that records every request with its (virtual) time.
#[derive(Default)]
pub struct RecordingNavigator {
    pub events: Mutex<Vec<(Navigation, tokio::time::Instant)>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn paths(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(nav, _)| nav.path.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(Navigation, tokio::time::Instant)> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: Navigation) {
        self.events
            .lock()
            .unwrap()
            .push((to, tokio::time::Instant::now()));
    }
}

/// Everything a session-core test needs.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub api: Arc<FakeApi>,
    pub navigator: Arc<RecordingNavigator>,
    pub context: AuthContext,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

#[allow(dead_code)]
pub fn harness_with_store(store: Arc<MemoryStore>) -> Harness {
    let api = FakeApi::new();
    let navigator = RecordingNavigator::new();
    let context = AuthContext::new(
        store.clone(),
        api.clone(),
        navigator.clone(),
        SessionSettings::default(),
        Arc::new(dashmap::DashMap::new()),
    );

    Harness {
        store,
        api,
        navigator,
        context,
    }
}

/// Seed the store the way a previous run would have left it.
#[allow(dead_code)]
pub fn seed_session(store: &MemoryStore, access_token: &str, skip_verification: bool) {
    store.set_batch(&[
        ("accessToken", access_token.to_string()),
        ("refreshToken", "refresh-0".to_string()),
        (
            "user",
            serde_json::to_string(&profile("u-1", "user")).unwrap(),
        ),
    ]);
    if skip_verification {
        store.set("skipVerification", "true");
    }
}

/// Create a test app over an in-memory store and fake API.
/// Returns the router with the harness behind it.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Harness) {
    let harness = harness();
    let state = Arc::new(AppState {
        config: Config::default(),
        context: harness.context.clone(),
    });

    (create_router(state), harness)
}
