//! Session store: durable key-value storage for tokens and the profile.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::models::{SessionTokens, UserProfile};

/// Storage key names as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// JSON-serialized `UserProfile`
    pub const USER: &str = "user";
    /// One-shot "trust the stored tokens on next start" flag (`"true"` or absent)
    pub const SKIP_VERIFICATION: &str = "skipVerification";

    /// Every key owned by a session.
    pub const ALL: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, USER, SKIP_VERIFICATION];
}

/// Key-value passthrough to durable storage.
///
/// Implementations never fail: a missing key reads as `None` and write
/// failures are logged, not returned.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Write a group of entries so that no reader observes part of the group.
    fn set_batch(&self, entries: &[(&str, String)]);

    fn remove_batch(&self, keys: &[&str]);

    /// Read and remove a key.
    fn take(&self, key: &str) -> Option<String> {
        let value = self.get(key);
        if value.is_some() {
            self.remove(key);
        }
        value
    }
}

/// Session-level helpers over any `SessionStore`.
pub trait SessionStoreExt: SessionStore {
    fn load_tokens(&self) -> Option<SessionTokens> {
        let access_token = self.get(keys::ACCESS_TOKEN)?;
        let refresh_token = self.get(keys::REFRESH_TOKEN)?;
        Some(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Stored profile. Unparseable JSON is treated as absent.
    fn load_user(&self) -> Option<UserProfile> {
        let raw = self.get(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user profile is not valid JSON, ignoring");
                None
            }
        }
    }

    fn store_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(json) => self.set(keys::USER, &json),
            Err(e) => tracing::error!(error = %e, "Failed to serialize user profile"),
        }
    }

    /// Persist tokens and profile as one batch. `fresh` marks the session as
    /// freshly issued so the next start skips remote verification once.
    fn persist_session(&self, tokens: &SessionTokens, user: &UserProfile, fresh: bool) {
        let user_json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize user profile");
                return;
            }
        };

        let mut entries = vec![
            (keys::ACCESS_TOKEN, tokens.access_token.clone()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.clone()),
            (keys::USER, user_json),
        ];
        if fresh {
            entries.push((keys::SKIP_VERIFICATION, "true".to_string()));
        } else {
            self.remove(keys::SKIP_VERIFICATION);
        }

        self.set_batch(&entries);
    }

    fn clear_session(&self) {
        self.remove_batch(&keys::ALL);
    }
}

impl<S: SessionStore + ?Sized> SessionStoreExt for S {}
