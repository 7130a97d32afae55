// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unverified decoding of access-token claims.
//!
//! The client never holds the signing key, so the payload segment is only
//! parsed for display and expiry scheduling. Every trust decision is made by
//! the backend (verify/refresh) or by the short fast-path window after a
//! fresh login redirect.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::Role;

/// Claim names tried, in priority order, for each profile field.
const SUBJECT_CLAIMS: &[&str] = &["sub", "id", "userId"];
const NAME_CLAIMS: &[&str] = &["name", "fullName"];
const PHONE_CLAIMS: &[&str] = &["phoneNumber", "phone"];
const PICTURE_CLAIMS: &[&str] = &["profilePicture", "picture", "avatar"];

/// Token payload decoding errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClaimsError {
    #[error("token is not JWT-shaped (expected 3 segments, found {0})")]
    Malformed(usize),

    #[error("payload segment is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not valid JSON: {0}")]
    Payload(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no subject claim")]
    MissingSubject,
}

impl From<serde_json::Error> for ClaimsError {
    fn from(err: serde_json::Error) -> Self {
        ClaimsError::Payload(err.to_string())
    }
}

/// Claims embedded in an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    raw: Map<String, Value>,
}

/// Decode the payload segment of a JWT-shaped token without validating it.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::Malformed(segments.len()));
    }

    // Some issuers pad the segment; the unpadded engine rejects '='.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;

    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(raw) => Ok(TokenClaims { raw }),
        _ => Err(ClaimsError::NotAnObject),
    }
}

impl TokenClaims {
    pub fn from_map(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// First non-empty string claim among `keys`. Numeric claims are
    /// rendered as strings (some issuers emit numeric user ids).
    fn first_string(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.raw.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn subject(&self) -> Option<String> {
        self.first_string(SUBJECT_CLAIMS)
    }

    pub fn email(&self) -> Option<String> {
        self.first_string(&["email"])
    }

    pub fn name(&self) -> Option<String> {
        self.first_string(NAME_CLAIMS)
    }

    pub fn phone(&self) -> Option<String> {
        self.first_string(PHONE_CLAIMS)
    }

    pub fn picture(&self) -> Option<String> {
        self.first_string(PICTURE_CLAIMS)
    }

    pub fn role(&self) -> Role {
        self.first_string(&["role"])
            .map(Role::from)
            .unwrap_or_default()
    }

    /// Boolean claim, `false` when absent or not a boolean.
    pub fn flag(&self, key: &str) -> bool {
        self.raw.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// `exp` claim in Unix seconds.
    pub fn exp(&self) -> Option<i64> {
        let exp = self.raw.get("exp")?;
        exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp()?, 0)
    }

    /// A token without `exp` is never treated as expired on the client.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_claims_success() {
        let token = token_with_payload(&json!({
            "sub": "user-42",
            "email": "agent@example.com",
            "role": "agent",
            "exp": 4102444800i64
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("user-42"));
        assert_eq!(claims.role(), Role::Agent);
        assert_eq!(claims.exp(), Some(4102444800));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_subject_priority() {
        let claims = decode_claims(&token_with_payload(&json!({
            "id": "from-id",
            "userId": "from-user-id"
        })))
        .unwrap();
        assert_eq!(claims.subject().as_deref(), Some("from-id"));

        let claims = decode_claims(&token_with_payload(&json!({
            "sub": "from-sub",
            "id": "from-id"
        })))
        .unwrap();
        assert_eq!(claims.subject().as_deref(), Some("from-sub"));

        let claims = decode_claims(&token_with_payload(&json!({ "userId": 77 }))).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("77"));
    }

    #[test]
    fn test_padded_payload_accepted() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        // 16 bytes of JSON -> base64 needs padding
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"abcdefg"}"#);
        assert!(body.ends_with('='));

        let claims = decode_claims(&format!("{}.{}.sig", header, body)).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("abcdefg"));
    }

    #[test]
    fn test_decode_claims_malformed() {
        assert!(matches!(
            decode_claims("not-a-token"),
            Err(ClaimsError::Malformed(1))
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(ClaimsError::Malformed(4))
        ));
        assert!(matches!(
            decode_claims("header.!!!not-base64!!!.sig"),
            Err(ClaimsError::Encoding(_))
        ));

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(matches!(
            decode_claims(&not_json),
            Err(ClaimsError::Payload(_))
        ));

        let array = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"[1,2,3]"));
        assert!(matches!(
            decode_claims(&array),
            Err(ClaimsError::NotAnObject)
        ));
    }

    #[test]
    fn test_expiry() {
        let claims = decode_claims(&token_with_payload(&json!({ "sub": "x", "exp": 1000 }))).unwrap();
        assert!(claims.is_expired());
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1000);

        let no_exp = decode_claims(&token_with_payload(&json!({ "sub": "x" }))).unwrap();
        assert!(!no_exp.is_expired());
        assert_eq!(no_exp.expires_at(), None);
    }
}
