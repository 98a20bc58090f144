//! Bearer token verification.
//!
//! A token is `base64url(claims) "." hex(mac)` where the MAC is a keyed
//! BLAKE3 hash of the encoded claims. The key is derived from the configured
//! secret, so tokens are only valid for the deployment that issued them.
//! Admin rights come from configuration, never from the token.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::domain::models::identity::Identity;
use crate::backend::domain::models::{PointsError, PointsResult};

const KEY_CONTEXT: &str = "points-economy identity token v1";

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Expiry, seconds since the epoch
    exp: i64,
}

#[derive(Clone)]
pub struct TokenAuthority {
    /// None when no secret is configured; every token is then rejected
    key: Option<[u8; 32]>,
    admin_uids: Arc<HashSet<String>>,
}

impl TokenAuthority {
    pub fn new(secret: &str, admin_uids: &[String]) -> Self {
        let key = (!secret.is_empty()).then(|| blake3::derive_key(KEY_CONTEXT, secret.as_bytes()));
        Self {
            key,
            admin_uids: Arc::new(admin_uids.iter().cloned().collect()),
        }
    }

    pub fn issue(&self, uid: &str, name: Option<&str>, expires_at: DateTime<Utc>) -> PointsResult<String> {
        let key = self
            .key
            .ok_or_else(|| PointsError::Validation("No token secret is configured".to_string()))?;
        if uid.trim().is_empty() {
            return Err(PointsError::Validation("uid is required".to_string()));
        }

        let claims = TokenClaims {
            uid: uid.trim().to_string(),
            name: name.map(str::to_string),
            exp: expires_at.timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(anyhow::Error::from)?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let mac = blake3::keyed_hash(&key, encoded.as_bytes());
        Ok(format!("{}.{}", encoded, mac.to_hex()))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> PointsResult<Identity> {
        let key = self
            .key
            .ok_or_else(|| PointsError::Authentication("Token verification is not configured".to_string()))?;

        let (encoded, signature) = token
            .split_once('.')
            .ok_or_else(|| PointsError::Authentication("Malformed token".to_string()))?;

        let mut provided = [0u8; 32];
        hex::decode_to_slice(signature, &mut provided)
            .map_err(|_| PointsError::Authentication("Malformed token signature".to_string()))?;
        // blake3::Hash compares in constant time
        if blake3::keyed_hash(&key, encoded.as_bytes()) != blake3::Hash::from(provided) {
            return Err(PointsError::Authentication("Invalid token signature".to_string()));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| PointsError::Authentication("Malformed token payload".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| PointsError::Authentication("Malformed token claims".to_string()))?;

        if claims.exp <= now.timestamp() {
            return Err(PointsError::Authentication("Token expired".to_string()));
        }
        if claims.uid.trim().is_empty() {
            return Err(PointsError::Authentication("Token has no subject".to_string()));
        }

        let name = claims
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| claims.uid.clone());
        Ok(Identity {
            is_admin: self.admin_uids.contains(&claims.uid),
            uid: claims.uid,
            name,
        })
    }

    /// Identity from the `Authorization: Bearer` header
    pub fn identify(&self, headers: &HeaderMap, now: DateTime<Utc>) -> PointsResult<Identity> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| PointsError::Authentication("Missing bearer token".to_string()))?
            .to_str()
            .map_err(|_| PointsError::Authentication("Malformed authorization header".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PointsError::Authentication("Missing bearer token".to_string()))?;

        let identity = self.verify(token, now)?;
        debug!("Authenticated {}", identity.uid);
        Ok(identity)
    }
}

pub fn require_admin(identity: &Identity) -> PointsResult<()> {
    if identity.is_admin {
        Ok(())
    } else {
        Err(PointsError::Authorization(format!(
            "{} may not change the rotation policy",
            identity.uid
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    fn authority() -> TokenAuthority {
        TokenAuthority::new("test-secret", &["ops".to_string()])
    }

    #[test]
    fn test_issue_and_verify() {
        let authority = authority();
        let token = authority.issue("alice", Some("Alice"), now() + Duration::hours(1)).unwrap();
        let identity = authority.verify(&token, now()).unwrap();
        assert_eq!(identity.uid, "alice");
        assert_eq!(identity.name, "Alice");
        assert!(!identity.is_admin);

        let admin = authority.issue("ops", None, now() + Duration::hours(1)).unwrap();
        let identity = authority.verify(&admin, now()).unwrap();
        assert!(identity.is_admin);
        assert_eq!(identity.name, "ops");
        assert!(require_admin(&identity).is_ok());
    }

    #[test]
    fn test_rejects_tampering_expiry_and_foreign_secret() {
        let authority = authority();
        let token = authority.issue("alice", None, now() + Duration::hours(1)).unwrap();

        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = URL_SAFE_NO_PAD.encode(br#"{"uid":"ops","exp":9999999999}"#);
        let forged = format!("{}.{}", forged_claims, signature);
        assert!(matches!(authority.verify(&forged, now()), Err(PointsError::Authentication(_))));

        let expired = authority.issue("alice", None, now() - Duration::seconds(1)).unwrap();
        assert!(matches!(authority.verify(&expired, now()), Err(PointsError::Authentication(_))));

        let other = TokenAuthority::new("other-secret", &[]);
        assert!(other.verify(&token, now()).is_err());

        assert!(authority.verify("not-a-token", now()).is_err());
    }

    #[test]
    fn test_empty_secret_rejects_everything() {
        let unconfigured = TokenAuthority::new("", &[]);
        assert!(unconfigured.issue("alice", None, now() + Duration::hours(1)).is_err());
        let token = authority().issue("alice", None, now() + Duration::hours(1)).unwrap();
        assert!(matches!(unconfigured.verify(&token, now()), Err(PointsError::Authentication(_))));
    }

    #[test]
    fn test_identify_reads_bearer_header() {
        let authority = authority();
        let mut headers = HeaderMap::new();
        assert!(authority.identify(&headers, now()).is_err());

        let token = authority.issue("alice", None, now() + Duration::hours(1)).unwrap();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        assert_eq!(authority.identify(&headers, now()).unwrap().uid, "alice");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(authority.identify(&headers, now()).is_err());
    }

    #[test]
    fn test_non_admin_is_refused() {
        let identity = Identity {
            uid: "alice".to_string(),
            name: "alice".to_string(),
            is_admin: false,
        };
        assert!(matches!(require_admin(&identity), Err(PointsError::Authorization(_))));
    }
}
