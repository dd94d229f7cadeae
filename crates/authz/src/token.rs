//! Stateless, signed session tokens.
//!
//! A token is `base64url(claims_json).base64url(hmac_sha256(payload))`. The
//! server keeps no record of issued tokens; they stay valid until `exp`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("session token secret is too short (min {MIN_SECRET_LEN} bytes)")]
    SecretTooShort,

    #[error("invalid session token format")]
    InvalidFormat,

    #[error("session token signature is invalid")]
    InvalidSignature,

    #[error("session token is expired")]
    Expired,

    #[error("failed to decode session token payload")]
    PayloadDecode,

    #[error("failed to parse session token payload")]
    PayloadParse,

    #[error("session token has no subject")]
    InvalidSubject,
}

/// What a token asserts: who, and for how long (unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

impl SessionClaims {
    pub fn is_expired(&self, reference_secs: u64) -> bool {
        reference_secs >= self.exp
    }
}

#[derive(Clone)]
pub struct TokenService {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::SecretTooShort);
        }

        Ok(Self {
            secret: Arc::<[u8]>::from(secret),
            ttl,
        })
    }

    /// Issue a token for `subject`, valid for the configured TTL from `issued_at`.
    pub fn issue(&self, subject: &str, issued_at: u64) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };

        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::PayloadParse)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature_b64 = URL_SAFE_NO_PAD.encode(self.sign(payload_b64.as_bytes())?);
        Ok(format!("{payload_b64}.{signature_b64}"))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str, reference_secs: u64) -> Result<SessionClaims, TokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(TokenError::InvalidFormat)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::InvalidFormat)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::InvalidSignature)?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::PayloadDecode)?;

        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::PayloadParse)?;

        if claims.sub.is_empty() {
            return Err(TokenError::InvalidSubject);
        }
        if claims.is_expired(reference_secs) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::InvalidSignature)?;
        mac.update(bytes);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(
            b"01234567890123456789012345678901".to_vec(),
            Duration::from_secs(3600),
        )
        .expect("valid service")
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let service = test_service();
        let token = service.issue("65a1f0c2e4b0a1b2c3d4e5f6", 1_000).unwrap();

        let claims = service.verify(&token, 1_500).expect("verify token");
        assert_eq!(claims.sub, "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 4_600);
    }

    #[test]
    fn rejects_short_secret() {
        assert!(matches!(
            TokenService::new(b"short".to_vec(), Duration::from_secs(60)),
            Err(TokenError::SecretTooShort)
        ));
    }

    #[test]
    fn rejects_tampered_token() {
        let service = test_service();
        let token = service.issue("user", 10).unwrap();
        let (payload, signature) = token.split_once('.').expect("token split");
        let mut chars: Vec<char> = payload.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered_payload: String = chars.into_iter().collect();
        let tampered = format!("{tampered_payload}.{signature}");

        assert_eq!(service.verify(&tampered, 20), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let other = TokenService::new(
            b"abcdefghijabcdefghijabcdefghijab".to_vec(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let token = other.issue("user", 10).unwrap();

        assert_eq!(
            test_service().verify(&token, 20),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_expired_token() {
        let service = test_service();
        let token = service.issue("user", 1_000).unwrap();

        assert_eq!(service.verify(&token, 4_599).map(|c| c.sub), Ok("user".to_string()));
        assert_eq!(service.verify(&token, 4_600), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_token_without_subject() {
        let service = test_service();
        let token = service.issue("", 1_000).unwrap();

        assert_eq!(service.verify(&token, 1_001), Err(TokenError::InvalidSubject));
    }

    #[test]
    fn rejects_malformed_token() {
        let service = test_service();
        assert_eq!(service.verify("no-dot-here", 0), Err(TokenError::InvalidFormat));
        assert_eq!(service.verify("abc.***", 0), Err(TokenError::InvalidFormat));
    }
}
