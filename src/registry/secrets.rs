//! Client secret digests and constant-time verification.
//!
//! Plaintext secrets never outlive loading: each one is reduced to its SHA-256
//! digest once, and verification hashes the presented value and compares it
//! against every stored digest.

use crate::errors::SecretError;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::{Choice, ConstantTimeEq};

/// Length of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// One stored secret hash; several may coexist during rotation
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest {
    digest: [u8; DIGEST_LEN],
    /// Operator note, e.g. which deployment holds the secret
    pub description: Option<String>,
    /// Secrets stop verifying at this instant
    pub expiration: Option<DateTime<Utc>>,
}

impl SecretDigest {
    /// Hash a plaintext secret supplied by secret management
    pub fn from_plaintext(secret: &str) -> Result<Self, SecretError> {
        if secret.is_empty() {
            return Err(SecretError::EmptySecret);
        }
        Ok(Self {
            digest: sha256(secret),
            description: None,
            expiration: None,
        })
    }

    /// Accept a digest that was hashed elsewhere (base64 of the SHA-256 bytes)
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretError::MalformedDigest(e.to_string()))?;
        let digest: [u8; DIGEST_LEN] = bytes.as_slice().try_into().map_err(|_| {
            SecretError::MalformedDigest(format!(
                "expected {DIGEST_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            digest,
            description: None,
            expiration: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_expiration(mut self, expiration: Option<DateTime<Utc>>) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_none_or(|expiration| expiration > now)
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDigest")
            .field("digest", &"[redacted]")
            .field("description", &self.description)
            .field("expiration", &self.expiration)
            .finish()
    }
}

fn sha256(value: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Check a presented secret against the stored digests, ignoring expiration.
pub fn verify(presented: &str, stored: &[SecretDigest]) -> bool {
    verify_digests(presented, stored, None)
}

/// Check a presented secret against the digests still active at `now`.
pub fn verify_at(presented: &str, stored: &[SecretDigest], now: DateTime<Utc>) -> bool {
    verify_digests(presented, stored, Some(now))
}

fn verify_digests(presented: &str, stored: &[SecretDigest], now: Option<DateTime<Utc>>) -> bool {
    if presented.is_empty() || stored.is_empty() {
        return false;
    }

    let candidate = sha256(presented);

    // Every digest is compared; no early exit on a match.
    let mut matched = Choice::from(0u8);
    for entry in stored {
        let active = Choice::from(now.is_none_or(|now| entry.is_active_at(now)) as u8);
        matched |= entry.digest[..].ct_eq(&candidate[..]) & active;
    }
    matched.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const CLIENT_SECRET: &str = "511536EF-F270-4058-80CA-1C89C192F69A";
    // base64(SHA-256(CLIENT_SECRET))
    const CLIENT_SECRET_SHA256: &str = "fU7fRb+g6YdlniuSqviOLWNkda1M/MuPtH6zNI9inF8=";

    #[test]
    fn test_plaintext_and_prehashed_digests_agree() {
        let hashed = SecretDigest::from_plaintext(CLIENT_SECRET).unwrap();
        let imported = SecretDigest::from_base64(CLIENT_SECRET_SHA256).unwrap();
        assert_eq!(hashed, imported);
    }

    #[test]
    fn test_verify_membership() {
        let stored = vec![SecretDigest::from_plaintext(CLIENT_SECRET).unwrap()];
        assert!(verify(CLIENT_SECRET, &stored));
        assert!(!verify("511536ef-f270-4058-80ca-1c89c192f69a", &stored));
        assert!(!verify("wrong", &stored));
    }

    #[test]
    fn test_verify_rotation() {
        let stored = vec![
            SecretDigest::from_plaintext("old-secret").unwrap(),
            SecretDigest::from_plaintext("new-secret").unwrap(),
        ];
        assert!(verify("old-secret", &stored));
        assert!(verify("new-secret", &stored));
        assert!(!verify("other-secret", &stored));
    }

    #[test]
    fn test_verify_empty_inputs() {
        let stored = vec![SecretDigest::from_plaintext(CLIENT_SECRET).unwrap()];
        assert!(!verify("", &stored));
        assert!(!verify(CLIENT_SECRET, &[]));
        assert!(!verify("", &[]));
    }

    #[test]
    fn test_verify_at_skips_expired() {
        let now = Utc::now();
        let stored = vec![
            SecretDigest::from_plaintext("expired")
                .unwrap()
                .with_expiration(Some(now - Duration::days(1))),
            SecretDigest::from_plaintext("current")
                .unwrap()
                .with_expiration(Some(now + Duration::days(1))),
        ];
        assert!(!verify_at("expired", &stored, now));
        assert!(verify_at("current", &stored, now));
        assert!(verify("expired", &stored));
    }

    #[test]
    fn test_malformed_digests() {
        assert!(matches!(
            SecretDigest::from_base64("not base64!"),
            Err(SecretError::MalformedDigest(_))
        ));
        assert!(matches!(
            SecretDigest::from_base64("c2hvcnQ="),
            Err(SecretError::MalformedDigest(_))
        ));
        assert_eq!(
            SecretDigest::from_plaintext("").unwrap_err(),
            SecretError::EmptySecret
        );
    }

    #[test]
    fn test_debug_redacts_digest() {
        let digest = SecretDigest::from_plaintext(CLIENT_SECRET).unwrap();
        let rendered = format!("{digest:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains(CLIENT_SECRET_SHA256));
    }
}
