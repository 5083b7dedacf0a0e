//! Signing key references.
//!
//! Release artifacts are signed remotely with a Cloud KMS key. This tool only
//! checks that the reference names a concrete key version before a build is
//! submitted; the signing itself happens inside the remote build.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static KMS_KEY_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^projects/([^/]+)/locations/([^/]+)/keyRings/([^/]+)/cryptoKeys/([^/]+)/cryptoKeyVersions/([^/]+)$",
    )
    .expect("KMS key version regex is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("signing key reference is empty")]
    EmptyReference,

    #[error("invalid GCP KMS key version name {0:?}, expected projects/<project>/locations/<location>/keyRings/<ring>/cryptoKeys/<key>/cryptoKeyVersions/<version>")]
    InvalidKeyName(String),
}

/// Handle to a Cloud KMS asymmetric signing key version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmsKey {
    pub project: String,
    pub location: String,
    pub key_ring: String,
    pub key: String,
    pub version: String,
}

impl KmsKey {
    /// Parse a full key version resource name.
    pub fn parse(name: &str) -> Result<Self, SignError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SignError::EmptyReference);
        }

        let caps = KMS_KEY_VERSION_RE
            .captures(name)
            .ok_or_else(|| SignError::InvalidKeyName(name.to_string()))?;

        Ok(KmsKey {
            project: caps[1].to_string(),
            location: caps[2].to_string(),
            key_ring: caps[3].to_string(),
            key: caps[4].to_string(),
            version: caps[5].to_string(),
        })
    }
}

impl fmt::Display for KmsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project, self.location, self.key_ring, self.key, self.version
        )
    }
}

/// Checks a signing key reference before any signing obligations are taken on.
pub trait SigningKeyValidator: Send + Sync {
    fn validate_key(&self, reference: &str) -> Result<KmsKey, SignError>;
}

/// Validator for GCP KMS key version names
pub struct GcpKmsKeyValidator;

impl SigningKeyValidator for GcpKmsKeyValidator {
    fn validate_key(&self, reference: &str) -> Result<KmsKey, SignError> {
        let key = KmsKey::parse(reference)?;
        log::debug!(
            "[Sign] Using KMS key {} (ring {}, {}) in project {}",
            key.key,
            key.key_ring,
            key.location,
            key.project
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "projects/cert-manager-release/locations/europe-west1/keyRings/cert-manager-release/cryptoKeys/cert-manager-release-signing-key/cryptoKeyVersions/1";

    #[test]
    fn test_parse_valid_key() {
        let key = KmsKey::parse(KEY).unwrap();
        assert_eq!(key.project, "cert-manager-release");
        assert_eq!(key.location, "europe-west1");
        assert_eq!(key.key_ring, "cert-manager-release");
        assert_eq!(key.key, "cert-manager-release-signing-key");
        assert_eq!(key.version, "1");
        assert_eq!(key.to_string(), KEY);
    }

    #[test]
    fn test_parse_rejects_key_without_version() {
        let name = "projects/p/locations/l/keyRings/r/cryptoKeys/k";
        assert_eq!(
            KmsKey::parse(name),
            Err(SignError::InvalidKeyName(name.to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(KmsKey::parse("  "), Err(SignError::EmptyReference));
    }

    #[test]
    fn test_validator() {
        assert!(GcpKmsKeyValidator.validate_key(KEY).is_ok());
        assert!(GcpKmsKeyValidator.validate_key("not-a-key").is_err());
    }
}
