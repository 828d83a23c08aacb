//! API keys for authorized apps
//!
//! Wire format: `<base64url(32 random bytes)>.<realm id>.<base64url(sig)>`
//! where `sig = HMAC(secret, "<random>.<realm id>")`. The realm is readable
//! from the key itself, the signature rejects forged keys without a database
//! round trip, and only `HMAC(secret, full key)` is persisted.

use kernel::id::RealmId;
use platform::crypto::{from_base64_url, hmac_sha256, hmac_sha256_verify, random_token, to_base64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RANDOM_BYTES: usize = 32;
const PREVIEW_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ApiKeyType {
    /// Issues and manages codes
    Admin = 0,
    /// Mobile devices: verify and certificate
    Device = 1,
    /// Reads realm statistics
    Stats = 2,
}

impl ApiKeyType {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApiKeyType::Admin => "admin",
            ApiKeyType::Device => "device",
            ApiKeyType::Stats => "stats",
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(ApiKeyType::Admin),
            1 => Some(ApiKeyType::Device),
            2 => Some(ApiKeyType::Stats),
            _ => None,
        }
    }
}

impl fmt::Display for ApiKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiKeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ApiKeyType::Admin),
            "device" => Ok(ApiKeyType::Device),
            "stats" => Ok(ApiKeyType::Stats),
            other => Err(format!("unknown API key type: {other}")),
        }
    }
}

/// A freshly generated key; `full_key` is shown to the user exactly once
pub struct GeneratedApiKey {
    pub full_key: String,
    pub hmac: String,
    pub preview: String,
}

impl fmt::Debug for GeneratedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedApiKey")
            .field("full_key", &"[REDACTED]")
            .field("preview", &self.preview)
            .finish()
    }
}

/// A presented key whose signature checked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedApiKey {
    pub realm_id: RealmId,
    /// Lookup value for the stored HMAC
    pub hmac: String,
}

pub fn generate_api_key(realm_id: RealmId, secret: &[u8]) -> GeneratedApiKey {
    let random = random_token(RANDOM_BYTES);
    let signed = format!("{}.{}", random, realm_id);
    let sig = platform::crypto::to_base64_url(&hmac_sha256(secret, signed.as_bytes()));
    let full_key = format!("{}.{}", signed, sig);

    GeneratedApiKey {
        hmac: stored_hmac(&full_key, secret),
        preview: random.chars().take(PREVIEW_LEN).collect(),
        full_key,
    }
}

/// Check the structure and signature of a presented key
pub fn verify_api_key(full_key: &str, secret: &[u8]) -> Option<VerifiedApiKey> {
    let full_key = full_key.trim();
    let mut parts = full_key.split('.');
    let (random, realm, sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || random.is_empty() {
        return None;
    }

    let realm_id = realm.parse::<RealmId>().ok()?;
    let sig = from_base64_url(sig).ok()?;
    let signed = format!("{}.{}", random, realm);
    if !hmac_sha256_verify(secret, signed.as_bytes(), &sig) {
        return None;
    }

    Some(VerifiedApiKey {
        realm_id,
        hmac: stored_hmac(full_key, secret),
    })
}

fn stored_hmac(full_key: &str, secret: &[u8]) -> String {
    to_base64(&hmac_sha256(secret, full_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_generated_key_verifies() {
        let realm_id = RealmId::new();
        let key = generate_api_key(realm_id, SECRET);

        assert_eq!(key.full_key.split('.').count(), 3);
        assert!(key.full_key.contains(&realm_id.to_string()));
        assert_eq!(key.preview.len(), PREVIEW_LEN);

        let verified = verify_api_key(&key.full_key, SECRET).unwrap();
        assert_eq!(verified.realm_id, realm_id);
        assert_eq!(verified.hmac, key.hmac);
    }

    #[test]
    fn test_forged_and_malformed_keys_rejected() {
        let realm_id = RealmId::new();
        let key = generate_api_key(realm_id, SECRET);

        assert!(verify_api_key(&key.full_key, b"another-secret").is_none());

        // Re-target the key at another realm
        let other = RealmId::new().to_string();
        let mut parts: Vec<&str> = key.full_key.split('.').collect();
        parts[1] = &other;
        assert!(verify_api_key(&parts.join("."), SECRET).is_none());

        assert!(verify_api_key("", SECRET).is_none());
        assert!(verify_api_key("a.b", SECRET).is_none());
        assert!(verify_api_key(&format!("{}.extra", key.full_key), SECRET).is_none());
    }

    #[test]
    fn test_key_type_parse() {
        assert_eq!("Device".parse::<ApiKeyType>(), Ok(ApiKeyType::Device));
        assert_eq!(ApiKeyType::from_id(2), Some(ApiKeyType::Stats));
        assert!("root".parse::<ApiKeyType>().is_err());
    }

    #[test]
    fn test_debug_hides_full_key() {
        let key = generate_api_key(RealmId::new(), SECRET);
        assert!(!format!("{:?}", key).contains(&key.full_key));
    }
}
