//! Secret key material
//!
//! Server-wide keys (session signing, code HMAC, API key HMAC) and realm
//! signing keys are 32 random bytes. They are zeroized on drop and never
//! printed.

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{from_base64, random_bytes, to_base64};

pub const SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret is not valid base64")]
    InvalidEncoding,

    #[error("secret must be {expected} bytes (got {actual})")]
    InvalidLength { expected: usize, actual: usize },
}

/// 32 bytes of key material
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret32([u8; SECRET_LEN]);

impl Secret32 {
    pub fn new(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        bytes.copy_from_slice(&random_bytes(SECRET_LEN));
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SecretError> {
        if bytes.len() != SECRET_LEN {
            return Err(SecretError::InvalidLength {
                expected: SECRET_LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; SECRET_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parse standard base64 (as stored in env vars and the database)
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = from_base64(encoded.trim()).map_err(|_| SecretError::InvalidEncoding)?;
        Self::from_slice(&bytes)
    }

    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for Secret32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret32").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        let secret = Secret32::generate();
        let restored = Secret32::from_base64(&secret.to_base64()).unwrap();
        assert_eq!(secret.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let short = to_base64(&[1u8; 16]);
        assert_eq!(
            Secret32::from_base64(&short).unwrap_err(),
            SecretError::InvalidLength {
                expected: 32,
                actual: 16
            }
        );
        assert_eq!(
            Secret32::from_base64("***").unwrap_err(),
            SecretError::InvalidEncoding
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret32::new([7u8; 32]);
        assert_eq!(format!("{:?}", secret), "Secret32(\"[REDACTED]\")");
    }
}
