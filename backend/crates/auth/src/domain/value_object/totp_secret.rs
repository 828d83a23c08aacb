//! TOTP Secret Value Object
//!
//! Authenticator-app compatible settings: SHA1, 6 digits, 30 second step,
//! one step of clock skew.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{AuthError, AuthResult};

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpSecret {
    secret_base32: String,
}

impl TotpSecret {
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Stored base32 value
    pub fn from_base32(secret: impl Into<String>) -> AuthResult<Self> {
        let secret_base32 = secret.into();
        Secret::Encoded(secret_base32.clone())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {e}")))?;

        Ok(Self { secret_base32 })
    }

    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    fn to_totp(&self, issuer: &str, account_name: &str) -> AuthResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {e}")))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret,
            Some(issuer.to_string()),
            account_name.to_string(),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to create TOTP: {e}")))
    }

    pub fn verify(&self, code: &str, issuer: &str, account_name: &str) -> AuthResult<bool> {
        let code = code.trim();
        if code.len() != TOTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }
        let totp = self.to_totp(issuer, account_name)?;
        Ok(totp.check_current(code).unwrap_or(false))
    }

    #[cfg(test)]
    pub fn generate_current(&self, issuer: &str, account_name: &str) -> AuthResult<String> {
        self.to_totp(issuer, account_name)?
            .generate_current()
            .map_err(|e| AuthError::Internal(format!("Failed to generate TOTP: {e}")))
    }

    /// QR code as base64-encoded PNG
    pub fn qr_code(&self, issuer: &str, account_name: &str) -> AuthResult<String> {
        self.to_totp(issuer, account_name)?
            .get_qr_base64()
            .map_err(|e| AuthError::Internal(format!("Failed to generate QR code: {e}")))
    }

    /// otpauth:// URL for manual entry
    pub fn otpauth_url(&self, issuer: &str, account_name: &str) -> AuthResult<String> {
        Ok(self.to_totp(issuer, account_name)?.get_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "Verification Server";
    const ACCOUNT: &str = "tracer@example.com";

    #[test]
    fn test_totp_secret_verify() {
        let secret = TotpSecret::generate();

        let code = secret.generate_current(ISSUER, ACCOUNT).unwrap();
        assert!(secret.verify(&code, ISSUER, ACCOUNT).unwrap());
        assert!(!secret.verify("12345", ISSUER, ACCOUNT).unwrap());
        assert!(!secret.verify("abcdef", ISSUER, ACCOUNT).unwrap());
    }

    #[test]
    fn test_totp_secret_from_base32() {
        let secret = TotpSecret::generate();
        let restored = TotpSecret::from_base32(secret.as_base32()).unwrap();
        assert_eq!(secret, restored);
        assert!(TotpSecret::from_base32("not base32 !!").is_err());
    }

    #[test]
    fn test_otpauth_url_carries_issuer() {
        let secret = TotpSecret::generate();
        let url = secret.otpauth_url(ISSUER, ACCOUNT).unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("issuer=Verification"));
        assert!(!secret.qr_code(ISSUER, ACCOUNT).unwrap().is_empty());
    }
}
