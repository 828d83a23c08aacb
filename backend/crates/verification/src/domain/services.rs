//! Domain Services
//!
//! Code generation and hashing, and the compact HS256 JWS used for
//! verification tokens and certificates.

use chrono::{NaiveDate, NaiveTime};
use jsonwebtoken::errors as jwt;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use platform::crypto::{hmac_sha256, random_alphanumeric, random_digits, to_base64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A freshly generated pair; the plain codes leave the server exactly once
#[derive(Debug, Clone)]
pub struct GeneratedCodes {
    pub code: String,
    pub long_code: String,
}

pub fn generate_codes(code_length: u32, long_code_length: u32) -> GeneratedCodes {
    GeneratedCodes {
        code: random_digits(code_length as usize),
        long_code: random_alphanumeric(long_code_length as usize),
    }
}

/// Codes are matched case-insensitively and without surrounding whitespace
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

/// Stored form of a code
pub fn code_hmac(secret: &[u8], code: &str) -> String {
    to_base64(&hmac_sha256(secret, normalize_code(code).as_bytes()))
}

// ============================================================================
// JWS (HS256, compact serialization)
// ============================================================================

/// Compact HS256 JWS with the signing key's `kid` in the header
pub fn sign_jws<T: Serialize>(kid: &str, key: &[u8], claims: &T) -> jwt::Result<String> {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(key))
}

/// `kid` of an HS256 token, read before the signature is checked
pub fn jws_kid(token: &str) -> Option<String> {
    let header = jsonwebtoken::decode_header(token).ok()?;
    if header.alg != Algorithm::HS256 {
        return None;
    }
    header.kid
}

/// Claims of a token whose signature matches `key` and that passes `validation`
pub fn verify_jws<T: DeserializeOwned>(
    token: &str,
    key: &[u8],
    validation: &Validation,
) -> jwt::Result<T> {
    jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(key), validation)
        .map(|data| data.claims)
}

/// Rules for a verification token issued to `realm`
pub fn token_validation(realm: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.sub = Some(realm.to_string());
    validation.leeway = 0;
    validation
}

/// `iss` of every verification token
pub const TOKEN_ISSUER: &str = "diagnosis-verification-token";

/// Claims of the token a device receives for a claimed code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    /// Realm id
    pub sub: String,
    /// Token id
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of the certificate handed to the key server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateClaims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub report_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptom_onset_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_date_interval: Option<u32>,
    /// Base64 HMAC of the device's exposure keys
    pub tekmac: String,
}

/// Ten-minute interval number of a date's UTC midnight
pub fn en_interval(date: NaiveDate) -> u32 {
    let seconds = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    (seconds / 600).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(realm: &str, exp: i64) -> TokenClaims {
        TokenClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: realm.to_string(),
            jti: "token-1".to_string(),
            iat: 0,
            exp,
        }
    }

    #[test]
    fn test_generated_code_shapes() {
        let codes = generate_codes(8, 16);
        assert_eq!(codes.code.len(), 8);
        assert!(codes.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(codes.long_code.len(), 16);
        assert!(codes.long_code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_code_hmac_normalizes() {
        let secret = [7u8; 32];
        assert_eq!(code_hmac(&secret, " AbC123 "), code_hmac(&secret, "abc123"));
        assert_ne!(code_hmac(&secret, "abc123"), code_hmac(&[8u8; 32], "abc123"));
    }

    #[test]
    fn test_jws_roundtrip_and_tamper() {
        let key = [1u8; 32];
        let valid = claims("realm-a", chrono::Utc::now().timestamp() + 600);
        let token = sign_jws("kid-1", &key, &valid).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(jws_kid(&token).as_deref(), Some("kid-1"));

        let validation = token_validation("realm-a");
        assert_eq!(verify_jws::<TokenClaims>(&token, &key, &validation).unwrap(), valid);
        assert!(verify_jws::<TokenClaims>(&token, &[2u8; 32], &validation).is_err());

        let mut forged = token.clone();
        forged.push('A');
        assert!(verify_jws::<TokenClaims>(&forged, &key, &validation).is_err());
        assert!(verify_jws::<TokenClaims>("a.b", &key, &validation).is_err());
        assert!(jws_kid("not-a-token").is_none());
    }

    #[test]
    fn test_token_validation_rules() {
        let key = [1u8; 32];
        let validation = token_validation("realm-a");

        let expired = sign_jws("kid-1", &key, &claims("realm-a", 1_000)).unwrap();
        let err = verify_jws::<TokenClaims>(&expired, &key, &validation).unwrap_err();
        assert!(matches!(err.kind(), jwt::ErrorKind::ExpiredSignature));

        let future = chrono::Utc::now().timestamp() + 600;
        let foreign = sign_jws("kid-1", &key, &claims("realm-b", future)).unwrap();
        let err = verify_jws::<TokenClaims>(&foreign, &key, &validation).unwrap_err();
        assert!(matches!(err.kind(), jwt::ErrorKind::InvalidSubject));

        let mut other_issuer = claims("realm-a", future);
        other_issuer.iss = "someone-else".to_string();
        let token = sign_jws("kid-1", &key, &other_issuer).unwrap();
        let err = verify_jws::<TokenClaims>(&token, &key, &validation).unwrap_err();
        assert!(matches!(err.kind(), jwt::ErrorKind::InvalidIssuer));
    }

    #[test]
    fn test_unsigned_tokens_rejected() {
        // {"alg":"none","kid":"kid-1"}.{"sub":"realm-a"}.
        let unsigned = "eyJhbGciOiJub25lIiwia2lkIjoia2lkLTEifQ.eyJzdWIiOiJyZWFsbS1hIn0.";
        assert!(jws_kid(unsigned).is_none());
        assert!(
            verify_jws::<TokenClaims>(unsigned, &[1u8; 32], &token_validation("realm-a")).is_err()
        );
    }

    #[test]
    fn test_en_interval() {
        assert_eq!(en_interval(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        // 2020-06-01T00:00:00Z = 1590969600
        assert_eq!(
            en_interval(NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()),
            2_651_616
        );
    }

    #[test]
    fn test_certificate_claim_names() {
        let claims = CertificateClaims {
            iss: "iss".into(),
            aud: "aud".into(),
            iat: 1,
            exp: 2,
            report_type: "confirmed".into(),
            symptom_onset_interval: Some(10),
            test_date_interval: None,
            tekmac: "mac".into(),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["reportType"], "confirmed");
        assert_eq!(json["symptomOnsetInterval"], 10);
        assert!(json.get("testDateInterval").is_none());
    }
}
