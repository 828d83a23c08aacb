//! Password Hashing and Complexity
//!
//! - Argon2id hashing with an optional pepper
//! - NFKC normalisation before hashing or checking
//! - Realm password requirements (length and character classes)
//!
//! Passwords are zeroized on drop and never printed.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Absolute minimum regardless of realm policy
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound to keep Argon2 input bounded
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password policy violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    /// One entry per unmet requirement
    #[error("Password does not meet requirements: {}", .0.join(", "))]
    Requirements(Vec<String>),
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Requirements
// ============================================================================

/// Realm password complexity policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequirements {
    pub min_length: u32,
    pub uppercase: u32,
    pub lowercase: u32,
    pub digits: u32,
    pub symbols: u32,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH as u32,
            uppercase: 1,
            lowercase: 1,
            digits: 1,
            symbols: 1,
        }
    }
}

impl PasswordRequirements {
    /// Field-wise maximum over a set of policies, or the defaults when empty
    pub fn strictest<I>(requirements: I) -> Self
    where
        I: IntoIterator<Item = PasswordRequirements>,
    {
        requirements
            .into_iter()
            .reduce(|a, b| Self {
                min_length: a.min_length.max(b.min_length),
                uppercase: a.uppercase.max(b.uppercase),
                lowercase: a.lowercase.max(b.lowercase),
                digits: a.digits.max(b.digits),
                symbols: a.symbols.max(b.symbols),
            })
            .unwrap_or_default()
    }

    /// Every unmet requirement, in a stable order
    pub fn unmet(&self, password: &ClearTextPassword) -> Vec<String> {
        let text = password.0.as_str();
        let mut counts = [0u32; 4];
        for ch in text.chars() {
            if ch.is_uppercase() {
                counts[0] += 1;
            } else if ch.is_lowercase() {
                counts[1] += 1;
            } else if ch.is_ascii_digit() {
                counts[2] += 1;
            } else if !ch.is_whitespace() && !ch.is_alphanumeric() {
                counts[3] += 1;
            }
        }

        let mut unmet = Vec::new();
        let length = text.chars().count() as u32;
        let min_length = self.min_length.max(MIN_PASSWORD_LENGTH as u32);
        if length < min_length {
            unmet.push(format!("at least {} characters", min_length));
        }
        let rules = [
            (counts[0], self.uppercase, "uppercase letter"),
            (counts[1], self.lowercase, "lowercase letter"),
            (counts[2], self.digits, "digit"),
            (counts[3], self.symbols, "symbol"),
        ];
        for (have, need, label) in rules {
            if have < need {
                unmet.push(format!("at least {} {}", need, plural(label, need)));
            }
        }
        unmet
    }

    pub fn check(&self, password: &ClearTextPassword) -> Result<(), PasswordPolicyError> {
        let unmet = self.unmet(password);
        if unmet.is_empty() {
            Ok(())
        } else {
            Err(PasswordPolicyError::Requirements(unmet))
        }
    }
}

fn plural(label: &str, n: u32) -> String {
    if n == 1 {
        label.to_string()
    } else {
        format!("{}s", label)
    }
}

// ============================================================================
// Clear Text Password
// ============================================================================

/// Clear text password, zeroized on drop and not `Clone`
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalise and validate a password that is about to be stored
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let password = Self::for_verification(raw);
        let normalized = password.0.as_str();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(password)
    }

    /// Normalise without policy checks, for comparing against a stored hash
    pub fn for_verification(raw: String) -> Self {
        let raw = Zeroizing::new(raw);
        Self(raw.nfkc().collect())
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        Zeroizing::new(bytes)
    }

    /// Argon2id hash in PHC format
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(OsRng);
        let hash = Argon2::default()
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password
// ============================================================================

/// Argon2id hash in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Constant-time verification (inside argon2)
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed_hash)
            .is_ok()
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(s: &str) -> ClearTextPassword {
        ClearTextPassword::for_verification(s.to_string())
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(matches!(
            ClearTextPassword::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("a".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(PasswordPolicyError::TooLong { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("         ".to_string()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
        assert!(matches!(
            ClearTextPassword::new("abc\u{0007}defgh".to_string()),
            Err(PasswordPolicyError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_nfkc_normalisation() {
        // Fullwidth letters normalise to ASCII
        let a = pw("ＡＢＣｄｅｆ１２!");
        let hashed = a.hash(None).unwrap();
        assert!(hashed.verify(&pw("ABCdef12!"), None));
    }

    #[test]
    fn test_default_requirements() {
        let req = PasswordRequirements::default();
        assert!(req.check(&pw("Secure#Pass1")).is_ok());

        let unmet = req.unmet(&pw("alllowercase"));
        assert_eq!(
            unmet,
            vec![
                "at least 1 uppercase letter".to_string(),
                "at least 1 digit".to_string(),
                "at least 1 symbol".to_string(),
            ]
        );
    }

    #[test]
    fn test_requirements_report_every_rule() {
        let req = PasswordRequirements {
            min_length: 12,
            uppercase: 2,
            lowercase: 0,
            digits: 3,
            symbols: 0,
        };
        let err = req.check(&pw("Abc1")).unwrap_err();
        let PasswordPolicyError::Requirements(unmet) = err else {
            panic!("expected requirements error");
        };
        assert_eq!(unmet.len(), 3);
        assert!(unmet[0].contains("12 characters"));
        assert!(unmet[1].contains("2 uppercase letters"));
        assert!(unmet[2].contains("3 digits"));
    }

    #[test]
    fn test_min_length_never_below_absolute_minimum() {
        let req = PasswordRequirements {
            min_length: 2,
            uppercase: 0,
            lowercase: 0,
            digits: 0,
            symbols: 0,
        };
        assert!(req.check(&pw("abc")).is_err());
        assert!(req.check(&pw("abcdefgh")).is_ok());
    }

    #[test]
    fn test_strictest() {
        let a = PasswordRequirements {
            min_length: 10,
            uppercase: 0,
            lowercase: 2,
            digits: 1,
            symbols: 0,
        };
        let b = PasswordRequirements {
            min_length: 8,
            uppercase: 1,
            lowercase: 1,
            digits: 3,
            symbols: 0,
        };
        let merged = PasswordRequirements::strictest([a, b]);
        assert_eq!(merged.min_length, 10);
        assert_eq!(merged.uppercase, 1);
        assert_eq!(merged.lowercase, 2);
        assert_eq!(merged.digits, 3);
        assert_eq!(merged.symbols, 0);

        assert_eq!(
            PasswordRequirements::strictest(Vec::new()),
            PasswordRequirements::default()
        );
    }

    #[test]
    fn test_hash_with_pepper() {
        let password = pw("TestPassword123!");
        let pepper = b"my_secret_pepper";
        let hashed = password.hash(Some(pepper)).unwrap();

        assert!(hashed.verify(&password, Some(pepper)));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&pw("WrongPassword123!"), Some(pepper)));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = pw("TestPassword123!");
        let hashed = password.hash(None).unwrap();
        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&password, None));

        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_debug_redaction() {
        let debug_output = format!("{:?}", pw("secret-value"));
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret-value"));
    }
}
