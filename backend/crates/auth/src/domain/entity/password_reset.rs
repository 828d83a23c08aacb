//! Password Reset Token Entity
//!
//! Only the SHA-256 of the emailed token is stored.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use platform::crypto::{random_token, sha256};
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub token_id: Uuid,
    pub user_id: UserId,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// New token and the raw value to put in the link
    pub fn issue(user_id: UserId, ttl: Duration) -> (Self, String) {
        let raw = random_token(TOKEN_BYTES);
        let now = Utc::now();
        let token = Self {
            token_id: Uuid::new_v4(),
            user_id,
            token_hash: Self::hash(&raw),
            expires_at: now + ttl,
            used_at: None,
            created_at: now,
        };
        (token, raw)
    }

    pub fn hash(raw: &str) -> Vec<u8> {
        sha256(raw.trim().as_bytes()).to_vec()
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}
