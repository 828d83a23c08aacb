//! Credential Entity
//!
//! Password hash, TOTP enrollment and lockout state of a user. Kept apart
//! from [`super::user::User`] so profile reads never load secrets.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::value_object::TotpSecret;

#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: HashedPassword,
    pub password_changed_at: DateTime<Utc>,
    pub totp_secret: Option<TotpSecret>,
    /// Set once a code from the secret has been verified
    pub totp_enabled: bool,
    /// Consecutive failed sign-ins
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub const MAX_LOGIN_FAILURES: u32 = 5;
    pub const LOCKOUT_MINUTES: i64 = 15;

    pub fn new(user_id: UserId, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            password_hash,
            password_changed_at: now,
            totp_secret: None,
            totp_enabled: false,
            failed_attempts: 0,
            locked_until: None,
            updated_at: now,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Count a failure; the fifth in a row locks the account
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failed_attempts += 1;
        self.updated_at = now;

        if self.failed_attempts >= Self::MAX_LOGIN_FAILURES {
            self.locked_until = Some(now + Duration::minutes(Self::LOCKOUT_MINUTES));
            self.failed_attempts = 0;
        }
    }

    pub fn reset_failures(&mut self) {
        self.failed_attempts = 0;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }

    pub fn set_password(&mut self, password_hash: HashedPassword) {
        let now = Utc::now();
        self.password_hash = password_hash;
        self.password_changed_at = now;
        self.updated_at = now;
    }

    /// Fresh secret, not enabled until a code is verified
    pub fn setup_totp(&mut self) -> TotpSecret {
        let secret = TotpSecret::generate();
        self.totp_secret = Some(secret.clone());
        self.totp_enabled = false;
        self.updated_at = Utc::now();
        secret
    }

    pub fn enable_totp(&mut self) {
        if self.totp_secret.is_some() {
            self.totp_enabled = true;
            self.updated_at = Utc::now();
        }
    }

    pub fn disable_totp(&mut self) {
        self.totp_secret = None;
        self.totp_enabled = false;
        self.updated_at = Utc::now();
    }

    pub fn is_enrolled(&self) -> bool {
        self.totp_enabled && self.totp_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::ClearTextPassword;

    fn credential() -> Credential {
        let hash = ClearTextPassword::new("Correct-Horse-9".to_string())
            .unwrap()
            .hash(None)
            .unwrap();
        Credential::new(UserId::new(), hash)
    }

    #[test]
    fn test_lockout_after_five_failures() {
        let mut cred = credential();
        let now = Utc::now();

        for _ in 0..4 {
            cred.record_failure(now);
        }
        assert!(!cred.is_locked(now));

        cred.record_failure(now);
        assert!(cred.is_locked(now));
        assert!(!cred.is_locked(now + Duration::minutes(16)));

        cred.reset_failures();
        assert!(!cred.is_locked(now));
    }

    #[test]
    fn test_totp_enrollment() {
        let mut cred = credential();
        cred.enable_totp();
        assert!(!cred.is_enrolled());

        cred.setup_totp();
        assert!(!cred.is_enrolled());
        cred.enable_totp();
        assert!(cred.is_enrolled());

        cred.disable_totp();
        assert!(!cred.is_enrolled());
        assert!(cred.totp_secret.is_none());
    }
}
