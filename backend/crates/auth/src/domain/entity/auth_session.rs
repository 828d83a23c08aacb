//! Auth Session Entity
//!
//! Server-side console session referenced by the signed cookie token.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{RealmId, UserId};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub user_id: UserId,
    /// Realm the console is currently working in
    pub realm_id: Option<RealmId>,
    /// Signed in but must enroll in TOTP before doing anything else
    pub mfa_pending: bool,
    pub remember_me: bool,
    /// SHA-256 of the User-Agent the session was created with
    pub fingerprint_hash: Vec<u8>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Client details captured at sign-in
#[derive(Debug, Clone, Default)]
pub struct SessionClient {
    pub fingerprint_hash: Vec<u8>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&platform::client::ClientFingerprint> for SessionClient {
    fn from(fp: &platform::client::ClientFingerprint) -> Self {
        Self {
            fingerprint_hash: fp.hash_vec(),
            ip_address: fp.ip_string(),
            user_agent: fp.user_agent.clone(),
        }
    }
}

impl AuthSession {
    /// TTL comes from configuration
    pub fn new(user_id: UserId, remember_me: bool, client: SessionClient, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            realm_id: None,
            mfa_pending: false,
            remember_me,
            fingerprint_hash: client.fingerprint_hash,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            expires_at: now + ttl,
            last_activity_at: now,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Slide remember-me sessions forward once less than half of `ttl_long`
    /// remains
    pub fn extend_if_needed(&mut self, ttl_long: Duration) {
        if !self.remember_me {
            return;
        }

        let now = Utc::now();
        if self.expires_at < now + ttl_long / 2 {
            self.expires_at = now + ttl_long;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let session = AuthSession::new(
            UserId::new(),
            false,
            SessionClient::default(),
            Duration::hours(12),
        );
        let now = Utc::now();
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(13)));
        assert!(!session.mfa_pending);
        assert!(session.realm_id.is_none());
    }

    #[test]
    fn test_extend_only_remember_me() {
        let ttl_long = Duration::days(7);

        let mut short = AuthSession::new(UserId::new(), false, SessionClient::default(), Duration::hours(1));
        let before = short.expires_at;
        short.extend_if_needed(ttl_long);
        assert_eq!(short.expires_at, before);

        let mut long = AuthSession::new(UserId::new(), true, SessionClient::default(), Duration::days(1));
        long.extend_if_needed(ttl_long);
        assert!(long.expires_at > Utc::now() + Duration::days(6));
    }
}
