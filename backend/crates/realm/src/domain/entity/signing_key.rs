//! Realm Signing Key Entity
//!
//! HS256 keys that sign verification tokens and certificates. A realm keeps
//! at most [`MAX_LIVE_KEYS`] undeleted keys, exactly one of them active.

use chrono::{DateTime, Utc};
use kernel::id::{RealmId, SigningKeyId};
use platform::crypto::random_token;
use platform::secret::Secret32;

pub const MAX_LIVE_KEYS: usize = 10;

#[derive(Debug, Clone)]
pub struct SigningKey {
    pub id: SigningKeyId,
    pub realm_id: RealmId,
    /// Key id placed in the JWS header
    pub kid: String,
    pub key: Secret32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SigningKey {
    pub fn generate(realm_id: RealmId, active: bool) -> Self {
        Self {
            id: SigningKeyId::new(),
            realm_id,
            kid: random_token(9),
            key: Secret32::generate(),
            active,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
