//! Authorized App Entity
//!
//! A realm-scoped API key holder. The key itself is never stored.

use chrono::{DateTime, Utc};
use kernel::id::{AuthorizedAppId, RealmId};

use crate::domain::value_object::ApiKeyType;

pub const APP_NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedApp {
    pub id: AuthorizedAppId,
    pub realm_id: RealmId,
    pub name: String,
    pub api_key_type: ApiKeyType,
    pub api_key_hmac: String,
    pub api_key_preview: String,
    pub created_at: DateTime<Utc>,
    /// Disabled apps carry the time they were disabled
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuthorizedApp {
    pub fn new(
        realm_id: RealmId,
        name: impl Into<String>,
        api_key_type: ApiKeyType,
        api_key_hmac: String,
        api_key_preview: String,
    ) -> Self {
        Self {
            id: AuthorizedAppId::new(),
            realm_id,
            name: name.into().trim().to_string(),
            api_key_type,
            api_key_hmac,
            api_key_preview,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn validate_name(name: &str) -> Result<(), String> {
        let len = name.trim().chars().count();
        if len == 0 || len > APP_NAME_MAX_LEN {
            return Err(format!("name must be 1 to {} characters", APP_NAME_MAX_LEN));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn disable(&mut self) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(Utc::now());
        }
    }

    pub fn enable(&mut self) {
        self.deleted_at = None;
    }

    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.api_key_preview)
    }
}
