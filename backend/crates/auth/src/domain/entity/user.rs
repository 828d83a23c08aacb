//! User Entity
//!
//! Console user profile. Credentials live in [`super::credential::Credential`].

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_object::{Email, UserStatus};

pub const NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    /// Manages realms and system-wide settings
    pub system_admin: bool,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New active user; an empty name falls back to the email's local part
    pub fn new(email: Email, name: impl Into<String>) -> Self {
        let now = Utc::now();
        let name = name.into().trim().to_string();
        let name = if name.is_empty() {
            email.as_str().split('@').next().unwrap_or_default().to_string()
        } else {
            name
        };

        Self {
            id: UserId::new(),
            email,
            name,
            system_admin: false,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.chars().count() > NAME_MAX_LEN {
            return Err(format!("name must be at most {} characters", NAME_MAX_LEN));
        }
        Ok(())
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }

    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_system_admin(&mut self, system_admin: bool) {
        self.system_admin = system_admin;
        self.updated_at = Utc::now();
    }
}
