//! SMS and email provider configuration
//!
//! `realm_id == None` is the system-wide configuration that realms may be
//! allowed to share.

use chrono::{DateTime, Utc};
use kernel::id::RealmId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Noop,
    Webhook,
}

impl ProviderKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Noop => "noop",
            ProviderKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noop" => Ok(ProviderKind::Noop),
            "webhook" => Ok(ProviderKind::Webhook),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct SmsConfig {
    pub realm_id: Option<RealmId>,
    pub provider: ProviderKind,
    pub webhook_url: String,
    pub auth_token: String,
    /// Only used on realm configs; the system config uses [`SmsFromNumber`]
    pub from_number: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsFromNumber {
    pub id: Uuid,
    pub label: String,
    pub value: String,
}

#[derive(Clone, PartialEq)]
pub struct EmailConfig {
    pub realm_id: Option<RealmId>,
    pub provider: ProviderKind,
    pub webhook_url: String,
    pub auth_token: String,
    pub from_address: String,
    pub updated_at: DateTime<Utc>,
}

fn check_webhook(provider: ProviderKind, url: &str) -> Result<(), String> {
    if provider == ProviderKind::Webhook && !url.starts_with("https://") {
        return Err("webhook url must use https".to_string());
    }
    Ok(())
}

impl SmsConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_webhook(self.provider, &self.webhook_url)?;
        if !self.from_number.is_empty()
            && platform::notify::normalize_phone(&self.from_number).is_none()
        {
            return Err("from number must be an E.164 phone number".to_string());
        }
        Ok(())
    }
}

impl EmailConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_webhook(self.provider, &self.webhook_url)?;
        if !self.from_address.contains('@') {
            return Err("from address must be an email address".to_string());
        }
        Ok(())
    }
}

// Tokens stay out of logs
impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("realm_id", &self.realm_id)
            .field("provider", &self.provider)
            .field("webhook_url", &self.webhook_url)
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("realm_id", &self.realm_id)
            .field("provider", &self.provider)
            .field("webhook_url", &self.webhook_url)
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl SmsFromNumber {
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("from number label is required".to_string());
        }
        platform::notify::normalize_phone(&self.value)
            .map(|_| ())
            .ok_or_else(|| format!("{} is not an E.164 phone number", self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_must_be_https() {
        let mut config = SmsConfig {
            realm_id: None,
            provider: ProviderKind::Webhook,
            webhook_url: "http://sms.example.com".into(),
            auth_token: "secret-token".into(),
            from_number: String::new(),
            updated_at: Utc::now(),
        };
        assert!(config.validate().is_err());
        config.webhook_url = "https://sms.example.com".into();
        assert!(config.validate().is_ok());
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    #[test]
    fn test_from_number_validation() {
        let number = SmsFromNumber {
            id: Uuid::new_v4(),
            label: "Main".into(),
            value: "+1 555 123 4567".into(),
        };
        assert!(number.validate().is_ok());
        assert!(
            SmsFromNumber {
                value: "555".into(),
                ..number
            }
            .validate()
            .is_err()
        );
    }
}
