//! SMS and email delivery
//!
//! Providers are swappable adapters: `Noop` only logs that a message would
//! have been sent, `Webhook` posts the message as JSON to a configured URL
//! with a bearer token.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider rejected the message with status {0}")]
    Rejected(u16),

    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsMessage {
    pub to: String,
    pub from: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text_body: String,
}

/// Webhook endpoint shared by SMS and email providers
#[derive(Clone)]
pub struct Webhook {
    client: Client,
    url: String,
    auth_token: String,
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl Webhook {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let url = url.into();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(NotifyError::Configuration(
                "webhook url must be http(s)".to_string(),
            ));
        }
        Ok(Self {
            client,
            url,
            auth_token: auth_token.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<T: Serialize>(&self, payload: &T) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.auth_token)
            .timeout(WEBHOOK_TIMEOUT)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "Webhook provider rejected message");
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum SmsProvider {
    Noop,
    Webhook(Webhook),
}

impl SmsProvider {
    pub fn name(&self) -> &'static str {
        match self {
            SmsProvider::Noop => "noop",
            SmsProvider::Webhook(_) => "webhook",
        }
    }

    pub async fn send(&self, message: &SmsMessage) -> Result<(), NotifyError> {
        match self {
            SmsProvider::Noop => {
                info!(body_len = message.body.len(), "SMS not sent (noop provider)");
                Ok(())
            }
            SmsProvider::Webhook(webhook) => webhook.post(message).await,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EmailProvider {
    Noop,
    Webhook(Webhook),
}

impl EmailProvider {
    pub fn name(&self) -> &'static str {
        match self {
            EmailProvider::Noop => "noop",
            EmailProvider::Webhook(_) => "webhook",
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        match self {
            EmailProvider::Noop => {
                info!(subject = %message.subject, "Email not sent (noop provider)");
                Ok(())
            }
            EmailProvider::Webhook(webhook) => webhook.post(message).await,
        }
    }
}

/// E.164 phone number after stripping common separators
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let digits = cleaned.strip_prefix('+')?;
    let valid = (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');
    valid.then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_providers_succeed() {
        let sms = SmsMessage {
            to: "+15551234567".to_string(),
            from: None,
            body: "Your code is 12345678".to_string(),
        };
        assert!(SmsProvider::Noop.send(&sms).await.is_ok());

        let email = EmailMessage {
            to: "a@example.com".to_string(),
            from: "noreply@example.com".to_string(),
            subject: "Reset".to_string(),
            text_body: "link".to_string(),
        };
        assert!(EmailProvider::Noop.send(&email).await.is_ok());
    }

    #[test]
    fn test_webhook_requires_http_url() {
        assert!(Webhook::new(Client::new(), "ftp://example.com", "t").is_err());
        let hook = Webhook::new(Client::new(), "https://hooks.example.com/sms", "secret").unwrap();
        assert_eq!(SmsProvider::Webhook(hook.clone()).name(), "webhook");
        assert!(!format!("{:?}", hook).contains("secret"));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(
            normalize_phone("+1 (555) 123-4567").as_deref(),
            Some("+15551234567")
        );
        assert_eq!(normalize_phone("5551234567"), None);
        assert_eq!(normalize_phone("+1555abc4567"), None);
        assert_eq!(normalize_phone("+0123456789"), None);
        assert_eq!(normalize_phone("+1234"), None);
    }

    #[test]
    fn test_email_message_serializes_camel_case() {
        let email = EmailMessage {
            to: "a@example.com".to_string(),
            from: "b@example.com".to_string(),
            subject: "s".to_string(),
            text_body: "t".to_string(),
        };
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["textBody"], "t");
    }
}
