//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::secret::Secret32;

pub use platform::cookie::SameSite;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie attributes (Max-Age is set per sign-in)
    pub cookie: CookieConfig,
    /// HMAC key for session tokens
    pub session_secret: Secret32,
    /// Session TTL without "Remember Me" (12 hours)
    pub session_ttl_short: Duration,
    /// Session TTL with "Remember Me" (1 week)
    pub session_ttl_long: Duration,
    /// Application-wide password pepper
    pub password_pepper: Option<Vec<u8>>,
    pub reset_token_ttl: Duration,
    /// Console page that accepts `?token=` for resets and invitations
    pub reset_url_base: String,
    /// Issuer shown in authenticator apps
    pub totp_issuer: String,
    /// Shared client for the email provider
    pub http_client: reqwest::Client,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie: CookieConfig {
                name: "verification_session".to_string(),
                ..CookieConfig::default()
            },
            session_secret: Secret32::new([0u8; 32]),
            session_ttl_short: Duration::from_secs(12 * 3600),
            session_ttl_long: Duration::from_secs(7 * 24 * 3600),
            password_pepper: None,
            reset_token_ttl: Duration::from_secs(3600),
            reset_url_base: "http://localhost:8080/reset-password".to_string(),
            totp_issuer: "Verification Server".to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

impl AuthConfig {
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: Secret32::generate(),
            ..Default::default()
        }
    }

    /// Insecure cookie for plain-http development
    pub fn development() -> Self {
        let mut config = Self::with_random_secret();
        config.cookie.secure = false;
        config
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn session_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.session_ttl_long
        } else {
            self.session_ttl_short
        }
    }

    /// Cookie carrying a session token, living as long as the session
    pub fn session_cookie(&self, token: &str, remember_me: bool) -> String {
        self.cookie
            .with_max_age(self.session_ttl(remember_me).as_secs())
            .build_set_cookie(token)
    }

    pub fn clear_cookie(&self) -> String {
        self.cookie.build_delete_cookie()
    }

    pub fn reset_link(&self, raw_token: &str) -> String {
        let separator = if self.reset_url_base.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.reset_url_base, separator, raw_token)
    }
}

/// `std` to `chrono` duration, saturating on overflow
pub(crate) fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
