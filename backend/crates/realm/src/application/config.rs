//! Application Configuration
//!
//! Configuration for the realm application layer.

use std::time::Duration;

use platform::secret::Secret32;

#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// HMAC key for API key signatures and stored key hashes
    pub api_key_secret: Secret32,
    /// How long a resolved API key stays cached
    pub api_key_cache_ttl: Duration,
    /// Domain for `[enslink]` SMS links (e.g. `en.express`)
    pub redirect_domain: Option<String>,
    /// Shared client for webhook providers
    pub http_client: reqwest::Client,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            api_key_secret: Secret32::new([0u8; 32]),
            api_key_cache_ttl: Duration::from_secs(5 * 60),
            redirect_domain: None,
            http_client: reqwest::Client::new(),
        }
    }
}

impl RealmConfig {
    pub fn with_random_secret() -> Self {
        Self {
            api_key_secret: Secret32::generate(),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            redirect_domain: Some("localhost".to_string()),
            ..Self::with_random_secret()
        }
    }

    pub fn api_key_secret(&self) -> &[u8] {
        self.api_key_secret.as_bytes()
    }
}
