//! Application Configuration
//!
//! Configuration for the verification application layer.

use std::time::Duration;

use platform::rate_limit::RateLimitConfig;
use platform::secret::Secret32;

pub const STATS_DAYS_DEFAULT: u32 = 30;
pub const STATS_DAYS_MAX: u32 = 90;

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// HMAC key for stored short and long codes
    pub code_hmac_secret: Secret32,
    /// Lifetime of a token handed out for a claimed code
    pub token_ttl: Duration,
    /// Per-key quota on the `/api/v1` surface
    pub api_rate_limit: RateLimitConfig,
    /// Attempts at drawing a short code that no live code in the realm uses
    pub code_generation_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_hmac_secret: Secret32::new([0u8; 32]),
            token_ttl: Duration::from_secs(24 * 3600),
            api_rate_limit: RateLimitConfig::per_minute(60),
            code_generation_attempts: 5,
        }
    }
}

impl VerificationConfig {
    pub fn with_random_secret() -> Self {
        Self {
            code_hmac_secret: Secret32::generate(),
            ..Default::default()
        }
    }

    /// Generous quota for local testing
    pub fn development() -> Self {
        Self {
            api_rate_limit: RateLimitConfig::per_minute(600),
            ..Self::with_random_secret()
        }
    }

    pub fn code_secret(&self) -> &[u8] {
        self.code_hmac_secret.as_bytes()
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.token_ttl).unwrap_or(chrono::Duration::hours(24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerificationConfig::default();
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.api_rate_limit.max_requests, 60);
    }

    #[test]
    fn test_random_secret() {
        let a = VerificationConfig::with_random_secret();
        let b = VerificationConfig::with_random_secret();
        assert_ne!(a.code_secret(), b.code_secret());
        assert_eq!(VerificationConfig::development().api_rate_limit.max_requests, 600);
    }
}
