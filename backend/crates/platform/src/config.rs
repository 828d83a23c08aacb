//! Environment configuration helpers
//!
//! Thin wrappers over `std::env` used by the server's `ServerConfig`.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::secret::{Secret32, SecretError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: String, reason: String },

    #[error("{name}: {source}")]
    Secret {
        name: String,
        #[source]
        source: SecretError,
    },
}

/// Value of `name`, or `default` when unset or empty
pub fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Optional value; empty strings count as unset
pub fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Required value
pub fn env_required(name: &str) -> Result<String, ConfigError> {
    env_opt(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Parsed value, or `default` when unset
pub fn env_parse_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Boolean flag: `1`, `true`, `yes`, `on` (case-insensitive) are true
pub fn env_bool(name: &str, default: bool) -> bool {
    match env_opt(name) {
        Some(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

/// Base64 32-byte secret. Missing secrets are generated when `allow_random`
/// is set (development only).
pub fn env_secret(name: &str, allow_random: bool) -> Result<Secret32, ConfigError> {
    match env_opt(name) {
        Some(raw) => Secret32::from_base64(&raw).map_err(|source| ConfigError::Secret {
            name: name.to_string(),
            source,
        }),
        None if allow_random => {
            tracing::warn!(name, "Secret not configured, generated a random one");
            Ok(Secret32::generate())
        }
        None => Err(ConfigError::Missing(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_values_fall_back() {
        let name = "PLATFORM_CONFIG_TEST_UNSET_VALUE";
        assert_eq!(env_or(name, "fallback"), "fallback");
        assert_eq!(env_parse_or(name, 42u32).unwrap(), 42);
        assert!(env_bool(name, true));
        assert!(matches!(env_required(name), Err(ConfigError::Missing(_))));
        assert!(env_secret(name, true).is_ok());
        assert!(env_secret(name, false).is_err());
    }
}
