//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables once, at
//! startup, and injected into the services as an immutable value.

use crate::error::AuthError;
use std::env;

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Default refresh session lifetime (24 hours)
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 24 * 60 * 60;

/// Issuer written into and required from every access token
pub const DEFAULT_ISSUER: &str = "auth.service";

const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Active HMAC secret for signing access tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Retired secrets still accepted for verification (from JWT_PREVIOUS_SECRETS, comma separated)
    pub jwt_previous_secrets: Vec<String>,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_TTL env var)
    pub access_token_expiration: i64,

    /// Refresh session lifetime in seconds (from REFRESH_TOKEN_TTL env var)
    pub refresh_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    /// Configuration with the given secret and every other value at its default
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_previous_secrets: Vec::new(),
            access_token_expiration: DEFAULT_ACCESS_TTL_SECS,
            refresh_token_expiration: DEFAULT_REFRESH_TTL_SECS,
            jwt_issuer: DEFAULT_ISSUER.to_string(),
            argon2_memory_cost: 65536, // 64 MiB
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(get: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::Config("JWT_SECRET must be set".to_string()))?;

        let mut config = Self::new(jwt_secret);

        if let Some(previous) = get("JWT_PREVIOUS_SECRETS") {
            config.jwt_previous_secrets = previous
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(value) = get("ACCESS_TOKEN_TTL") {
            config.access_token_expiration = parse_ttl("ACCESS_TOKEN_TTL", &value)?;
        } else {
            tracing::info!(
                "ACCESS_TOKEN_TTL not set, using default of {}s",
                DEFAULT_ACCESS_TTL_SECS
            );
        }

        if let Some(value) = get("REFRESH_TOKEN_TTL") {
            config.refresh_token_expiration = parse_ttl("REFRESH_TOKEN_TTL", &value)?;
        } else {
            tracing::info!(
                "REFRESH_TOKEN_TTL not set, using default of {}s",
                DEFAULT_REFRESH_TTL_SECS
            );
        }

        if let Some(issuer) = get("JWT_ISSUER") {
            config.jwt_issuer = issuer;
        }

        config.argon2_memory_cost = get("ARGON2_MEMORY_COST")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.argon2_memory_cost);

        config.argon2_time_cost = get("ARGON2_TIME_COST")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.argon2_time_cost);

        config.argon2_parallelism = get("ARGON2_PARALLELISM")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.argon2_parallelism);

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        if self
            .jwt_previous_secrets
            .iter()
            .any(|s| s.len() < MIN_SECRET_LEN)
        {
            return Err(AuthError::Config(format!(
                "JWT_PREVIOUS_SECRETS entries must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_TTL must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(AuthError::Config(
                "REFRESH_TOKEN_TTL must be greater than ACCESS_TOKEN_TTL".to_string(),
            ));
        }

        if self.jwt_issuer.is_empty() {
            return Err(AuthError::Config("JWT_ISSUER must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Parse a lifetime such as `900`, `90s`, `15m`, `24h` or `7d` into seconds
fn parse_ttl(name: &str, value: &str) -> Result<i64, AuthError> {
    let value = value.trim();
    let invalid = || AuthError::Config(format!("{} has an invalid duration: {:?}", name, value));

    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 's')) => (&value[..idx], 1),
        Some((idx, 'm')) => (&value[..idx], 60),
        Some((idx, 'h')) => (&value[..idx], 60 * 60),
        Some((idx, 'd')) => (&value[..idx], 24 * 60 * 60),
        Some(_) => (value, 1),
        None => return Err(invalid()),
    };

    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    amount.checked_mul(multiplier).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_validation() {
        let config = AuthConfig::new("a".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AuthConfig::new("short");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_refresh_shorter_than_access() {
        let mut config = AuthConfig::new("a".repeat(32));
        config.refresh_token_expiration = config.access_token_expiration;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_when_unset() {
        let secret = "s".repeat(40);
        let config = AuthConfig::from_lookup(lookup(&[("JWT_SECRET", &secret)])).unwrap();

        assert_eq!(config.access_token_expiration, DEFAULT_ACCESS_TTL_SECS);
        assert_eq!(config.refresh_token_expiration, DEFAULT_REFRESH_TTL_SECS);
        assert_eq!(config.jwt_issuer, DEFAULT_ISSUER);
        assert!(config.jwt_previous_secrets.is_empty());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result = AuthConfig::from_lookup(lookup(&[("ACCESS_TOKEN_TTL", "5m")]));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_ttls_and_previous_secrets() {
        let secret = "s".repeat(40);
        let config = AuthConfig::from_lookup(lookup(&[
            ("JWT_SECRET", &secret),
            ("ACCESS_TOKEN_TTL", "5m"),
            ("REFRESH_TOKEN_TTL", "7d"),
            ("JWT_PREVIOUS_SECRETS", " old-one , ,old-two"),
        ]))
        .unwrap();

        assert_eq!(config.access_token_expiration, 300);
        assert_eq!(config.refresh_token_expiration, 7 * 86400);
        assert_eq!(config.jwt_previous_secrets, vec!["old-one", "old-two"]);
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("X", "900").unwrap(), 900);
        assert_eq!(parse_ttl("X", "90s").unwrap(), 90);
        assert_eq!(parse_ttl("X", "24h").unwrap(), 86400);
        assert!(parse_ttl("X", "").is_err());
        assert!(parse_ttl("X", "15 minutes").is_err());
        assert!(parse_ttl("X", "m").is_err());
    }
}
