//! Configuration for the keepsake server.
//!
//! All settings come from environment variables:
//! - `KEEPSAKE_HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `KEEPSAKE_PORT` - Optional. Server port. Defaults to `8081`.
//! - `KEEPSAKE_DB_PATH` - Optional. SQLite database path. Defaults to `keepsake.db`.
//! - `JWT_SECRET` - Required. Secret used to sign session tokens.
//! - `JWT_TTL` - Optional. Session token lifetime in seconds. Defaults to `86400`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite database path
    pub database_path: PathBuf,

    /// Secret for JWT signing
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    pub jwt_ttl_seconds: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("KEEPSAKE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("KEEPSAKE_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("KEEPSAKE_PORT".to_string(), format!("{}", e)))?;

        let database_path = std::env::var("KEEPSAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("keepsake.db"));

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let jwt_ttl_seconds = std::env::var("JWT_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("JWT_TTL".to_string(), format!("{}", e)))?;

        Ok(Self {
            host,
            port,
            database_path,
            jwt_secret,
            jwt_ttl_seconds,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(database_path: PathBuf, jwt_secret: String) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            database_path,
            jwt_secret,
            jwt_ttl_seconds: 86400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_uses_defaults() {
        let config = Config::new(PathBuf::from("/tmp/test.db"), "secret".to_string());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.jwt_ttl_seconds, 86400);
    }
}
