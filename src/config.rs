//! Service configuration.
//!
//! Settings are read from an optional JSON file (path in `PR_REVIEWER_CONFIG`),
//! then individual fields are overridden from environment variables. Every
//! field has a default, so an empty environment yields a working local setup.

use crate::db::pool::PoolSettings;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the JSON config file.
pub const CONFIG_PATH_ENV: &str = "PR_REVIEWER_CONFIG";

/// Deployment environment; selects log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "prod" => Ok(Self::Prod),
            other => Err(AppError::invalid_input_field(
                format!("unknown environment '{}'", other),
                "env",
            )),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Database pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout_secs: 30,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: Environment,
    pub database_path: PathBuf,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::Local,
            database_path: PathBuf::from("pr-reviewer.db"),
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the file named by `PR_REVIEWER_CONFIG` (if
    /// set) and the process environment.
    pub fn load() -> Result<Self, AppError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::invalid_input(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(env) = lookup("APP_ENV") {
            self.env = env.parse()?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(address) = lookup("HTTP_ADDRESS") {
            self.http.address = address;
        }
        if let Some(timeout) = lookup("HTTP_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = parse_number("HTTP_REQUEST_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("DATABASE_MAX_CONNECTIONS", &max)?;
        }

        Ok(self)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(AppError::invalid_input_field(
                "database_path must not be empty",
                "database_path",
            ));
        }
        self.socket_addr()?;
        if self.database.max_connections == 0 {
            return Err(AppError::invalid_input_field(
                "max_connections must be at least 1",
                "database.max_connections",
            ));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(AppError::invalid_input_field(
                "request_timeout_secs must be at least 1",
                "http.request_timeout_secs",
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        self.http.address.parse().map_err(|_| {
            AppError::invalid_input_field(
                format!("invalid listen address '{}'", self.http.address),
                "http.address",
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.database.max_connections,
            busy_timeout: Duration::from_secs(self.database.busy_timeout_secs),
        }
    }

    pub fn is_local(&self) -> bool {
        self.env == Environment::Local
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::invalid_input_field(format!("{} must be a number", key), key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert!(config.is_local());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.pool_settings().max_connections, 10);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default()
            .with_overrides(env(&[
                ("APP_ENV", "prod"),
                ("DATABASE_PATH", "/var/lib/pr/pr.db"),
                ("HTTP_ADDRESS", "127.0.0.1:9000"),
                ("HTTP_REQUEST_TIMEOUT_SECS", "5"),
                ("DATABASE_MAX_CONNECTIONS", "3"),
            ]))
            .unwrap();

        assert_eq!(config.env, Environment::Prod);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/pr/pr.db"));
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.database.max_connections, 3);
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let config = AppConfig::default()
            .with_overrides(env(&[("DATABASE_PATH", "  ")]))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("pr-reviewer.db"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = AppConfig::default()
            .with_overrides(env(&[("APP_ENV", "staging")]))
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let err = AppConfig::default()
            .with_overrides(env(&[("DATABASE_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let mut config = AppConfig::default();
        config.http.address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"env": "prod", "http": {"address": "127.0.0.1:7000"}}"#)
            .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.env, Environment::Prod);
        assert_eq!(config.http.address, "127.0.0.1:7000");
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.database_path, PathBuf::from("pr-reviewer.db"));
    }
}
