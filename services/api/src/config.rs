//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use series_learner_core::domain::{OwnerKey, UnitMinutesBounds, LOCAL_OWNER_KEY};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    /// Owner applied to requests that do not name one.
    pub owner_key: OwnerKey,
    pub unit_minutes: UnitMinutesBounds,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Tracker Settings ---
        let owner_key = lookup("OWNER_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| LOCAL_OWNER_KEY.to_string());

        let defaults = UnitMinutesBounds::default();
        let unit_minutes = UnitMinutesBounds {
            min: parse_or(&lookup, "MIN_UNIT_MINUTES", defaults.min)?,
            max: parse_or(&lookup, "MAX_UNIT_MINUTES", defaults.max)?,
        };
        if unit_minutes.min < 1 || unit_minutes.min > unit_minutes.max {
            return Err(ConfigError::InvalidValue(
                "MIN_UNIT_MINUTES".to_string(),
                format!(
                    "bounds {}..={} must be positive and ordered",
                    unit_minutes.min, unit_minutes.max
                ),
            ));
        }

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            owner_key: OwnerKey::new(owner_key),
            unit_minutes,
            cors_origin,
        })
    }
}

/// Parses `key` when it is set, falling back to `default` otherwise.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
