//! Process configuration read from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::keys::DEFAULT_INDEX_KEY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub index_key: String,
    /// Per-command socket timeout and pool checkout timeout.
    pub store_timeout: Duration,
    pub pool_size: u32,
    pub shutdown_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to
    /// its value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let store_backend = match var("STORE_BACKEND", "redis").to_ascii_lowercase().as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    expected: "'redis' or 'memory'",
                    value: other.to_string(),
                })
            }
        };

        let index_key = var("ORDER_INDEX_KEY", DEFAULT_INDEX_KEY);
        if index_key.is_empty() {
            return Err(ConfigError::Invalid {
                name: "ORDER_INDEX_KEY",
                expected: "a non-empty key",
                value: index_key,
            });
        }

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse_number("PORT", &var("PORT", "8080"))?,
            store_backend,
            redis_url: var("REDIS_URL", "redis://127.0.0.1:6379/"),
            index_key,
            store_timeout: Duration::from_millis(parse_positive(
                "STORE_TIMEOUT_MS",
                &var("STORE_TIMEOUT_MS", "5000"),
            )?),
            pool_size: parse_positive("REDIS_POOL_SIZE", &var("REDIS_POOL_SIZE", "16"))?,
            shutdown_timeout: Duration::from_secs(parse_number(
                "SHUTDOWN_TIMEOUT_SECS",
                &var("SHUTDOWN_TIMEOUT_SECS", "10"),
            )?),
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected: "a valid number",
        value: value.to_string(),
    })
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed: T = parse_number(name, value)?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            expected: "greater than zero",
            value: value.to_string(),
        });
    }
    Ok(parsed)
}
