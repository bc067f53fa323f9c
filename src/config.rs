use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::ConfigError;
use crate::utils::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/pokemon";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub retry: RetryPolicy,
}

/// Connection settings for [`crate::client::PokeClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to defaults; present but unparseable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();

        let client = ClientConfig {
            url: lookup("POKEAPI_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "POKEAPI_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        };

        let default_max_delay_ms = defaults.max_delay().map_or(0, |d| d.as_millis() as u64);
        let default_jitter_ms = defaults.jitter().map_or(0, |d| d.as_millis() as u64);

        let max_delay_ms = parse_or(&lookup, "POKEAPI_MAX_DELAY_MS", default_max_delay_ms)?;
        let jitter_ms = parse_or(&lookup, "POKEAPI_JITTER_MS", default_jitter_ms)?;

        let retry = RetryPolicy::builder()
            .max_attempts(parse_or(
                &lookup,
                "POKEAPI_MAX_ATTEMPTS",
                defaults.max_attempts(),
            )?)
            .base_delay(Duration::from_millis(parse_or(
                &lookup,
                "POKEAPI_BASE_DELAY_MS",
                defaults.base_delay().as_millis() as u64,
            )?))
            .backoff_multiplier(parse_or(
                &lookup,
                "POKEAPI_BACKOFF_MULTIPLIER",
                defaults.backoff_multiplier(),
            )?)
            // 0 disables the cap / the jitter
            .max_delay((max_delay_ms > 0).then(|| Duration::from_millis(max_delay_ms)))
            .jitter((jitter_ms > 0).then(|| Duration::from_millis(jitter_ms)))
            .build()?;

        Ok(Self { client, retry })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}
