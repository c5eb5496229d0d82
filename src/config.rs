//! Process configuration, read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `GITHUB_TOKEN` | required |
//! | `DEVIN_API_KEY` | required |
//! | `WEBHOOK_SECRET` | required |
//! | `DEVIN_API_URL` | `https://api.devin.ai/v1` |
//! | `DEVIN_CHECKS_BIND_ADDR` | `0.0.0.0:3000` |
//!
//! Poller timing and check-run settings are read by [`PollerConfig::from_env`].

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::devin::{DEFAULT_DEVIN_API_URL, DevinConfig};
use crate::poller::PollerConfig;

const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
const ENV_DEVIN_API_KEY: &str = "DEVIN_API_KEY";
const ENV_DEVIN_API_URL: &str = "DEVIN_API_URL";
const ENV_WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
const ENV_BIND_ADDR: &str = "DEVIN_CHECKS_BIND_ADDR";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Errors reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub devin: DevinConfig,
    pub webhook_secret: Vec<u8>,
    pub bind_addr: SocketAddr,
    pub poller: PollerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let github_token = env_required(ENV_GITHUB_TOKEN)?;
        let devin_api_key = env_required(ENV_DEVIN_API_KEY)?;
        let webhook_secret = env_required(ENV_WEBHOOK_SECRET)?.into_bytes();

        let api_url = env_string(ENV_DEVIN_API_URL).unwrap_or_else(|| DEFAULT_DEVIN_API_URL.to_string());
        let api_url = Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
            name: ENV_DEVIN_API_URL,
            reason: e.to_string(),
        })?;

        let bind_addr = match env_parse::<SocketAddr>(ENV_BIND_ADDR)? {
            Some(addr) => addr,
            None => parse_value(ENV_BIND_ADDR, DEFAULT_BIND_ADDR)?,
        };

        Ok(Config {
            github_token,
            devin: DevinConfig::new(api_url, devin_api_key),
            webhook_secret,
            bind_addr,
            poller: PollerConfig::from_env()?,
        })
    }
}

/// Reads a variable, treating empty and whitespace-only values as unset.
pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_string(name).ok_or(ConfigError::Missing(name))
}

/// Reads and parses an optional variable.
pub(crate) fn env_parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|raw| parse_value(name, &raw))
        .transpose()
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{raw:?}: {e}"),
    })
}
