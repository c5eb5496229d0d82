//! Poller configuration.
//!
//! # Timing
//!
//! - **Poll interval**: 60 seconds by default (`DEVIN_CHECKS_POLL_INTERVAL_MS`).
//!   The first cycle runs one full interval after start.
//! - **Maximum tracking age**: 24 hours by default (`DEVIN_CHECKS_MAX_AGE_HOURS`).
//!   Entries older than this are dropped regardless of session status, which
//!   bounds the registry when a session never reaches a terminal state.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{ConfigError, env_parse, env_string};
use crate::types::SessionId;

/// Default poll interval (60 seconds).
const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;

/// Default maximum tracking age (24 hours).
const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// Default check-run name.
pub const DEFAULT_CHECK_NAME: &str = "Devin";

/// Default base URL of the session web app, used for check-run `details_url`.
pub const DEFAULT_APP_URL: &str = "https://app.devin.ai";

const ENV_POLL_INTERVAL_MS: &str = "DEVIN_CHECKS_POLL_INTERVAL_MS";
const ENV_MAX_AGE_HOURS: &str = "DEVIN_CHECKS_MAX_AGE_HOURS";
const ENV_CHECK_NAME: &str = "DEVIN_CHECKS_CHECK_NAME";
const ENV_APP_URL: &str = "DEVIN_APP_URL";

/// Configuration for the status poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Interval between reconciliation cycles.
    pub poll_interval: Duration,

    /// Tracked PRs older than this are evicted without further calls.
    pub max_tracking_age: Duration,

    /// Name of the check-run written on each PR's head commit.
    pub check_name: String,

    /// Base URL of the session web app.
    pub app_url: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerConfig {
    pub fn new() -> Self {
        PollerConfig {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_tracking_age: Duration::from_secs(DEFAULT_MAX_AGE_HOURS * 3600),
            check_name: DEFAULT_CHECK_NAME.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
        }
    }

    /// Reads overrides from the environment; unset variables keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new();

        let poll_interval = env_parse::<u64>(ENV_POLL_INTERVAL_MS)?
            .map(poll_interval_from_millis)
            .transpose()?;
        let max_tracking_age = env_parse::<u64>(ENV_MAX_AGE_HOURS)?
            .map(tracking_age_from_hours)
            .transpose()?;

        Ok(PollerConfig {
            poll_interval: poll_interval.unwrap_or(defaults.poll_interval),
            max_tracking_age: max_tracking_age.unwrap_or(defaults.max_tracking_age),
            check_name: env_string(ENV_CHECK_NAME).unwrap_or(defaults.check_name),
            app_url: env_string(ENV_APP_URL).unwrap_or(defaults.app_url),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_tracking_age(mut self, max_tracking_age: Duration) -> Self {
        self.max_tracking_age = max_tracking_age;
        self
    }

    pub fn with_check_name(mut self, check_name: impl Into<String>) -> Self {
        self.check_name = check_name.into();
        self
    }

    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = app_url.into();
        self
    }

    /// True if an entry added at `added_at` has outlived the tracking window.
    ///
    /// Timestamps in the future (clock skew) are never considered expired.
    pub fn is_expired(&self, added_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - added_at)
            .to_std()
            .is_ok_and(|age| age > self.max_tracking_age)
    }

    /// Link from a check-run to the live session page.
    pub fn details_url(&self, session: &SessionId) -> String {
        format!(
            "{}/sessions/{}",
            self.app_url.trim_end_matches('/'),
            session.url_slug()
        )
    }
}

fn poll_interval_from_millis(ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Invalid {
            name: ENV_POLL_INTERVAL_MS,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn tracking_age_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    if hours == 0 {
        return Err(ConfigError::Invalid {
            name: ENV_MAX_AGE_HOURS,
            reason: "must be greater than zero".to_string(),
        });
    }
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name: ENV_MAX_AGE_HOURS,
            reason: format!("{hours} hours is too large"),
        })
}
