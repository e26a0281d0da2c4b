use crate::error::ConfigError;
use crate::kernel::time::HEARTBEAT_INTERVAL;
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_CONSENT_KEY: &str = "analytics_consent";
pub const DEFAULT_SESSION_KEY: &str = "analytics_session_id";

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Base URL of the site; ingestion routes live under `/api/analytics`.
    pub endpoint: String,
    pub heartbeat_interval: Duration,
    /// Per-request timeout for session and event calls.
    pub request_timeout: Duration,
    /// How long teardown waits for the page-leave beacon.
    pub beacon_timeout: Duration,
    pub consent_key: String,
    pub session_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            request_timeout: Duration::from_secs(5),
            beacon_timeout: Duration::from_secs(2),
            consent_key: DEFAULT_CONSENT_KEY.to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TrackerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = &lookup;
        let defaults = Self::default();
        Ok(Self {
            endpoint: try_load(lookup, "TRACKER_ENDPOINT", defaults.endpoint)?,
            heartbeat_interval: Duration::from_secs(try_load(
                lookup,
                "TRACKER_HEARTBEAT_SECS",
                defaults.heartbeat_interval.as_secs(),
            )?),
            request_timeout: Duration::from_millis(try_load(
                lookup,
                "TRACKER_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),
            beacon_timeout: Duration::from_millis(try_load(
                lookup,
                "TRACKER_BEACON_TIMEOUT_MS",
                defaults.beacon_timeout.as_millis() as u64,
            )?),
            consent_key: try_load(lookup, "TRACKER_CONSENT_KEY", defaults.consent_key)?,
            session_key: try_load(lookup, "TRACKER_SESSION_KEY", defaults.session_key)?,
        }
        .validated()?)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "TRACKER_HEARTBEAT_SECS".to_string(),
                value: "0".to_string(),
                reason: "heartbeat interval must be positive".to_string(),
            });
        }
        Ok(self)
    }
}

fn try_load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
