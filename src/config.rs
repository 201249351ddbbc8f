//! Runtime configuration, read from the environment (and `.env` if present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::status::StatusPolicy;
use crate::{Error, Result};

pub const CAPTURE_DELAY_VAR: &str = "ESCROW_CAPTURE_DELAY_MS";
pub const LOGIN_LATENCY_VAR: &str = "ESCROW_LOGIN_LATENCY_MS";
pub const STATUS_POLICY_VAR: &str = "ESCROW_STATUS_POLICY";
pub const DATA_DIR_VAR: &str = "ESCROW_DATA_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How long a new purchase stays pending before payment is captured.
    pub capture_delay: Duration,
    /// Simulated round-trip for login and registration.
    pub login_latency: Duration,
    pub status_policy: StatusPolicy,
    /// Directory used by file-backed storage.
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_delay: Duration::from_millis(2000),
            login_latency: Duration::from_millis(1000),
            status_policy: StatusPolicy::Enforced,
            data_dir: PathBuf::from(".escrow"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(CAPTURE_DELAY_VAR) {
            config.capture_delay = parse_millis(CAPTURE_DELAY_VAR, &raw)?;
        }
        if let Some(raw) = lookup(LOGIN_LATENCY_VAR) {
            config.login_latency = parse_millis(LOGIN_LATENCY_VAR, &raw)?;
        }
        if let Some(raw) = lookup(STATUS_POLICY_VAR) {
            config.status_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(raw);
        }

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| Error::Config(format!("invalid {name} '{raw}': {e}")))
}
