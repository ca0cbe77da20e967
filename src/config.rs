//! Runtime configuration: JSON file, then `FQ_*` environment overrides.

use crate::congestion::{DEFAULT_CONGESTION, MAX_CONGESTION};
use crate::report::DEFAULT_DELEGATION_DIVISOR;
use crate::stake::{Address, AddressError};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;

/// Public RPC endpoint used when none is configured.
pub const DEFAULT_RPC_URL: &str = "https://vinuchain-rpc.com";
/// Chain id of the target network.
pub const DEFAULT_CHAIN_ID: u64 = 207;
/// Staking contract exposing `getStake`.
pub const DEFAULT_STAKE_CONTRACT: Address = Address::from_bytes([
    0x9d, 0x6a, 0xa0, 0x3a, 0x8d, 0x4a, 0xcf, 0x7b, 0x43, 0xc5, 0x62, 0xf3, 0x49, 0xee, 0x45,
    0xb3, 0x21, 0x4c, 0x3b, 0xbf,
]);
/// SFC contract exposing `delegations`.
pub const DEFAULT_SFC_CONTRACT: Address = Address::from_bytes([
    0xfc, 0x00, 0xfa, 0xce, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);
/// Refresh cadence of the poller.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Per-request RPC timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    /// Reading the config file failed.
    Io(String),
    #[error("config parse error: {0}")]
    /// The config file is not valid JSON for [`QuotaConfig`].
    Parse(String),
    #[error("invalid {field}: {reason}")]
    /// A value is out of range or malformed.
    Invalid {
        /// Offending field or variable.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Which contract read supplies the quota basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// `getStake` on the staking contract, run through the formula.
    Stake {
        /// Staking contract.
        #[serde(default = "default_stake_contract")]
        contract: Address,
        /// Validator id argument; `None` calls the single-argument form.
        #[serde(default = "default_validator_id")]
        validator_id: Option<u64>,
    },
    /// `delegations` on the SFC contract, divided by `divisor`.
    Delegations {
        /// SFC contract.
        #[serde(default = "default_sfc_contract")]
        contract: Address,
        /// Divisor applied to the raw value.
        #[serde(default = "default_divisor")]
        divisor: NonZeroU64,
    },
}

fn default_stake_contract() -> Address {
    DEFAULT_STAKE_CONTRACT
}

fn default_sfc_contract() -> Address {
    DEFAULT_SFC_CONTRACT
}

fn default_validator_id() -> Option<u64> {
    Some(0)
}

fn default_divisor() -> NonZeroU64 {
    DEFAULT_DELEGATION_DIVISOR
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Stake {
            contract: DEFAULT_STAKE_CONTRACT,
            validator_id: default_validator_id(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Expected chain id.
    pub chain_id: u64,
    /// Account to query.
    pub account: Option<Address>,
    /// Quota basis source.
    pub source: SourceConfig,
    /// Congestion estimate in UT.
    pub congestion: f64,
    /// Seconds between refreshes.
    pub poll_interval_secs: u64,
    /// RPC request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            account: None,
            source: SourceConfig::default(),
            congestion: DEFAULT_CONGESTION,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl QuotaConfig {
    /// Loads from JSON; a missing file yields defaults.  Environment
    /// overrides are applied and the result validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = Self::from_file(path)?;
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads the JSON file only.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `FQ_*` overrides fetched through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = var("FQ_RPC_URL") {
            self.rpc_url = url.trim().to_string();
        }
        if let Some(raw) = var("FQ_CHAIN_ID") {
            self.chain_id = parse_var("FQ_CHAIN_ID", &raw)?;
        }
        if let Some(raw) = var("FQ_ACCOUNT") {
            let account: Address = raw
                .parse()
                .map_err(|err: AddressError| ConfigError::invalid("FQ_ACCOUNT", err.to_string()))?;
            self.account = Some(account);
        }
        if let Some(raw) = var("FQ_CONGESTION") {
            self.congestion = parse_var("FQ_CONGESTION", &raw)?;
        }
        if let Some(raw) = var("FQ_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_var("FQ_POLL_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = var("FQ_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_var("FQ_REQUEST_TIMEOUT_MS", &raw)?;
        }
        Ok(())
    }

    /// Rejects values the runtime cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::invalid("rpc_url", "must be an http(s) URL"));
        }
        validate_congestion(self.congestion)?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("poll_interval_secs", "must be positive"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("request_timeout_ms", "must be positive"));
        }
        Ok(())
    }

    /// Poll cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// RPC timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Checks a user-supplied congestion estimate against `0..=500`.
pub fn validate_congestion(congestion: f64) -> Result<f64, ConfigError> {
    if congestion.is_finite() && (0.0..=MAX_CONGESTION).contains(&congestion) {
        Ok(congestion)
    } else {
        Err(ConfigError::invalid(
            "congestion",
            format!("{congestion} is outside 0..={MAX_CONGESTION}"),
        ))
    }
}

fn parse_var<T>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::invalid(field, err.to_string()))
}
