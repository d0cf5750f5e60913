//! Bridge Configuration
//!
//! Read once at startup from the process environment:
//! - `PD_SECRET`, `PD_APIKEY`: required PagerDuty credentials
//! - `NULLIFIER_*`: optional server and pool tuning

use std::time::Duration;

use ::config::{Config, Environment};
use dispatcher::{PoolConfig, MAX_POOL_SIZE};
use serde::Deserialize;
use thiserror::Error;

use crate::rate_limit::RateLimitConfig;

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Required environment variable {0} is not set")]
    MissingSecret(&'static str),

    #[error("{name} must be between 1 and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Invalid rate limit configuration: {0:?}")]
    InvalidRateLimit(RateLimitConfig),
}

/// Everything the bridge needs to run, passed explicitly to its parts
#[derive(Clone, Deserialize)]
pub struct BridgeConfig {
    /// Webhook signing secret (`PD_SECRET`)
    #[serde(default)]
    pub secret: String,
    /// REST API key (`PD_APIKEY`)
    #[serde(default)]
    pub apikey: String,
    pub listen_addr: String,
    pub pagerduty_api_url: String,
    pub max_concurrency: usize,
    pub queue_capacity: usize,
    /// Timeout of outbound HTTP calls
    pub request_timeout_secs: u64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl BridgeConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from an explicit set of variables instead of the environment
    pub fn from_vars(vars: ::config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<::config::Map<String, String>>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("listen_addr", "0.0.0.0:8080")?
            .set_default("pagerduty_api_url", pagerduty::DEFAULT_API_URL)?
            .set_default("max_concurrency", 16_i64)?
            .set_default("queue_capacity", 256_i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("rate_limit_per_second", 1_i64)?
            .set_default("rate_limit_burst", 20_i64)?
            .add_source(Environment::with_prefix("PD").source(vars.clone()))
            .add_source(
                Environment::with_prefix("NULLIFIER")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret("PD_SECRET"));
        }
        if self.apikey.is_empty() {
            return Err(ConfigError::MissingSecret("PD_APIKEY"));
        }
        check_pool_size("NULLIFIER_MAX_CONCURRENCY", self.max_concurrency)?;
        check_pool_size("NULLIFIER_QUEUE_CAPACITY", self.queue_capacity)?;
        Ok(self)
    }

    /// Worker pool sizing
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_concurrency: self.max_concurrency,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Webhook rate limit
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_second: self.rate_limit_per_second,
            burst_size: self.rate_limit_burst,
        }
    }

    /// Timeout of outbound HTTP calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_pool_size(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_POOL_SIZE {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            max: MAX_POOL_SIZE,
        });
    }
    Ok(())
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("listen_addr", &self.listen_addr)
            .field("pagerduty_api_url", &self.pagerduty_api_url)
            .field("max_concurrency", &self.max_concurrency)
            .field("queue_capacity", &self.queue_capacity)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish_non_exhaustive()
    }
}
