//! Configuration loading and representation.

use thiserror::Error;

use stockgate_inventory::{CounterKeySpace, DEFAULT_KEY_PREFIX, EntryTtl};

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

pub const REDIS_URL_VAR: &str = "REDIS_URL";
pub const KEY_PREFIX_VAR: &str = "STOCK_COUNTER_KEY_PREFIX";
pub const TTL_SECONDS_VAR: &str = "STOCK_COUNTER_TTL_SECONDS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Settings for a stock counter backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCounterConfig {
    pub redis_url: String,
    pub keys: CounterKeySpace,
    pub ttl: EntryTtl,
}

impl Default for StockCounterConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            keys: CounterKeySpace::default(),
            ttl: EntryTtl::DEFAULT,
        }
    }
}

impl StockCounterConfig {
    /// Load from the process environment, falling back to defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = lookup(REDIS_URL_VAR).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let keys = CounterKeySpace::new(
            lookup(KEY_PREFIX_VAR).unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        )
        .map_err(|e| ConfigError::InvalidValue {
            var: KEY_PREFIX_VAR,
            reason: e.to_string(),
        })?;

        let ttl = match lookup(TTL_SECONDS_VAR) {
            None => EntryTtl::DEFAULT,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    var: TTL_SECONDS_VAR,
                    reason: format!("{raw:?}: {e}"),
                })?;
                EntryTtl::from_secs(secs).map_err(|e| ConfigError::InvalidValue {
                    var: TTL_SECONDS_VAR,
                    reason: e.to_string(),
                })?
            }
        };

        Ok(Self {
            redis_url,
            keys,
            ttl,
        })
    }
}
