//! Counter key derivation.

use stockgate_core::{DomainError, DomainResult, StockId};

/// Default namespace for counter keys.
pub const DEFAULT_KEY_PREFIX: &str = "stock:counter:";

/// Deterministic mapping from a stock id to its cache key (`{prefix}{id}`).
///
/// The prefix must not overlap any other key namespace in the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterKeySpace {
    prefix: String,
}

impl CounterKeySpace {
    pub fn new(prefix: impl Into<String>) -> DomainResult<Self> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(DomainError::validation("counter key prefix cannot be empty"));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, id: StockId) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Inverse of [`key_for`](Self::key_for); `None` for keys outside this namespace.
    pub fn id_of(&self, key: &str) -> Option<StockId> {
        key.strip_prefix(&self.prefix)?.parse().ok()
    }
}

impl Default for CounterKeySpace {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}
