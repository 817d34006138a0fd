use std::time::Duration;

use serde::{Deserialize, Serialize};

use stockgate_core::{DomainError, DomainResult, ValueObject};

/// Strictly positive number of units moved by a decrement or increment.
///
/// Zero and negative deltas are rejected up front so no store command is ever
/// issued for them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl ValueObject for Quantity {}

/// Lifetime applied to a counter entry when it is seeded.
///
/// Mutations never refresh it, so every entry eventually expires and gets
/// reseeded from the authoritative store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryTtl(Duration);

impl EntryTtl {
    /// 24 hours.
    pub const DEFAULT: EntryTtl = EntryTtl(Duration::from_secs(86_400));

    /// 365 days.
    pub const MAX: EntryTtl = EntryTtl(Duration::from_secs(365 * 86_400));

    pub fn new(ttl: Duration) -> DomainResult<Self> {
        if ttl.as_millis() == 0 {
            return Err(DomainError::validation("ttl must be at least one millisecond"));
        }
        if ttl > Self::MAX.0 {
            return Err(DomainError::validation(format!(
                "ttl must not exceed {} seconds, got {}",
                Self::MAX.0.as_secs(),
                ttl.as_secs()
            )));
        }
        Ok(Self(ttl))
    }

    pub fn from_secs(secs: u64) -> DomainResult<Self> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Milliseconds; always within Redis `PX` range given the `MAX` cap.
    pub fn as_millis(&self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for EntryTtl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ValueObject for EntryTtl {}
