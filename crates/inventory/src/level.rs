use serde::{Deserialize, Serialize};

use stockgate_core::ValueObject;

/// Result of a counter read or mutation.
///
/// `NotFound` means the cache holds no entry for the id (never seeded, expired
/// or evicted). It is **not** zero stock: callers must resync from the
/// authoritative store before trusting the counter again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "quantity", rename_all = "snake_case")]
pub enum StockLevel {
    /// Entry present; the value may be zero or negative (oversold).
    Found(i64),
    /// No live entry for the key.
    NotFound,
}

impl StockLevel {
    pub fn value(&self) -> Option<i64> {
        match self {
            StockLevel::Found(v) => Some(*v),
            StockLevel::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, StockLevel::Found(_))
    }

    /// True when a mutation drove the counter below zero.
    pub fn is_oversold(&self) -> bool {
        matches!(self, StockLevel::Found(v) if *v < 0)
    }

    /// Whether this level satisfies `required` units.
    ///
    /// An absent entry never covers a requirement, whatever its sign.
    pub fn covers(&self, required: i64) -> bool {
        match self {
            StockLevel::Found(v) => *v >= required,
            StockLevel::NotFound => false,
        }
    }
}

impl From<Option<i64>> for StockLevel {
    fn from(value: Option<i64>) -> Self {
        value.map_or(StockLevel::NotFound, StockLevel::Found)
    }
}

impl ValueObject for StockLevel {}

impl core::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StockLevel::Found(v) => write!(f, "{v}"),
            StockLevel::NotFound => f.write_str("not found"),
        }
    }
}
