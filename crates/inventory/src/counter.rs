//! The stock counter port.
//!
//! Backends (Redis, in-memory) implement the store round-trips; the advisory
//! threshold checks are provided here once on top of the reads.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use stockgate_core::{DomainError, StockId};

use crate::level::StockLevel;

/// Failure talking to the counter store.
///
/// Key absence is not an error (see [`StockLevel::NotFound`]). None of these
/// are retried internally: a mutation that failed in transit may or may not
/// have been applied.
#[derive(Debug, Error)]
pub enum StockCounterError {
    /// Rejected before any store command was issued.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] DomainError),

    /// The store could not be reached (connect, I/O, timeout).
    #[error("stock store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error or an unexpected reply.
    #[error("stock store command failed: {0}")]
    Command(String),
}

impl StockCounterError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StockCounterError::Unavailable(_))
    }
}

/// Cache-backed stock counter in front of the authoritative stock store.
///
/// Entries only come into existence through [`initialize`](Self::initialize)
/// or [`initialize_all`](Self::initialize_all); mutations on an absent key
/// return [`StockLevel::NotFound`] and leave it absent. Mutations never
/// refresh an entry's TTL.
pub trait StockCounter: Send + Sync {
    /// Atomically subtract `quantity` if the entry exists.
    ///
    /// The result may be negative (oversell); compensating is up to the caller.
    fn decrement(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError>;

    /// Atomically add `quantity` if the entry exists.
    fn increment(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError>;

    fn get_stock(&self, id: StockId) -> Result<StockLevel, StockCounterError>;

    /// Batch read. Every requested id is present in the result.
    ///
    /// Keys are read independently; there is no cross-key snapshot.
    fn get_stocks(&self, ids: &[StockId]) -> Result<HashMap<StockId, StockLevel>, StockCounterError>;

    /// Overwrite the entry and (re)apply the configured TTL.
    fn initialize(&self, id: StockId, quantity: i64) -> Result<(), StockCounterError>;

    /// Best-effort batch seed. Not atomic across keys: on failure, a subset of
    /// the entries may already have been written.
    fn initialize_all(&self, stocks: &HashMap<StockId, i64>) -> Result<(), StockCounterError>;

    fn exists(&self, id: StockId) -> Result<bool, StockCounterError>;

    fn delete(&self, id: StockId) -> Result<(), StockCounterError>;

    /// Advisory check; a concurrent mutation can invalidate it immediately.
    fn has_stock(&self, id: StockId, required: i64) -> Result<bool, StockCounterError> {
        Ok(self.get_stock(id)?.covers(required))
    }

    /// Advisory batch check. Absent entries count as insufficient; an empty
    /// requirement set is vacuously satisfied.
    fn has_stocks(&self, requirements: &HashMap<StockId, i64>) -> Result<bool, StockCounterError> {
        if requirements.is_empty() {
            return Ok(true);
        }

        let ids: Vec<StockId> = requirements.keys().copied().collect();
        let current = self.get_stocks(&ids)?;

        Ok(requirements.iter().all(|(id, required)| {
            current
                .get(id)
                .copied()
                .unwrap_or(StockLevel::NotFound)
                .covers(*required)
        }))
    }
}

impl<C> StockCounter for Arc<C>
where
    C: StockCounter + ?Sized,
{
    fn decrement(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        (**self).decrement(id, quantity)
    }

    fn increment(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        (**self).increment(id, quantity)
    }

    fn get_stock(&self, id: StockId) -> Result<StockLevel, StockCounterError> {
        (**self).get_stock(id)
    }

    fn get_stocks(&self, ids: &[StockId]) -> Result<HashMap<StockId, StockLevel>, StockCounterError> {
        (**self).get_stocks(ids)
    }

    fn initialize(&self, id: StockId, quantity: i64) -> Result<(), StockCounterError> {
        (**self).initialize(id, quantity)
    }

    fn initialize_all(&self, stocks: &HashMap<StockId, i64>) -> Result<(), StockCounterError> {
        (**self).initialize_all(stocks)
    }

    fn exists(&self, id: StockId) -> Result<bool, StockCounterError> {
        (**self).exists(id)
    }

    fn delete(&self, id: StockId) -> Result<(), StockCounterError> {
        (**self).delete(id)
    }

    fn has_stock(&self, id: StockId, required: i64) -> Result<bool, StockCounterError> {
        (**self).has_stock(id, required)
    }

    fn has_stocks(&self, requirements: &HashMap<StockId, i64>) -> Result<bool, StockCounterError> {
        (**self).has_stocks(requirements)
    }
}
