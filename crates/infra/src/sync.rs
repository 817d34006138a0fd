//! Cache (re)seeding from the authoritative stock store.
//!
//! Counter entries expire on a fixed TTL and are never refreshed by traffic, so
//! something has to put them back. The synchronizer is that something: it pulls
//! quantities from a [`StockSource`] and writes them with `initialize_all`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use stockgate_core::StockId;
use stockgate_inventory::{StockCounter, StockCounterError, StockLevel};

/// Authoritative quantities, e.g. a relational stock table.
pub trait StockSource: Send + Sync {
    type Error: core::fmt::Display;

    /// Quantities for the requested ids. Ids the source does not know are
    /// simply missing from the result.
    fn load(&self, ids: &[StockId]) -> Result<HashMap<StockId, i64>, Self::Error>;
}

impl StockSource for HashMap<StockId, i64> {
    type Error = core::convert::Infallible;

    fn load(&self, ids: &[StockId]) -> Result<HashMap<StockId, i64>, Self::Error> {
        Ok(ids
            .iter()
            .filter_map(|id| self.get(id).map(|q| (*id, *q)))
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("stock source error: {0}")]
    Source(String),

    #[error(transparent)]
    Counter(#[from] StockCounterError),
}

/// Outcome of one [`StockSynchronizer::sync`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub requested: usize,
    pub seeded: usize,
    /// Ids unknown to the source whose cache entries were removed.
    pub evicted: usize,
    pub synced_at: DateTime<Utc>,
}

pub struct StockSynchronizer<C, S> {
    counter: C,
    source: S,
}

impl<C, S> StockSynchronizer<C, S>
where
    C: StockCounter,
    S: StockSource,
{
    pub fn new(counter: C, source: S) -> Self {
        Self { counter, source }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn into_parts(self) -> (C, S) {
        (self.counter, self.source)
    }

    fn load(&self, ids: &[StockId]) -> Result<HashMap<StockId, i64>, SyncError> {
        self.source
            .load(ids)
            .map_err(|e| SyncError::Source(e.to_string()))
    }

    /// Reseed every id in `ids` from the source.
    ///
    /// The seed write is a best-effort batch: on error some entries may
    /// already hold fresh values. Eviction of unknown ids runs after the seed.
    #[instrument(skip(self, ids), fields(requested = ids.len()), err)]
    pub fn sync(&self, ids: &[StockId]) -> Result<SyncReport, SyncError> {
        let quantities = self.load(ids)?;
        self.counter.initialize_all(&quantities)?;

        let mut evicted = 0;
        for id in ids.iter().filter(|id| !quantities.contains_key(*id)) {
            self.counter.delete(*id)?;
            evicted += 1;
        }

        let report = SyncReport {
            requested: ids.len(),
            seeded: quantities.len(),
            evicted,
            synced_at: Utc::now(),
        };
        info!(seeded = report.seeded, evicted = report.evicted, "stock counters synchronized");
        Ok(report)
    }

    /// Current cached level, reseeding from the source when the entry is absent.
    ///
    /// Returns `NotFound` only when the source has no row for `id` either.
    pub fn ensure_cached(&self, id: StockId) -> Result<StockLevel, SyncError> {
        let level = self.counter.get_stock(id)?;
        if level.is_found() {
            return Ok(level);
        }

        let Some(quantity) = self.load(&[id])?.get(&id).copied() else {
            warn!(stock_id = %id, "no authoritative stock row; leaving counter absent");
            return Ok(StockLevel::NotFound);
        };

        self.counter.initialize(id, quantity)?;
        Ok(StockLevel::Found(quantity))
    }
}
