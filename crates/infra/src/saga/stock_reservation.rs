//! Multi-item stock reservation with compensation.
//!
//! Flow:
//! 1. Decrement each requested id in order
//! 2. Oversold result → increment that id back, roll back earlier lines, fail
//! 3. Absent entry → roll back earlier lines, fail (cache needs a resync)
//! 4. Store error → roll back best-effort, fail
//!
//! Rollback is not atomic and not retried: a compensation that fails is logged
//! and the original failure is still returned.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, instrument, warn};

use stockgate_core::StockId;
use stockgate_inventory::{StockCounter, StockCounterError, StockLevel};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("insufficient stock for {stock_id}: requested {requested}, available {available}")]
    Insufficient {
        stock_id: StockId,
        requested: i64,
        available: i64,
    },

    #[error("stock counter for {stock_id} is not cached; resync required")]
    NotCached { stock_id: StockId },

    #[error(transparent)]
    Counter(#[from] StockCounterError),
}

/// Lines successfully taken from the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    lines: Vec<(StockId, i64)>,
}

impl Reservation {
    pub fn lines(&self) -> &[(StockId, i64)] {
        &self.lines
    }

    /// Return every reserved unit (order cancelled, items returned).
    ///
    /// Stops at the first store error; lines after it are not released.
    pub fn release<C: StockCounter + ?Sized>(self, counter: &C) -> Result<(), StockCounterError> {
        for (id, quantity) in self.lines {
            if counter.increment(id, quantity)? == StockLevel::NotFound {
                warn!(stock_id = %id, quantity, "released stock for an absent counter entry");
            }
        }
        Ok(())
    }
}

/// Reserve every `(id, quantity)` line or none of them.
#[instrument(skip(counter, requirements), err)]
pub fn reserve_all<C, I>(counter: &C, requirements: I) -> Result<Reservation, ReservationError>
where
    C: StockCounter + ?Sized,
    I: IntoIterator<Item = (StockId, i64)>,
{
    let mut taken: Vec<(StockId, i64)> = Vec::new();

    for (id, quantity) in requirements {
        let level = match counter.decrement(id, quantity) {
            Ok(level) => level,
            Err(e) => {
                roll_back(counter, &taken);
                return Err(e.into());
            }
        };

        match level {
            StockLevel::NotFound => {
                roll_back(counter, &taken);
                return Err(ReservationError::NotCached { stock_id: id });
            }
            StockLevel::Found(remaining) if remaining < 0 => {
                compensate(counter, id, quantity);
                roll_back(counter, &taken);
                return Err(ReservationError::Insufficient {
                    stock_id: id,
                    requested: quantity,
                    available: remaining + quantity,
                });
            }
            StockLevel::Found(_) => taken.push((id, quantity)),
        }
    }

    Ok(Reservation { lines: taken })
}

fn roll_back<C: StockCounter + ?Sized>(counter: &C, taken: &[(StockId, i64)]) {
    for (id, quantity) in taken.iter().rev() {
        compensate(counter, *id, *quantity);
    }
}

fn compensate<C: StockCounter + ?Sized>(counter: &C, id: StockId, quantity: i64) {
    match counter.increment(id, quantity) {
        Ok(StockLevel::NotFound) => {
            warn!(stock_id = %id, quantity, "compensation skipped: counter entry expired")
        }
        Ok(StockLevel::Found(_)) => {}
        Err(e) => error!(stock_id = %id, quantity, error = %e, "compensation failed"),
    }
}
