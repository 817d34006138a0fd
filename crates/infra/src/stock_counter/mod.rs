//! `StockCounter` backends.
//!
//! - [`RedisStockCounter`] (feature `redis`): production backend; the
//!   existence-gated mutations run as Lua scripts.
//! - [`InMemoryStockCounter`]: same contract for tests/dev.

use tracing::{debug, warn};

use stockgate_core::StockId;
use stockgate_inventory::StockLevel;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryStockCounter;
#[cfg(feature = "redis")]
pub use self::redis::RedisStockCounter;

/// Shared logging for mutation outcomes.
pub(crate) fn log_mutation(op: &'static str, id: StockId, quantity: i64, level: StockLevel) {
    match level {
        StockLevel::NotFound => {
            debug!(op, stock_id = %id, quantity, "counter entry absent; resync required")
        }
        StockLevel::Found(remaining) if remaining < 0 => {
            warn!(op, stock_id = %id, quantity, remaining, "counter went negative (oversell)")
        }
        StockLevel::Found(remaining) => {
            debug!(op, stock_id = %id, quantity, remaining, "counter updated")
        }
    }
}
