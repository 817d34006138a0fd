//! Inventory stock counter domain.
//!
//! This crate models the cache-backed stock counter as pure domain logic: the
//! tagged stock level, validated quantities, key derivation and the
//! `StockCounter` port that backends implement (no IO, no storage).

pub mod counter;
pub mod key;
pub mod level;
pub mod quantity;

pub use counter::{StockCounter, StockCounterError};
pub use key::{CounterKeySpace, DEFAULT_KEY_PREFIX};
pub use level::StockLevel;
pub use quantity::{EntryTtl, Quantity};
