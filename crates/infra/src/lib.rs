//! Infrastructure layer: counter backends, configuration, synchronization jobs.

pub mod config;
pub mod saga;
pub mod stock_counter;
pub mod sync;

pub use config::{ConfigError, StockCounterConfig};
pub use stock_counter::InMemoryStockCounter;
#[cfg(feature = "redis")]
pub use stock_counter::RedisStockCounter;
pub use sync::{StockSource, StockSynchronizer, SyncError, SyncReport};
