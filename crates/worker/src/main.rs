use anyhow::Context;

use stockgate_infra::{RedisStockCounter, StockCounterConfig, StockSynchronizer};
use stockgate_worker::{FileStockSource, SEED_FILE_VAR};

fn main() -> anyhow::Result<()> {
    stockgate_observability::init();

    let config = StockCounterConfig::from_env()?;
    let seed_file = std::env::var(SEED_FILE_VAR)
        .with_context(|| format!("{SEED_FILE_VAR} must point at a JSON seed file"))?;

    let source = FileStockSource::new(seed_file);
    let ids = source.ids()?;

    let counter = RedisStockCounter::open(&config)?;
    let synchronizer = StockSynchronizer::new(counter, source);

    let report = synchronizer.sync(&ids)?;
    tracing::info!(
        requested = report.requested,
        seeded = report.seeded,
        evicted = report.evicted,
        synced_at = %report.synced_at,
        "seed run complete"
    );

    // Release the store client explicitly.
    let (counter, _source) = synchronizer.into_parts();
    drop(counter.into_client());

    Ok(())
}
