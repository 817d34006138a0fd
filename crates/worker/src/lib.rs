//! Seed worker: reseeds the stock counter cache from a JSON snapshot of the
//! authoritative stock table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use stockgate_core::StockId;
use stockgate_infra::StockSource;

pub const SEED_FILE_VAR: &str = "STOCKGATE_SEED_FILE";

#[derive(Debug, Error)]
pub enum SeedFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Stock source backed by a JSON object of `"<stock id>": quantity`.
///
/// The file is re-read on every load so a long-running caller sees updates.
#[derive(Debug, Clone)]
pub struct FileStockSource {
    path: PathBuf,
}

impl FileStockSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<HashMap<StockId, i64>, SeedFileError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SeedFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SeedFileError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Every id in the file, ascending.
    pub fn ids(&self) -> Result<Vec<StockId>, SeedFileError> {
        let mut ids: Vec<StockId> = self.read_all()?.into_keys().collect();
        ids.sort();
        Ok(ids)
    }
}

impl StockSource for FileStockSource {
    type Error = SeedFileError;

    fn load(&self, ids: &[StockId]) -> Result<HashMap<StockId, i64>, Self::Error> {
        let all = self.read_all()?;
        Ok(ids
            .iter()
            .filter_map(|id| all.get(id).map(|q| (*id, *q)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockgate_infra::{InMemoryStockCounter, StockSynchronizer};
    use stockgate_inventory::{StockCounter, StockLevel};

    use super::*;

    fn write_seed(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stockgate-{}-{}.json", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_ids_and_quantities() {
        let path = write_seed("read", r#"{"2": 20, "1": 10}"#);
        let source = FileStockSource::new(&path);

        assert_eq!(source.ids().unwrap(), vec![StockId::new(1), StockId::new(2)]);
        let loaded = source.load(&[StockId::new(2), StockId::new(3)]).unwrap();
        assert_eq!(loaded, HashMap::from([(StockId::new(2), 20)]));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let path = write_seed("bad-id", r#"{"sku-1": 10}"#);
        let err = FileStockSource::new(&path).read_all().unwrap_err();
        assert!(matches!(err, SeedFileError::Parse { .. }));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = FileStockSource::new("/nonexistent/stockgate/seed.json");
        assert!(matches!(source.read_all(), Err(SeedFileError::Io { .. })));
    }

    #[test]
    fn seeds_counter_through_synchronizer() {
        let path = write_seed("sync", r#"{"1": 10, "2": 20}"#);
        let source = FileStockSource::new(&path);
        let ids = source.ids().unwrap();

        let counter = Arc::new(InMemoryStockCounter::new());
        let sync = StockSynchronizer::new(counter.clone(), source);
        let report = sync.sync(&ids).unwrap();

        assert_eq!(report.seeded, 2);
        assert_eq!(counter.get_stock(StockId::new(2)).unwrap(), StockLevel::Found(20));
        std::fs::remove_file(path).unwrap();
    }
}
