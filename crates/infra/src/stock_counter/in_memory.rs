use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use stockgate_core::{DomainError, StockId};
use stockgate_inventory::{
    CounterKeySpace, EntryTtl, Quantity, StockCounter, StockCounterError, StockLevel,
};

use super::log_mutation;

#[derive(Debug, Copy, Clone)]
struct Entry {
    value: i64,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory stock counter.
///
/// Intended for tests/dev. The map lock stands in for the store's per-key
/// command serialization; expired entries are dropped lazily.
#[derive(Debug)]
pub struct InMemoryStockCounter {
    keys: CounterKeySpace,
    ttl: EntryTtl,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStockCounter {
    pub fn new() -> Self {
        Self::with_settings(CounterKeySpace::default(), EntryTtl::DEFAULT)
    }

    pub fn with_settings(keys: CounterKeySpace, ttl: EntryTtl) -> Self {
        Self {
            keys,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(ttl: EntryTtl) -> Self {
        Self::with_settings(CounterKeySpace::default(), ttl)
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize, StockCounterError> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.values().filter(|e| e.is_live(now)).count())
    }

    pub fn is_empty(&self) -> Result<bool, StockCounterError> {
        Ok(self.len()? == 0)
    }

    fn poisoned() -> StockCounterError {
        StockCounterError::Unavailable("lock poisoned".to_string())
    }

    fn apply_delta(&self, id: StockId, delta: i64) -> Result<StockLevel, StockCounterError> {
        let key = self.keys.key_for(id);
        let now = Instant::now();

        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;

        let Some(entry) = entries.get_mut(&key) else {
            return Ok(StockLevel::NotFound);
        };

        if !entry.is_live(now) {
            entries.remove(&key);
            return Ok(StockLevel::NotFound);
        }

        // TTL intentionally left as seeded.
        entry.value = entry.value.checked_add(delta).ok_or_else(|| {
            StockCounterError::Command(format!("increment or decrement would overflow at '{key}'"))
        })?;

        Ok(StockLevel::Found(entry.value))
    }

    fn read(&self, key: &str, now: Instant) -> Result<StockLevel, StockCounterError> {
        {
            let entries = self.entries.read().map_err(|_| Self::poisoned())?;
            match entries.get(key) {
                None => return Ok(StockLevel::NotFound),
                Some(e) if e.is_live(now) => return Ok(StockLevel::Found(e.value)),
                Some(_) => {}
            }
        }

        // Expired: purge it. Re-check, a concurrent initialize may have replaced it.
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        Ok(StockLevel::NotFound)
    }
}

impl Default for InMemoryStockCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl StockCounter for InMemoryStockCounter {
    fn decrement(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        let quantity = Quantity::new(quantity)?;
        let level = self.apply_delta(id, -quantity.get())?;
        log_mutation("decrement", id, quantity.get(), level);
        Ok(level)
    }

    fn increment(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        let quantity = Quantity::new(quantity)?;
        let level = self.apply_delta(id, quantity.get())?;
        log_mutation("increment", id, quantity.get(), level);
        Ok(level)
    }

    fn get_stock(&self, id: StockId) -> Result<StockLevel, StockCounterError> {
        self.read(&self.keys.key_for(id), Instant::now())
    }

    fn get_stocks(&self, ids: &[StockId]) -> Result<HashMap<StockId, StockLevel>, StockCounterError> {
        let now = Instant::now();
        ids.iter()
            .map(|id| Ok((*id, self.read(&self.keys.key_for(*id), now)?)))
            .collect()
    }

    fn initialize(&self, id: StockId, quantity: i64) -> Result<(), StockCounterError> {
        let expires_at = Instant::now()
            .checked_add(self.ttl.as_duration())
            .ok_or_else(|| DomainError::validation("ttl overflows the monotonic clock"))?;
        let entry = Entry {
            value: quantity,
            expires_at,
        };
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(self.keys.key_for(id), entry);
        Ok(())
    }

    fn initialize_all(&self, stocks: &HashMap<StockId, i64>) -> Result<(), StockCounterError> {
        // One write per key, mirroring a pipelined (non-transactional) batch.
        for (id, quantity) in stocks {
            self.initialize(*id, *quantity)?;
        }
        Ok(())
    }

    fn exists(&self, id: StockId) -> Result<bool, StockCounterError> {
        Ok(self.get_stock(id)?.is_found())
    }

    fn delete(&self, id: StockId) -> Result<(), StockCounterError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(&self.keys.key_for(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    fn id(n: i64) -> StockId {
        StockId::new(n)
    }

    #[test]
    fn reserve_oversell_and_compensate() {
        let counter = InMemoryStockCounter::new();
        counter.initialize(id(42), 100).unwrap();

        assert_eq!(counter.decrement(id(42), 30).unwrap(), StockLevel::Found(70));
        assert_eq!(counter.decrement(id(42), 80).unwrap(), StockLevel::Found(-10));
        assert_eq!(counter.increment(id(42), 80).unwrap(), StockLevel::Found(70));
        assert_eq!(counter.get_stock(id(42)).unwrap(), StockLevel::Found(70));
    }

    #[test]
    fn mutations_never_create_absent_entries() {
        let counter = InMemoryStockCounter::new();

        assert_eq!(counter.decrement(id(99), 5).unwrap(), StockLevel::NotFound);
        assert!(!counter.exists(id(99)).unwrap());

        assert_eq!(counter.increment(id(99), 5).unwrap(), StockLevel::NotFound);
        assert!(!counter.exists(id(99)).unwrap());
        assert!(counter.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let counter = Arc::new(InMemoryStockCounter::new());
        counter.initialize(id(1), 5).unwrap();

        let poisoner = counter.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the counter lock");
        })
        .join();

        assert!(counter.len().unwrap_err().is_unavailable());
        assert!(counter.is_empty().unwrap_err().is_unavailable());
        assert!(counter.get_stock(id(1)).unwrap_err().is_unavailable());
    }

    #[test]
    fn reads_purge_expired_entries() {
        let ttl = EntryTtl::new(Duration::from_millis(30)).unwrap();
        let counter = InMemoryStockCounter::with_ttl(ttl);
        counter
            .initialize_all(&HashMap::from([(id(1), 1), (id(2), 2), (id(3), 3)]))
            .unwrap();

        thread::sleep(Duration::from_millis(80));

        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::NotFound);
        assert!(!counter.exists(id(2)).unwrap());
        assert_eq!(counter.get_stocks(&[id(3)]).unwrap()[&id(3)], StockLevel::NotFound);
        assert!(counter.entries.read().unwrap().is_empty());
    }

    #[test]
    fn longest_allowed_ttl_seeds_without_overflow() {
        let counter = InMemoryStockCounter::with_ttl(EntryTtl::MAX);
        counter.initialize(id(1), 5).unwrap();
        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::Found(5));
    }

    #[test]
    fn batch_seed_then_batch_read_reports_every_id() {
        let counter = InMemoryStockCounter::new();
        counter
            .initialize_all(&HashMap::from([(id(1), 10), (id(2), 20)]))
            .unwrap();

        let levels = counter.get_stocks(&[id(1), id(2), id(3)]).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[&id(1)], StockLevel::Found(10));
        assert_eq!(levels[&id(2)], StockLevel::Found(20));
        assert_eq!(levels[&id(3)], StockLevel::NotFound);
    }

    #[test]
    fn empty_batch_read_returns_empty_map() {
        let counter = InMemoryStockCounter::new();
        assert!(counter.get_stocks(&[]).unwrap().is_empty());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let ttl = EntryTtl::new(Duration::from_millis(50)).unwrap();
        let counter = InMemoryStockCounter::with_ttl(ttl);
        counter.initialize(id(7), 5).unwrap();
        assert_eq!(counter.get_stock(id(7)).unwrap(), StockLevel::Found(5));

        thread::sleep(Duration::from_millis(120));

        assert_eq!(counter.get_stock(id(7)).unwrap(), StockLevel::NotFound);
        assert!(!counter.exists(id(7)).unwrap());
        assert_eq!(counter.decrement(id(7), 1).unwrap(), StockLevel::NotFound);
    }

    #[test]
    fn mutations_do_not_refresh_ttl() {
        let ttl = EntryTtl::new(Duration::from_millis(150)).unwrap();
        let counter = InMemoryStockCounter::with_ttl(ttl);
        counter.initialize(id(1), 10).unwrap();

        for _ in 0..4 {
            thread::sleep(Duration::from_millis(50));
            let _ = counter.decrement(id(1), 1).unwrap();
        }

        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::NotFound);
    }

    #[test]
    fn initialize_overwrites_and_resets_value() {
        let counter = InMemoryStockCounter::new();
        counter.initialize(id(5), 10).unwrap();
        counter.decrement(id(5), 4).unwrap();
        counter.initialize(id(5), 50).unwrap();
        assert_eq!(counter.get_stock(id(5)).unwrap(), StockLevel::Found(50));
    }

    #[test]
    fn delete_evicts_and_is_idempotent() {
        let counter = InMemoryStockCounter::new();
        counter.initialize(id(3), 1).unwrap();
        counter.delete(id(3)).unwrap();
        assert!(!counter.exists(id(3)).unwrap());
        counter.delete(id(3)).unwrap();
    }

    #[test]
    fn non_positive_quantities_are_rejected_without_mutation() {
        let counter = InMemoryStockCounter::new();
        counter.initialize(id(1), 10).unwrap();

        for bad in [0, -1, i64::MIN] {
            assert!(matches!(
                counter.decrement(id(1), bad),
                Err(StockCounterError::InvalidArgument(_))
            ));
            assert!(matches!(
                counter.increment(id(1), bad),
                Err(StockCounterError::InvalidArgument(_))
            ));
        }
        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::Found(10));
    }

    #[test]
    fn overflow_is_a_command_error_and_leaves_value() {
        let counter = InMemoryStockCounter::new();
        counter.initialize(id(1), i64::MAX).unwrap();
        assert!(matches!(
            counter.increment(id(1), 1),
            Err(StockCounterError::Command(_))
        ));
        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::Found(i64::MAX));
    }

    #[test]
    fn custom_key_space_isolates_counters() {
        let keys = CounterKeySpace::new("tenant-a:stock:").unwrap();
        let counter = InMemoryStockCounter::with_settings(keys, EntryTtl::DEFAULT);
        counter.initialize(id(1), 3).unwrap();
        assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::Found(3));
    }

    #[test]
    fn concurrent_deltas_all_apply() {
        let counter = Arc::new(InMemoryStockCounter::new());
        counter.initialize(id(1), 10_000).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        if worker % 2 == 0 {
                            counter.decrement(id(1), 3).unwrap();
                        } else {
                            counter.increment(id(1), 1).unwrap();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // 4 decrementing workers * 500 * 3, 4 incrementing workers * 500 * 1.
        assert_eq!(
            counter.get_stock(id(1)).unwrap(),
            StockLevel::Found(10_000 - 6_000 + 2_000)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Final value is the seed minus every decrement plus every increment.
        #[test]
        fn final_value_is_net_of_all_deltas(
            initial in -1_000i64..1_000,
            ops in prop::collection::vec((any::<bool>(), 1i64..500), 0..40)
        ) {
            let counter = InMemoryStockCounter::new();
            counter.initialize(id(1), initial).unwrap();

            let mut expected = initial;
            for (is_decrement, qty) in &ops {
                let level = if *is_decrement {
                    expected -= qty;
                    counter.decrement(id(1), *qty).unwrap()
                } else {
                    expected += qty;
                    counter.increment(id(1), *qty).unwrap()
                };
                prop_assert_eq!(level, StockLevel::Found(expected));
            }

            prop_assert_eq!(counter.get_stock(id(1)).unwrap(), StockLevel::Found(expected));
        }
    }
}
