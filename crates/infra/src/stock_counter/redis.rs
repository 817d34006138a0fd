//! Redis-backed stock counter.
//!
//! - **Key**: `{prefix}{stock_id}` holding a plain integer string
//! - **Mutations**: Lua scripts that gate DECRBY/INCRBY on EXISTS, so an absent
//!   key is never recreated at zero
//! - **Seeding**: `SET key qty PX ttl`; mutations leave the TTL alone
//! - **Absence**: nil reply, never an integer sentinel

use std::collections::HashMap;

use tracing::{debug, instrument};

use stockgate_core::StockId;
use stockgate_inventory::{
    CounterKeySpace, EntryTtl, Quantity, StockCounter, StockCounterError, StockLevel,
};

use super::log_mutation;
use crate::config::StockCounterConfig;

const DECREMENT_IF_EXISTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return false
end
return redis.call('DECRBY', KEYS[1], ARGV[1])
"#;

const INCREMENT_IF_EXISTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return false
end
return redis.call('INCRBY', KEYS[1], ARGV[1])
"#;

/// Stock counter over an injected Redis client.
///
/// Each call checks out its own connection; the counter keeps no other state
/// and takes no locks. Drop it (or call [`into_client`](Self::into_client)) to
/// release the client.
pub struct RedisStockCounter {
    client: redis::Client,
    keys: CounterKeySpace,
    ttl: EntryTtl,
    decrement_script: redis::Script,
    increment_script: redis::Script,
}

impl core::fmt::Debug for RedisStockCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisStockCounter")
            .field("keys", &self.keys)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisStockCounter {
    pub fn new(client: redis::Client, keys: CounterKeySpace, ttl: EntryTtl) -> Self {
        Self {
            client,
            keys,
            ttl,
            decrement_script: redis::Script::new(DECREMENT_IF_EXISTS),
            increment_script: redis::Script::new(INCREMENT_IF_EXISTS),
        }
    }

    /// Open a client for `config.redis_url`.
    ///
    /// No connection is made until the first command.
    pub fn open(config: &StockCounterConfig) -> Result<Self, StockCounterError> {
        let client = redis::Client::open(config.redis_url.as_str()).map_err(map_redis_error)?;
        Ok(Self::new(client, config.keys.clone(), config.ttl))
    }

    pub fn into_client(self) -> redis::Client {
        self.client
    }

    fn connection(&self) -> Result<redis::Connection, StockCounterError> {
        self.client.get_connection().map_err(map_redis_error)
    }

    fn run_gated(
        &self,
        script: &redis::Script,
        id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StockCounterError> {
        let mut conn = self.connection()?;
        let reply: Option<i64> = script
            .key(self.keys.key_for(id))
            .arg(quantity.get())
            .invoke(&mut conn)
            .map_err(map_redis_error)?;
        Ok(reply.into())
    }
}

impl StockCounter for RedisStockCounter {
    #[instrument(level = "debug", skip(self), err)]
    fn decrement(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        let quantity = Quantity::new(quantity)?;
        let level = self.run_gated(&self.decrement_script, id, quantity)?;
        log_mutation("decrement", id, quantity.get(), level);
        Ok(level)
    }

    #[instrument(level = "debug", skip(self), err)]
    fn increment(&self, id: StockId, quantity: i64) -> Result<StockLevel, StockCounterError> {
        let quantity = Quantity::new(quantity)?;
        let level = self.run_gated(&self.increment_script, id, quantity)?;
        log_mutation("increment", id, quantity.get(), level);
        Ok(level)
    }

    fn get_stock(&self, id: StockId) -> Result<StockLevel, StockCounterError> {
        let mut conn = self.connection()?;
        let value: Option<i64> = redis::cmd("GET")
            .arg(self.keys.key_for(id))
            .query(&mut conn)
            .map_err(map_redis_error)?;
        Ok(value.into())
    }

    fn get_stocks(&self, ids: &[StockId]) -> Result<HashMap<StockId, StockLevel>, StockCounterError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.keys.key_for(*id)).collect();

        let mut conn = self.connection()?;
        let values: Vec<Option<i64>> = redis::cmd("MGET")
            .arg(&keys)
            .query(&mut conn)
            .map_err(map_redis_error)?;

        if values.len() != ids.len() {
            return Err(StockCounterError::Command(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                ids.len()
            )));
        }

        Ok(ids
            .iter()
            .copied()
            .zip(values.into_iter().map(StockLevel::from))
            .collect())
    }

    #[instrument(level = "debug", skip(self), err)]
    fn initialize(&self, id: StockId, quantity: i64) -> Result<(), StockCounterError> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(self.keys.key_for(id))
            .arg(quantity)
            .arg("PX")
            .arg(self.ttl.as_millis())
            .query::<()>(&mut conn)
            .map_err(map_redis_error)
    }

    #[instrument(level = "debug", skip(self, stocks), fields(count = stocks.len()), err)]
    fn initialize_all(&self, stocks: &HashMap<StockId, i64>) -> Result<(), StockCounterError> {
        if stocks.is_empty() {
            return Ok(());
        }

        let pipe = seed_pipeline(&self.keys, self.ttl, stocks);
        let mut conn = self.connection()?;
        pipe.query::<()>(&mut conn).map_err(map_redis_error)?;

        debug!(count = stocks.len(), "seeded stock counters");
        Ok(())
    }

    fn exists(&self, id: StockId) -> Result<bool, StockCounterError> {
        let mut conn = self.connection()?;
        redis::cmd("EXISTS")
            .arg(self.keys.key_for(id))
            .query(&mut conn)
            .map_err(map_redis_error)
    }

    fn delete(&self, id: StockId) -> Result<(), StockCounterError> {
        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("DEL")
            .arg(self.keys.key_for(id))
            .query(&mut conn)
            .map_err(map_redis_error)?;
        Ok(())
    }
}

/// Plain (non-MULTI) pipeline of `SET key qty PX ttl`, one per entry.
fn seed_pipeline(keys: &CounterKeySpace, ttl: EntryTtl, stocks: &HashMap<StockId, i64>) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    for (id, quantity) in stocks {
        pipe.cmd("SET")
            .arg(keys.key_for(*id))
            .arg(*quantity)
            .arg("PX")
            .arg(ttl.as_millis())
            .ignore();
    }
    pipe
}

fn map_redis_error(e: redis::RedisError) -> StockCounterError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_timeout() || e.is_connection_dropped() {
        StockCounterError::Unavailable(e.to_string())
    } else {
        StockCounterError::Command(e.to_string())
    }
}
