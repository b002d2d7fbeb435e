use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use std::time::Duration;

use super::{CounterHit, CounterStore};
use crate::error::CacheError;

/// Redis-backed counters, shared by every instance of the service.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let store = Self { conn };
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<CounterHit, CacheError> {
        let mut conn = self.conn.clone();
        let window_secs = window.as_secs().max(1) as i64;

        // INCR, EXPIRE and TTL run inside one MULTI/EXEC
        let (count, _, ttl): (u64, bool, i64) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_secs)
            .ttl(key)
            .query_async(&mut conn)
            .await?;

        Ok(CounterHit {
            count,
            ttl_secs: if ttl > 0 { ttl as u64 } else { window_secs as u64 },
        })
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
