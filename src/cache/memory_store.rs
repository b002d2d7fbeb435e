use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CounterHit, CounterStore};
use crate::error::CacheError;

/// Expired counters are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local counters for single-node deployments and tests.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    counters: Arc<RwLock<HashMap<String, Counter>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sweep_expired(counters: &mut HashMap<String, Counter>, now: Instant) {
    counters.retain(|_, counter| !counter.is_expired(now));
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<CounterHit, CacheError> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        if counters.len() >= SWEEP_THRESHOLD {
            sweep_expired(&mut counters, now);
        }

        let counter = counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + window,
        });
        if counter.is_expired(now) {
            counter.count = 0;
        }
        counter.count += 1;
        // Same semantics as the Redis pipeline: every hit re-arms the expiry
        counter.expires_at = now + window;

        Ok(CounterHit {
            count: counter.count,
            ttl_secs: window.as_secs().max(1),
        })
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
