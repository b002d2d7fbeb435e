//! Counting store backing the rate limiter.
//!
//! A [`CounterStore`] increments a key and (re)arms its expiry as one atomic
//! step, so two concurrent requests can never both observe the same
//! pre-increment count.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryCounterStore;
pub use redis_store::RedisCounterStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// Result of one increment-and-expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterHit {
    /// Count after this hit.
    pub count: u64,
    /// Seconds until the counter expires.
    pub ttl_secs: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn hit(&self, key: &str, window: Duration) -> Result<CounterHit, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
