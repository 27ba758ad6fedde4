use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fxrates_core::{DenseRate, RateCache};
use moka::future::Cache;
#[cfg(feature = "tracing")]
use tracing::debug;

/// `RateCache` over `moka::future::Cache`, keyed by a precomputed string
/// (target currency + requested range), mirroring this workspace's
/// `MokaStore` convention for other capabilities.
pub struct MokaRateCache {
    cache: Cache<String, Arc<Vec<DenseRate>>>,
}

impl MokaRateCache {
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity.max(1))
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl RateCache for MokaRateCache {
    async fn lookup(&self, key: &str) -> Option<Vec<DenseRate>> {
        let hit = self.cache.get(key).await;
        #[cfg(feature = "tracing")]
        debug!(target = "fxrates::cache", key, hit = hit.is_some(), "lookup");
        hit.map(|rates| (*rates).clone())
    }

    async fn store(&self, key: &str, value: Vec<DenseRate>) {
        self.cache.insert(key.to_string(), Arc::new(value)).await;
    }

    async fn evict_all(&self) {
        self.cache.invalidate_all();
        #[cfg(feature = "tracing")]
        debug!(target = "fxrates::cache", "evict_all");
    }
}
