use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxrates_core::{DenseRate, FxResult, QueryEngine, RateCache};
#[cfg(feature = "tracing")]
use tracing::debug;

/// Cache key is target currency + requested range only: base currency is
/// always `USD`, so including it would only fragment the cache.
fn cache_key(target_currency: &str, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> String {
    format!(
        "{target_currency}:{}:{}",
        start_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
        end_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
    )
}

/// Explicit decorator around a `QueryEngine`: `lookup`/`store`/`evict_all`
/// rather than a declarative cache annotation.
pub struct CachingQueryEngine {
    inner: Arc<dyn QueryEngine>,
    cache: Arc<dyn RateCache>,
}

impl CachingQueryEngine {
    #[must_use]
    pub const fn new(inner: Arc<dyn QueryEngine>, cache: Arc<dyn RateCache>) -> Self {
        Self { inner, cache }
    }

    /// Evict every cached query result. Call after any write that can
    /// change a target currency's rate history (import, upsert).
    pub async fn evict_all(&self) {
        self.cache.evict_all().await;
    }
}

#[async_trait]
impl QueryEngine for CachingQueryEngine {
    async fn get_exchange_rates(
        &self,
        target_currency: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> FxResult<Vec<DenseRate>> {
        let key = cache_key(target_currency, start_date, end_date);
        if let Some(hit) = self.cache.lookup(&key).await {
            #[cfg(feature = "tracing")]
            debug!(target = "fxrates::cache", key, "query hit");
            return Ok(hit);
        }

        let rows = self
            .inner
            .get_exchange_rates(target_currency, start_date, end_date)
            .await?;
        self.cache.store(&key, rows.clone()).await;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_core::FxResult as Result_;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryEngine for CountingEngine {
        async fn get_exchange_rates(
            &self,
            target_currency: &str,
            _start_date: Option<NaiveDate>,
            _end_date: Option<NaiveDate>,
        ) -> Result_<Vec<DenseRate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DenseRate {
                base_currency: "USD".to_string(),
                target_currency: target_currency.to_string(),
                requested_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                rate: rust_decimal::Decimal::ONE,
                published_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            }])
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let inner = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(crate::moka_cache::MokaRateCache::new(
            16,
            std::time::Duration::from_secs(60),
        ));
        let engine = CachingQueryEngine::new(inner.clone(), cache);

        engine.get_exchange_rates("EUR", None, None).await.unwrap();
        engine.get_exchange_rates("EUR", None, None).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evict_all_forces_reload() {
        let inner = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(crate::moka_cache::MokaRateCache::new(
            16,
            std::time::Duration::from_secs(60),
        ));
        let engine = CachingQueryEngine::new(inner.clone(), cache);

        engine.get_exchange_rates("EUR", None, None).await.unwrap();
        engine.evict_all().await;
        engine.get_exchange_rates("EUR", None, None).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
