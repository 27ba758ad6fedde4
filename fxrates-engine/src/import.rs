use std::sync::Arc;

use chrono::Utc;
use fxrates_core::config::ImportConfig;
use fxrates_core::{
    sanity, CurrencySeries, ErrorCode, FxError, FxResult, NewExchangeRate, ProviderAdapter,
    RateCache, RateStore, SeriesId, UpsertOutcome,
};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one series' import attempt, reported independently of every
/// other series in the same bulk run: a per-series failure never aborts
/// the whole run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SeriesImportOutcome {
    Completed(fxrates_core::ImportResult),
    Failed {
        currency_code: String,
        provider_series_id: String,
        error: String,
    },
}

impl SeriesImportOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Orchestrates fetch -> transform -> reconcile for one or many currency
/// series. Holds only trait objects: never references a concrete
/// provider, store, or cache implementation.
pub struct ImportEngine {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn ProviderAdapter>,
    cache: Arc<dyn RateCache>,
    config: ImportConfig,
}

impl ImportEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn RateStore>,
        provider: Arc<dyn ProviderAdapter>,
        cache: Arc<dyn RateCache>,
        config: ImportConfig,
    ) -> Self {
        Self {
            store,
            provider,
            cache,
            config,
        }
    }

    /// For every enabled series with zero stored rates, perform a full
    /// import. Series that already have at least one rate are left
    /// untouched.
    pub async fn import_missing_exchange_rates(&self) -> FxResult<Vec<SeriesImportOutcome>> {
        let all = self.store.find_enabled_series().await?;
        let mut outcomes = Vec::with_capacity(all.len());
        for series in all {
            let count = self.store.count_rates_for_series(series.id).await?;
            if count > 0 {
                continue;
            }
            outcomes.push(self.import_one_as_outcome(&series).await);
        }
        Ok(outcomes)
    }

    /// For every enabled series, perform an incremental import.
    pub async fn import_latest_exchange_rates(&self) -> FxResult<Vec<SeriesImportOutcome>> {
        let all = self.store.find_enabled_series().await?;
        let mut outcomes = Vec::with_capacity(all.len());
        for series in all {
            outcomes.push(self.import_one_as_outcome(&series).await);
        }
        Ok(outcomes)
    }

    /// Single-series flow used by the broker consumer and the admin API.
    /// Unlike the bulk entry points, failures propagate to the caller: the
    /// broker consumer relies on that to drive its retry/DLQ policy.
    pub async fn import_for_series(&self, series_id: SeriesId) -> FxResult<fxrates_core::ImportResult> {
        let series = self
            .store
            .find_series_by_id(series_id)
            .await?
            .ok_or_else(|| FxError::ResourceNotFound(format!("currency series {series_id}")))?;
        self.import_one(&series).await
    }

    async fn import_one_as_outcome(&self, series: &CurrencySeries) -> SeriesImportOutcome {
        match self.import_one(series).await {
            Ok(result) => SeriesImportOutcome::Completed(result),
            Err(err) => {
                warn!(
                    currency_code = %series.currency_code,
                    provider_series_id = %series.provider_series_id,
                    error = %err,
                    "series import failed"
                );
                SeriesImportOutcome::Failed {
                    currency_code: series.currency_code.clone(),
                    provider_series_id: series.provider_series_id.clone(),
                    error: err.to_string(),
                }
            }
        }
    }

    /// Determine start date, fetch, sanity check, reconcile, evict the
    /// cache after commit.
    async fn import_one(&self, series: &CurrencySeries) -> FxResult<fxrates_core::ImportResult> {
        let latest = self.store.find_latest_rate_for_series(series.id).await?;
        let is_initial = latest.is_none();
        let start_date = latest.map(|r| {
            r.date
                .succ_opt()
                .expect("NaiveDate::succ_opt overflow at chrono::NaiveDate::MAX")
        });

        let observations = self.provider.get_exchange_rates(series, start_date).await?;

        if let Some(start) = start_date {
            let estimated_bytes = sanity::estimate_payload_bytes(&observations);
            let end = observations.keys().max().copied().unwrap_or(start).max(start);
            let days_since_start = (end - start).num_days();
            sanity::check_payload_size(
                estimated_bytes,
                days_since_start,
                self.config.sanity_absolute_cap_bytes,
                self.config.sanity_expected_bytes_per_day,
                self.config.sanity_tolerance,
            )?;
        }

        let mut tx = self.store.begin().await?;
        let mut new_count = 0usize;
        let mut updated_count = 0usize;
        let mut skipped_count = 0usize;

        if is_initial {
            let rows: Vec<NewExchangeRate> = observations
                .iter()
                .map(|(date, rate)| NewExchangeRate {
                    series_id: series.id,
                    base_currency: "USD".to_string(),
                    target_currency: series.currency_code.clone(),
                    date: *date,
                    rate: *rate,
                })
                .collect();
            new_count = tx.bulk_insert_rates(&rows).await?;
        } else {
            for (date, rate) in &observations {
                let new_rate = NewExchangeRate {
                    series_id: series.id,
                    base_currency: "USD".to_string(),
                    target_currency: series.currency_code.clone(),
                    date: *date,
                    rate: *rate,
                };
                match tx.upsert_rate(&new_rate).await? {
                    UpsertOutcome::Inserted => new_count += 1,
                    UpsertOutcome::Updated => {
                        updated_count += 1;
                        warn!(
                            currency_code = %series.currency_code,
                            date = %date,
                            rate = %rate,
                            "provider restated a previously stored rate"
                        );
                    }
                    UpsertOutcome::SkippedUnchanged => skipped_count += 1,
                }
            }
        }

        let earliest_date = observations.keys().next().copied();
        let latest_date = observations.keys().next_back().copied();
        let completed_at = Utc::now();

        let cache = Arc::clone(&self.cache);
        tx.on_commit(Box::new(move || {
            tokio::spawn(async move {
                cache.evict_all().await;
            });
        }));
        tx.commit().await?;

        info!(
            currency_code = %series.currency_code,
            new_count,
            updated_count,
            skipped_count,
            "series import complete"
        );

        Ok(fxrates_core::ImportResult {
            currency_code: series.currency_code.clone(),
            provider_series_id: series.provider_series_id.clone(),
            new_count,
            updated_count,
            skipped_count,
            earliest_date,
            latest_date,
            completed_at,
        })
    }
}

/// Helper used by `CatalogService`/`ImportEngine` callers that need to
/// surface a business-rule error code alongside a message; re-exported here
/// so callers don't need a second import from `fxrates-core`.
#[must_use]
pub fn business(code: ErrorCode, message: impl Into<String>) -> FxError {
    FxError::business(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fxrates_cache_stub::NoopCache;
    use fxrates_core::CurrencySeries;
    use fxrates_mock::{FakeProviderAdapter, InMemoryStore, FAIL_SERIES_ID};
    use rust_decimal_macros::dec;

    mod fxrates_cache_stub {
        use async_trait::async_trait;
        use fxrates_core::{DenseRate, RateCache};

        #[derive(Default)]
        pub struct NoopCache;

        #[async_trait]
        impl RateCache for NoopCache {
            async fn lookup(&self, _key: &str) -> Option<Vec<DenseRate>> {
                None
            }
            async fn store(&self, _key: &str, _value: Vec<DenseRate>) {}
            async fn evict_all(&self) {}
        }
    }

    async fn seed_engine() -> (Arc<InMemoryStore>, Arc<FakeProviderAdapter>, ImportEngine, CurrencySeries) {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(FakeProviderAdapter::new());
        let now = Utc::now();
        let series = store
            .seed_series(CurrencySeries {
                id: 0,
                currency_code: "EUR".to_string(),
                provider_series_id: "DEXUSEU".to_string(),
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await;
        let engine = ImportEngine::new(
            store.clone(),
            provider.clone(),
            Arc::new(NoopCache),
            ImportConfig::default(),
        );
        (store, provider, engine, series)
    }

    #[tokio::test]
    async fn fresh_install_import_bulk_inserts_all_observations() {
        let (store, provider, engine, series) = seed_engine().await;
        provider
            .seed(
                &series.provider_series_id,
                [
                    (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(1.0850)),
                    (NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), dec!(1.0872)),
                    (NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), dec!(1.0823)),
                ]
                .into_iter()
                .collect(),
            )
            .await;

        let result = engine.import_for_series(series.id).await.unwrap();

        assert_eq!(result.new_count, 3);
        assert_eq!(result.updated_count, 0);
        assert_eq!(result.skipped_count, 0);
        assert_eq!(result.earliest_date, Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert_eq!(result.latest_date, Some(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
        assert_eq!(store.rate_count().await, 3);
    }

    #[tokio::test]
    async fn import_is_idempotent_on_immediate_replay() {
        let (_, provider, engine, series) = seed_engine().await;
        provider
            .seed(
                &series.provider_series_id,
                [(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(1.0850))]
                    .into_iter()
                    .collect(),
            )
            .await;

        engine.import_for_series(series.id).await.unwrap();
        let second = engine.import_for_series(series.id).await.unwrap();

        assert_eq!(second.new_count, 0);
        assert_eq!(second.updated_count, 0);
        assert_eq!(second.skipped_count, 1);
    }

    #[tokio::test]
    async fn restated_value_updates_in_place() {
        let (store, provider, engine, series) = seed_engine().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        provider
            .seed(&series.provider_series_id, [(date, dec!(1.0850))].into_iter().collect())
            .await;
        engine.import_for_series(series.id).await.unwrap();

        provider
            .seed(&series.provider_series_id, [(date, dec!(1.0860))].into_iter().collect())
            .await;
        let result = engine.import_for_series(series.id).await.unwrap();

        assert_eq!(result.updated_count, 1);
        let stored = store
            .find_rate_by_triple("USD", "EUR", date)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rate, dec!(1.0860));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_for_single_series_import() {
        let (store, _, _, _) = seed_engine().await;
        let failing_series = store
            .seed_series(CurrencySeries {
                id: 0,
                currency_code: "JPY".to_string(),
                provider_series_id: FAIL_SERIES_ID.to_string(),
                enabled: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;
        let provider = Arc::new(FakeProviderAdapter::new());
        let engine = ImportEngine::new(
            store,
            provider,
            Arc::new(NoopCache),
            ImportConfig::default(),
        );

        let err = engine.import_for_series(failing_series.id).await.unwrap_err();
        assert!(matches!(err, FxError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn bulk_import_reports_per_series_failures_without_aborting() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let eur = store
            .seed_series(CurrencySeries {
                id: 0,
                currency_code: "EUR".to_string(),
                provider_series_id: "DEXUSEU".to_string(),
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await;
        store
            .seed_series(CurrencySeries {
                id: 0,
                currency_code: "JPY".to_string(),
                provider_series_id: FAIL_SERIES_ID.to_string(),
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await;
        let provider = Arc::new(FakeProviderAdapter::new());
        provider
            .seed(
                &eur.provider_series_id,
                [(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(1.0850))]
                    .into_iter()
                    .collect(),
            )
            .await;
        let engine = ImportEngine::new(
            store,
            provider,
            Arc::new(NoopCache),
            ImportConfig::default(),
        );

        let outcomes = engine.import_missing_exchange_rates().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| !o.is_success()).count(), 1);
    }
}
