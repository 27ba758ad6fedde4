use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fxrates_core::{dense, ErrorCode, FxError, FxResult, QueryEngine, RateStore};

/// Uncached `QueryEngine`: reads the dense-interpolated rate series directly
/// from the store. `fxrates-cache::CachingQueryEngine` decorates this with
/// the `lookup`/`store` cache pattern; this type has no knowledge of
/// caching at all.
pub struct PlainQueryEngine {
    store: Arc<dyn RateStore>,
}

impl PlainQueryEngine {
    #[must_use]
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryEngine for PlainQueryEngine {
    /// Algorithm:
    /// 1. The target currency must have an enabled series; otherwise
    ///    `CurrencyNotEnabled`.
    /// 2. If both dates are given and `start_date > end_date`, fails
    ///    `InvalidRequest`.
    /// 3. If `start_date` precedes the series' earliest stored date, the
    ///    request fails with `StartDateOutOfRange` rather than silently
    ///    clamping.
    /// 4. Missing calendar days carry forward the most recent prior rate; a
    ///    requested date with no prior rate at all is simply omitted, never
    ///    an error for the whole range.
    /// 5. A range with no stored rates at all (not even before `start_date`)
    ///    fails with `NoExchangeRateDataAvailable`.
    async fn get_exchange_rates(
        &self,
        target_currency: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> FxResult<Vec<fxrates_core::DenseRate>> {
        let series = self
            .store
            .find_series_by_currency_code(target_currency)
            .await?
            .ok_or_else(|| {
                FxError::business(
                    ErrorCode::CurrencyNotEnabled,
                    format!("{target_currency} is not an enabled currency"),
                )
            })?;
        if !series.enabled {
            return Err(FxError::business(
                ErrorCode::CurrencyNotEnabled,
                format!("{target_currency} is not an enabled currency"),
            ));
        }

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(FxError::InvalidRequest(format!(
                    "startDate {start} is after endDate {end}"
                )));
            }
        }

        let earliest = self
            .store
            .find_earliest_date_for_target(target_currency)
            .await?
            .ok_or_else(|| {
                FxError::business(
                    ErrorCode::NoExchangeRateDataAvailable,
                    format!("no exchange rate data available for {target_currency}"),
                )
            })?;

        if let Some(start) = start_date {
            if start < earliest {
                return Err(FxError::start_date_out_of_range(earliest));
            }
        }

        let effective_start = start_date.unwrap_or(earliest);
        let effective_end = end_date.unwrap_or_else(|| Utc::now().date_naive());

        let anchor = self
            .store
            .find_latest_before(target_currency, effective_start)
            .await?;
        let mut rows = self
            .store
            .find_rates_in_range(target_currency, Some(effective_start), Some(effective_end))
            .await?;

        if let Some(anchor_row) = anchor {
            if rows.first().is_none_or(|r| r.date != anchor_row.date) {
                rows.insert(0, anchor_row);
            }
        }

        Ok(dense::build_dense_range(
            target_currency,
            &rows,
            effective_start,
            effective_end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fxrates_core::{CurrencySeries, NewExchangeRate};
    use fxrates_mock::InMemoryStore;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
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
        let mut tx = store.begin().await.unwrap();
        tx.bulk_insert_rates(&[
            NewExchangeRate {
                series_id: series.id,
                base_currency: "USD".to_string(),
                target_currency: "EUR".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                rate: dec!(1.0850),
            },
            NewExchangeRate {
                series_id: series.id,
                base_currency: "USD".to_string(),
                target_currency: "EUR".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                rate: dec!(1.0872),
            },
        ])
        .await
        .unwrap();
        tx.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn carries_forward_across_a_weekend_gap() {
        let store = seeded_store().await;
        let engine = PlainQueryEngine::new(store);

        let rows = engine
            .get_exchange_rates(
                "EUR",
                Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].requested_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(rows[3].published_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(rows[3].rate, dec!(1.0872));
    }

    #[tokio::test]
    async fn start_date_before_earliest_is_rejected() {
        let store = seeded_store().await;
        let engine = PlainQueryEngine::new(store);

        let err = engine
            .get_exchange_rates("EUR", Some(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FxError::BusinessRule { code: ErrorCode::StartDateOutOfRange, .. }));
    }

    #[tokio::test]
    async fn start_date_after_end_date_is_rejected() {
        let store = seeded_store().await;
        let engine = PlainQueryEngine::new(store);

        let err = engine
            .get_exchange_rates(
                "EUR",
                Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
                Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FxError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn disabled_currency_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        store
            .seed_series(CurrencySeries {
                id: 0,
                currency_code: "GBP".to_string(),
                provider_series_id: "DEXUSUK".to_string(),
                enabled: false,
                created_at: now,
                updated_at: now,
            })
            .await;
        let engine = PlainQueryEngine::new(store);

        let err = engine.get_exchange_rates("GBP", None, None).await.unwrap_err();

        assert!(matches!(err, FxError::BusinessRule { code: ErrorCode::CurrencyNotEnabled, .. }));
    }

    #[tokio::test]
    async fn unknown_currency_yields_currency_not_enabled() {
        let store = Arc::new(InMemoryStore::new());
        let engine = PlainQueryEngine::new(store);

        let err = engine.get_exchange_rates("ZZZ", None, None).await.unwrap_err();

        assert!(matches!(err, FxError::BusinessRule { code: ErrorCode::CurrencyNotEnabled, .. }));
    }
}
