use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxrates_core::{CurrencySeries, FxError, FxResult, ProviderAdapter};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// A provider series id that always resolves to [`FxError::ProviderUnavailable`].
pub const FAIL_SERIES_ID: &str = "FAIL";
/// A provider series id `validate_series_exists` always reports as absent.
pub const MISSING_SERIES_ID: &str = "MISSING";

#[derive(Debug, Default)]
struct State {
    fixtures: BTreeMap<String, BTreeMap<NaiveDate, Decimal>>,
}

/// Deterministic, fixture-backed [`ProviderAdapter`] for tests.
#[derive(Debug, Clone, Default)]
pub struct FakeProviderAdapter {
    state: Arc<Mutex<State>>,
}

impl FakeProviderAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, provider_series_id: &str, rates: BTreeMap<NaiveDate, Decimal>) {
        self.state
            .lock()
            .await
            .fixtures
            .insert(provider_series_id.to_string(), rates);
    }
}

#[async_trait]
impl ProviderAdapter for FakeProviderAdapter {
    async fn get_exchange_rates(
        &self,
        series: &CurrencySeries,
        start_date: Option<NaiveDate>,
    ) -> FxResult<BTreeMap<NaiveDate, Decimal>> {
        if series.provider_series_id == FAIL_SERIES_ID {
            return Err(FxError::ProviderUnavailable(
                "forced failure for testing".to_string(),
            ));
        }
        let state = self.state.lock().await;
        let all = state
            .fixtures
            .get(&series.provider_series_id)
            .cloned()
            .unwrap_or_default();
        Ok(match start_date {
            Some(start) => all.into_iter().filter(|(d, _)| *d >= start).collect(),
            None => all,
        })
    }

    async fn validate_series_exists(&self, provider_series_id: &str) -> FxResult<bool> {
        if provider_series_id == MISSING_SERIES_ID {
            return Ok(false);
        }
        if provider_series_id == FAIL_SERIES_ID {
            return Err(FxError::ProviderUnavailable(
                "forced failure for testing".to_string(),
            ));
        }
        Ok(true)
    }
}
