use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxrates_core::{CurrencySeries, FxError, FxResult, ProviderAdapter, ProviderClient};
use rust_decimal::Decimal;

/// Sentinel the provider emits for a date with no observation (holiday, gap).
const MISSING_VALUE_SENTINEL: &str = ".";

/// Translates raw FRED-shaped observations into a dense `date -> rate` map,
/// enforcing the contract invariants `fxrates_core::ProviderAdapter`
/// documents: no `USD` targets, no duplicate dates.
pub struct FredRateAdapter {
    client: Arc<dyn ProviderClient>,
}

impl FredRateAdapter {
    #[must_use]
    pub const fn new(client: Arc<dyn ProviderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for FredRateAdapter {
    async fn get_exchange_rates(
        &self,
        series: &CurrencySeries,
        start_date: Option<NaiveDate>,
    ) -> FxResult<BTreeMap<NaiveDate, Decimal>> {
        if series.currency_code == "USD" {
            return Err(FxError::ProviderContractViolation(
                "series target currency resolves to USD, the fixed base".to_string(),
            ));
        }

        let response = self
            .client
            .fetch_observations(&series.provider_series_id, start_date)
            .await?;

        let mut rates = BTreeMap::new();
        for obs in response.observations {
            if obs.value.trim().is_empty() || obs.value.trim() == MISSING_VALUE_SENTINEL {
                continue;
            }
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
                FxError::ProviderContractViolation(format!(
                    "observation date {:?} is not ISO-8601: {e}",
                    obs.date
                ))
            })?;
            let value = Decimal::from_str(&obs.value).map_err(|e| {
                FxError::ProviderContractViolation(format!(
                    "observation value {:?} for {date} is not a decimal: {e}",
                    obs.value
                ))
            })?;
            if let Some(previous) = rates.insert(date, value) {
                if previous != value {
                    return Err(FxError::ProviderContractViolation(format!(
                        "duplicate, conflicting observations for {date}: {previous} and {value}"
                    )));
                }
                return Err(FxError::ProviderContractViolation(format!(
                    "duplicate observation for {date}"
                )));
            }
        }

        Ok(rates)
    }

    async fn validate_series_exists(&self, provider_series_id: &str) -> FxResult<bool> {
        self.client.series_exists(provider_series_id).await
    }
}
