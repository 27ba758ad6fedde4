use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxrates_core::{FxError, FxResult, ObservationsResponse, ProviderClient, RawObservation};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct ObservationsEnvelope {
    observations: Vec<RawObservationDto>,
}

#[derive(Debug, Deserialize)]
struct RawObservationDto {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SeriesEnvelope {
    #[serde(default)]
    seriess: Vec<serde_json::Value>,
}

/// HTTP client for a FRED-style `fred/series/observations` endpoint.
///
/// Only the wire shape is handled here; sentinel filtering, decimal parsing,
/// and duplicate-date detection are the adapter's job
/// (`fxrates_core::ProviderAdapter`).
#[derive(Debug, Clone)]
pub struct FredClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl FredClient {
    #[must_use]
    pub fn new(base_url: Url, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url,
            api_key,
            http: reqwest::Client::new(),
            timeout,
        }
    }

    fn observations_url(&self, series_id: &str, start_date: Option<NaiveDate>) -> FxResult<Url> {
        let mut url = self
            .base_url
            .join("fred/series/observations")
            .map_err(|e| FxError::Internal(format!("building observations URL: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("series_id", series_id);
            q.append_pair("api_key", &self.api_key);
            q.append_pair("file_type", "json");
            if let Some(start) = start_date {
                q.append_pair("observation_start", &start.format("%Y-%m-%d").to_string());
            }
        }
        Ok(url)
    }

    fn series_url(&self, series_id: &str) -> FxResult<Url> {
        let mut url = self
            .base_url
            .join("fred/series")
            .map_err(|e| FxError::Internal(format!("building series URL: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("series_id", series_id);
            q.append_pair("api_key", &self.api_key);
            q.append_pair("file_type", "json");
        }
        Ok(url)
    }

    async fn send(&self, url: Url) -> FxResult<reqwest::Response> {
        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| FxError::ProviderUnavailable("request timed out".to_string()))?
            .map_err(|e| FxError::ProviderUnavailable(format!("request failed: {e}")))?;
        Ok(response)
    }
}

#[async_trait]
impl ProviderClient for FredClient {
    async fn fetch_observations(
        &self,
        series_id: &str,
        start_date: Option<NaiveDate>,
    ) -> FxResult<ObservationsResponse> {
        let url = self.observations_url(series_id, start_date)?;
        let response = self.send(url).await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(FxError::ProviderUnavailable(format!(
                "observations endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(FxError::ProviderRejected(format!(
                "observations endpoint returned {status}"
            )));
        }
        let envelope: ObservationsEnvelope = response
            .json()
            .await
            .map_err(|e| FxError::ProviderContractViolation(format!("decoding observations: {e}")))?;

        Ok(ObservationsResponse {
            observations: envelope
                .observations
                .into_iter()
                .map(|o| RawObservation {
                    date: o.date,
                    value: o.value,
                })
                .collect(),
        })
    }

    async fn series_exists(&self, series_id: &str) -> FxResult<bool> {
        let url = self.series_url(series_id)?;
        let response = self.send(url).await?;
        let status = response.status();
        if status.as_u16() == 404 || status.as_u16() == 400 {
            return Ok(false);
        }
        if status.is_server_error() {
            return Err(FxError::ProviderUnavailable(format!(
                "series endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(FxError::ProviderRejected(format!(
                "series endpoint returned {status}"
            )));
        }
        let envelope: SeriesEnvelope = response
            .json()
            .await
            .map_err(|e| FxError::ProviderContractViolation(format!("decoding series: {e}")))?;
        Ok(!envelope.seriess.is_empty())
    }
}
