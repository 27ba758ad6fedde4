use std::sync::Arc;

use chrono::Utc;
use fxrates_core::{
    iso4217, AuditContext, CurrencySeries, DomainEvent, ErrorCode, FxError, FxResult,
    ProviderAdapter, RateStore, SeriesId, CURRENCY_BROKER_LISTENER_ID,
};
use uuid::Uuid;

/// Administers the currency-series catalog: creation, enable/disable, and
/// lookups backing the admin API.
pub struct CatalogService {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn ProviderAdapter>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn RateStore>, provider: Arc<dyn ProviderAdapter>) -> Self {
        Self { store, provider }
    }

    /// Create a new currency series.
    ///
    /// Validates, in order: ISO 4217 shape and not-USD, uniqueness of
    /// `currency_code`, uniqueness of `provider_series_id`, and that the
    /// provider actually recognizes `provider_series_id`. Enqueues a
    /// `CurrencyCreated` event in the same transaction as the insert.
    pub async fn create(
        &self,
        currency_code: &str,
        provider_series_id: &str,
        enabled: bool,
        audit: &AuditContext,
    ) -> FxResult<CurrencySeries> {
        iso4217::validate_currency_code(currency_code)?;

        if self
            .store
            .find_series_by_currency_code(currency_code)
            .await?
            .is_some()
        {
            return Err(FxError::business(
                ErrorCode::DuplicateCurrencyCode,
                format!("currency code {currency_code} is already registered"),
            ));
        }
        if self
            .store
            .series_exists_by_provider_id(provider_series_id)
            .await?
        {
            return Err(FxError::business(
                ErrorCode::InvalidProviderSeriesId,
                format!("provider series id {provider_series_id} is already registered"),
            ));
        }
        if !self.provider.validate_series_exists(provider_series_id).await? {
            return Err(FxError::business(
                ErrorCode::InvalidProviderSeriesId,
                format!("provider series id {provider_series_id} does not exist upstream"),
            ));
        }

        let mut tx = self.store.begin().await?;
        let saved = tx
            .save_series(&CurrencySeries {
                id: 0,
                currency_code: currency_code.to_string(),
                provider_series_id: provider_series_id.to_string(),
                enabled,
                created_at: audit.at,
                updated_at: audit.at,
            })
            .await?;

        let event = DomainEvent::CurrencyCreated {
            series_id: saved.id,
            currency_code: saved.currency_code.clone(),
            enabled: saved.enabled,
            correlation_id: Uuid::new_v4().to_string(),
        };
        tx.enqueue_event(CURRENCY_BROKER_LISTENER_ID, &event).await?;
        tx.commit().await?;

        Ok(saved)
    }

    /// Toggle a series' `enabled` flag (`PUT /v1/admin/currencies/{id}`).
    /// Only enqueues `CurrencyUpdated` when `enabled` actually transitions;
    /// a no-op toggle (e.g. `PUT enabled=true` on an already-enabled series)
    /// leaves the outbox untouched. The broker bridge only forwards the
    /// event to the wire when the new state is `enabled`.
    pub async fn update(
        &self,
        id: SeriesId,
        enabled: bool,
        audit: &AuditContext,
    ) -> FxResult<CurrencySeries> {
        let before = self
            .store
            .find_series_by_id(id)
            .await?
            .ok_or_else(|| FxError::ResourceNotFound(format!("currency series {id}")))?;

        let mut tx = self.store.begin().await?;
        let saved = tx.set_series_enabled(id, enabled, audit.at).await?;

        if before.enabled != saved.enabled {
            let event = DomainEvent::CurrencyUpdated {
                series_id: saved.id,
                currency_code: saved.currency_code.clone(),
                enabled: saved.enabled,
                correlation_id: Uuid::new_v4().to_string(),
            };
            tx.enqueue_event(CURRENCY_BROKER_LISTENER_ID, &event).await?;
        }
        tx.commit().await?;

        Ok(saved)
    }

    pub async fn get_by_id(&self, id: SeriesId) -> FxResult<CurrencySeries> {
        self.store
            .find_series_by_id(id)
            .await?
            .ok_or_else(|| FxError::ResourceNotFound(format!("currency series {id}")))
    }

    pub async fn get_all(&self, enabled_only: bool) -> FxResult<Vec<CurrencySeries>> {
        if enabled_only {
            self.store.find_enabled_series().await
        } else {
            self.store.find_all_series().await
        }
    }
}
