//! An in-memory `RateStore`/`OutboxStore` double.
//!
//! Transactions are modeled by snapshotting the whole state on `begin` and
//! swapping it back in wholesale on `commit`; concurrent writers would
//! clobber each other, which is fine for the single-writer integration
//! tests this crate exists for but would not be for production use.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fxrates_core::{
    CurrencySeries, DomainEvent, ExchangeRate, FxError, FxResult, NewExchangeRate, OutboxEvent,
    OutboxStore, RateStore, SeriesId, UpsertOutcome, WriteTx,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct State {
    next_series_id: SeriesId,
    next_rate_id: i64,
    next_event_id: i64,
    series: Vec<CurrencySeries>,
    rates: Vec<ExchangeRate>,
    events: Vec<OutboxEvent>,
}

/// Shared in-memory backing store for rates, series, and the outbox.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a currency series directly, bypassing `CatalogService`.
    pub async fn seed_series(&self, mut series: CurrencySeries) -> CurrencySeries {
        let mut state = self.state.lock().await;
        if series.id == 0 {
            state.next_series_id += 1;
            series.id = state.next_series_id;
        }
        state.series.push(series.clone());
        series
    }

    pub async fn rate_count(&self) -> usize {
        self.state.lock().await.rates.len()
    }
}

#[async_trait]
impl RateStore for InMemoryStore {
    async fn find_series_by_currency_code(&self, code: &str) -> FxResult<Option<CurrencySeries>> {
        let state = self.state.lock().await;
        Ok(state.series.iter().find(|s| s.currency_code == code).cloned())
    }

    async fn find_enabled_series(&self) -> FxResult<Vec<CurrencySeries>> {
        let state = self.state.lock().await;
        Ok(state.series.iter().filter(|s| s.enabled).cloned().collect())
    }

    async fn find_all_series(&self) -> FxResult<Vec<CurrencySeries>> {
        let state = self.state.lock().await;
        Ok(state.series.clone())
    }

    async fn find_series_by_id(&self, id: SeriesId) -> FxResult<Option<CurrencySeries>> {
        let state = self.state.lock().await;
        Ok(state.series.iter().find(|s| s.id == id).cloned())
    }

    async fn series_exists_by_provider_id(&self, provider_series_id: &str) -> FxResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .series
            .iter()
            .any(|s| s.provider_series_id == provider_series_id))
    }

    async fn find_rate_by_triple(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> FxResult<Option<ExchangeRate>> {
        let state = self.state.lock().await;
        Ok(state
            .rates
            .iter()
            .find(|r| r.base_currency == base && r.target_currency == target && r.date == date)
            .cloned())
    }

    async fn find_latest_rate_for_series(
        &self,
        series_id: SeriesId,
    ) -> FxResult<Option<ExchangeRate>> {
        let state = self.state.lock().await;
        Ok(state
            .rates
            .iter()
            .filter(|r| r.series_id == series_id)
            .max_by_key(|r| r.date)
            .cloned())
    }

    async fn count_rates_for_series(&self, series_id: SeriesId) -> FxResult<i64> {
        let state = self.state.lock().await;
        Ok(state.rates.iter().filter(|r| r.series_id == series_id).count() as i64)
    }

    async fn find_earliest_date_for_target(&self, target: &str) -> FxResult<Option<NaiveDate>> {
        let state = self.state.lock().await;
        Ok(state
            .rates
            .iter()
            .filter(|r| r.target_currency == target)
            .map(|r| r.date)
            .min())
    }

    async fn find_latest_before(
        &self,
        target: &str,
        date: NaiveDate,
    ) -> FxResult<Option<ExchangeRate>> {
        let state = self.state.lock().await;
        Ok(state
            .rates
            .iter()
            .filter(|r| r.target_currency == target && r.date <= date)
            .max_by_key(|r| r.date)
            .cloned())
    }

    async fn find_rates_in_range(
        &self,
        target: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> FxResult<Vec<ExchangeRate>> {
        let state = self.state.lock().await;
        let mut rows: Vec<ExchangeRate> = state
            .rates
            .iter()
            .filter(|r| {
                r.target_currency == target
                    && start.is_none_or(|s| r.date >= s)
                    && end.is_none_or(|e| r.date <= e)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    async fn begin(&self) -> FxResult<Box<dyn WriteTx>> {
        let working = self.state.lock().await.clone();
        Ok(Box::new(InMemoryWriteTx {
            shared: Arc::clone(&self.state),
            working,
            hooks: Vec::new(),
        }))
    }
}

#[async_trait]
impl OutboxStore for InMemoryStore {
    async fn find_pending(&self, limit: i64) -> FxResult<Vec<OutboxEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.is_pending())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_completed(&self, id: i64, at: DateTime<Utc>) -> FxResult<()> {
        let mut state = self.state.lock().await;
        if let Some(event) = state.events.iter_mut().find(|e| e.id == id) {
            event.completion_date = Some(at);
        }
        Ok(())
    }

    async fn delete_completed_older_than(&self, cutoff: DateTime<Utc>) -> FxResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.events.len();
        state
            .events
            .retain(|e| e.completion_date.is_none_or(|c| c >= cutoff));
        Ok((before - state.events.len()) as u64)
    }
}

struct InMemoryWriteTx {
    shared: Arc<Mutex<State>>,
    working: State,
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

#[async_trait]
impl WriteTx for InMemoryWriteTx {
    async fn save_series(&mut self, series: &CurrencySeries) -> FxResult<CurrencySeries> {
        let mut series = series.clone();
        if series.id == 0 {
            self.working.next_series_id += 1;
            series.id = self.working.next_series_id;
            self.working.series.push(series.clone());
        } else if let Some(existing) = self
            .working
            .series
            .iter_mut()
            .find(|s| s.id == series.id)
        {
            *existing = series.clone();
        } else {
            self.working.series.push(series.clone());
        }
        Ok(series)
    }

    async fn set_series_enabled(
        &mut self,
        id: SeriesId,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> FxResult<CurrencySeries> {
        let series = self
            .working
            .series
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| FxError::ResourceNotFound(format!("currency series {id}")))?;
        series.enabled = enabled;
        series.updated_at = at;
        Ok(series.clone())
    }

    async fn bulk_insert_rates(&mut self, rates: &[NewExchangeRate]) -> FxResult<usize> {
        let now = Utc::now();
        for rate in rates {
            self.working.next_rate_id += 1;
            self.working.rates.push(ExchangeRate {
                id: self.working.next_rate_id,
                series_id: rate.series_id,
                base_currency: rate.base_currency.clone(),
                target_currency: rate.target_currency.clone(),
                date: rate.date,
                rate: rate.rate,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(rates.len())
    }

    async fn upsert_rate(&mut self, rate: &NewExchangeRate) -> FxResult<UpsertOutcome> {
        let now = Utc::now();
        if let Some(existing) = self.working.rates.iter_mut().find(|r| {
            r.base_currency == rate.base_currency
                && r.target_currency == rate.target_currency
                && r.date == rate.date
        }) {
            if existing.rate == rate.rate {
                return Ok(UpsertOutcome::SkippedUnchanged);
            }
            existing.rate = rate.rate;
            existing.updated_at = now;
            return Ok(UpsertOutcome::Updated);
        }
        self.working.next_rate_id += 1;
        self.working.rates.push(ExchangeRate {
            id: self.working.next_rate_id,
            series_id: rate.series_id,
            base_currency: rate.base_currency.clone(),
            target_currency: rate.target_currency.clone(),
            date: rate.date,
            rate: rate.rate,
            created_at: now,
            updated_at: now,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn enqueue_event(&mut self, listener_id: &str, event: &DomainEvent) -> FxResult<()> {
        self.working.next_event_id += 1;
        let payload = serde_json::to_value(event)
            .map_err(|e| FxError::Internal(format!("serializing outbox payload: {e}")))?;
        self.working.events.push(OutboxEvent {
            id: self.working.next_event_id,
            listener_id: listener_id.to_string(),
            event_type: event.event_type().to_string(),
            payload,
            publication_date: Utc::now(),
            completion_date: None,
        });
        Ok(())
    }

    fn on_commit(&mut self, hook: Box<dyn FnOnce() + Send>) {
        self.hooks.push(hook);
    }

    async fn commit(self: Box<Self>) -> FxResult<()> {
        let mut shared = self.shared.lock().await;
        *shared = self.working;
        drop(shared);
        for hook in self.hooks {
            hook();
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> FxResult<()> {
        Ok(())
    }
}
