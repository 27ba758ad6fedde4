use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FxResult;
use crate::model::{CurrencySeries, CurrencyEnabledMessage, DenseRate, DomainEvent, ExchangeRate, OutboxEvent, SeriesId};

/// A raw `(date, value)` pair as the upstream provider emits it, before the
/// adapter filters sentinels and parses decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationsResponse {
    pub observations: Vec<RawObservation>,
}

/// Typed wrapper over the upstream observations endpoint.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_observations(
        &self,
        series_id: &str,
        start_date: Option<NaiveDate>,
    ) -> FxResult<ObservationsResponse>;

    async fn series_exists(&self, series_id: &str) -> FxResult<bool>;
}

/// Transforms provider observations into domain-shaped rate maps.
/// Implementations must reject series resolving to a `USD` target and must
/// fail with `ProviderContractViolation` on duplicate dates rather than
/// silently merging.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn get_exchange_rates(
        &self,
        series: &CurrencySeries,
        start_date: Option<NaiveDate>,
    ) -> FxResult<std::collections::BTreeMap<NaiveDate, rust_decimal::Decimal>>;

    async fn validate_series_exists(&self, provider_series_id: &str) -> FxResult<bool>;
}

/// A new rate row prior to persistence (no id/audit columns yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExchangeRate {
    pub series_id: SeriesId,
    pub base_currency: String,
    pub target_currency: String,
    pub date: NaiveDate,
    pub rate: rust_decimal::Decimal,
}

/// Result of reconciling one observation against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    SkippedUnchanged,
}

/// Read-side repository for the series catalog and rate rows. Reads never
/// need a transaction: the unique `(base, target, date)` index is the sole
/// serialization point for writers.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn find_series_by_currency_code(&self, code: &str) -> FxResult<Option<CurrencySeries>>;
    async fn find_enabled_series(&self) -> FxResult<Vec<CurrencySeries>>;
    async fn find_all_series(&self) -> FxResult<Vec<CurrencySeries>>;
    async fn find_series_by_id(&self, id: SeriesId) -> FxResult<Option<CurrencySeries>>;
    async fn series_exists_by_provider_id(&self, provider_series_id: &str) -> FxResult<bool>;

    async fn find_rate_by_triple(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> FxResult<Option<ExchangeRate>>;
    async fn find_latest_rate_for_series(&self, series_id: SeriesId)
        -> FxResult<Option<ExchangeRate>>;
    async fn count_rates_for_series(&self, series_id: SeriesId) -> FxResult<i64>;
    async fn find_earliest_date_for_target(&self, target: &str) -> FxResult<Option<NaiveDate>>;
    async fn find_latest_before(&self, target: &str, date: NaiveDate)
        -> FxResult<Option<ExchangeRate>>;
    async fn find_rates_in_range(
        &self,
        target: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> FxResult<Vec<ExchangeRate>>;

    /// Open a unit of work spanning series/rate/outbox mutations.
    async fn begin(&self) -> FxResult<Box<dyn WriteTx>>;
}

/// An explicit unit of work: opened by [`RateStore::begin`], committed or
/// rolled back exactly once. After-commit hooks (cache eviction, outbox
/// visibility) run only once `commit` actually succeeds.
#[async_trait]
pub trait WriteTx: Send {
    async fn save_series(&mut self, series: &CurrencySeries) -> FxResult<CurrencySeries>;
    async fn set_series_enabled(&mut self, id: SeriesId, enabled: bool, at: DateTime<Utc>)
        -> FxResult<CurrencySeries>;
    async fn bulk_insert_rates(&mut self, rates: &[NewExchangeRate]) -> FxResult<usize>;
    async fn upsert_rate(&mut self, rate: &NewExchangeRate) -> FxResult<UpsertOutcome>;
    async fn enqueue_event(&mut self, listener_id: &str, event: &DomainEvent) -> FxResult<()>;

    /// Register a callback to run after this unit of work commits.
    fn on_commit(&mut self, hook: Box<dyn FnOnce() + Send>);

    async fn commit(self: Box<Self>) -> FxResult<()>;
    async fn rollback(self: Box<Self>) -> FxResult<()>;
}

/// Scan/complete side of the outbox, used by the background dispatcher.
/// Distinct from [`WriteTx::enqueue_event`], which runs inside the producing
/// business transaction.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn find_pending(&self, limit: i64) -> FxResult<Vec<OutboxEvent>>;
    async fn mark_completed(&self, id: i64, at: DateTime<Utc>) -> FxResult<()>;
    async fn delete_completed_older_than(&self, cutoff: DateTime<Utc>) -> FxResult<u64>;
}

/// A dispatch target for outbox events, keyed by `listener_id` + `event_type`.
/// Consumers must be idempotent: ordering across `(eventType, aggregateId)`
/// pairs is not guaranteed.
#[async_trait]
pub trait EventListener: Send + Sync {
    fn listener_id(&self) -> &'static str;
    async fn handle(&self, event: &DomainEvent) -> FxResult<()>;
}

/// A held, time-bounded lease. Dropping without an explicit
/// [`release`](Lease::release) still attempts a best-effort release in the
/// background, mirroring the stop/abort-on-drop contract this workspace's
/// stream handles use elsewhere in the corpus.
pub struct Lease {
    name: String,
    locked_at: DateTime<Utc>,
    hold_at_least: Duration,
    releaser: Arc<dyn LeaseReleaser>,
    released: bool,
}

impl Lease {
    #[must_use]
    pub fn new(
        name: String,
        locked_at: DateTime<Utc>,
        hold_at_least: Duration,
        releaser: Arc<dyn LeaseReleaser>,
    ) -> Self {
        Self {
            name,
            locked_at,
            hold_at_least,
            releaser,
            released: false,
        }
    }

    /// Release the lease now, clamping `locked_until` to at least
    /// `locked_at + hold_at_least` to prevent rapid re-fires.
    pub async fn release(mut self) -> FxResult<()> {
        self.released = true;
        self.releaser
            .release(&self.name, self.locked_at, self.hold_at_least)
            .await
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let releaser = Arc::clone(&self.releaser);
        let name = self.name.clone();
        let locked_at = self.locked_at;
        let hold_at_least = self.hold_at_least;
        tokio::spawn(async move {
            let _ = releaser.release(&name, locked_at, hold_at_least).await;
        });
    }
}

#[async_trait]
pub trait LeaseReleaser: Send + Sync {
    async fn release(&self, name: &str, locked_at: DateTime<Utc>, hold_at_least: Duration)
        -> FxResult<()>;
}

/// Database-backed named lease used to guarantee single-executor semantics
/// for scheduled tasks.
#[async_trait]
pub trait LeaseLock: Send + Sync {
    async fn try_acquire(
        &self,
        name: &str,
        hold_at_most: Duration,
        hold_at_least: Duration,
    ) -> FxResult<Option<Lease>>;
}

/// Outbound/inbound transport for the "currency enabled/created" topic.
/// Abstracted behind a trait because this workspace carries no concrete
/// broker client dependency; see `fxrates-broker` for the shipped
/// in-process implementation.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &str, message: &CurrencyEnabledMessage) -> FxResult<()>;
}

/// Handler invoked by the broker consumer for each delivered message.
/// Implementations must be idempotent: the broker may redeliver.
#[async_trait]
pub trait BrokerConsumerHandler: Send + Sync {
    async fn handle(&self, message: &CurrencyEnabledMessage) -> FxResult<()>;
}

/// Explicit cache decorator contract: modeled as `lookup`/`store`/
/// `evict_all`, not a declarative annotation.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn lookup(&self, key: &str) -> Option<Vec<DenseRate>>;
    async fn store(&self, key: &str, value: Vec<DenseRate>);
    async fn evict_all(&self);
}

/// The read surface `fxrates-cache::CachingQueryEngine` decorates.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn get_exchange_rates(
        &self,
        target_currency: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> FxResult<Vec<DenseRate>>;
}
