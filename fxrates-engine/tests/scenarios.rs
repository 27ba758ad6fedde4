//! End-to-end scenarios exercised against `fxrates-mock`'s in-memory
//! doubles, covering dense queries across gaps, lease contention between
//! two scheduler instances, and outbox survival across a simulated crash.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fxrates_core::config::ImportConfig;
use fxrates_core::{CurrencySeries, DenseRate, DomainEvent, EventListener, FxResult, QueryEngine, RateCache};
use fxrates_engine::{CatalogService, CronSchedule, ImportEngine, OutboxDispatcher, PlainQueryEngine, RetryConfig, Scheduler};
use fxrates_mock::{FakeLeaseLock, FakeProviderAdapter, InMemoryStore};
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

#[derive(Default)]
struct NoopCache;

#[async_trait]
impl RateCache for NoopCache {
    async fn lookup(&self, _key: &str) -> Option<Vec<DenseRate>> {
        None
    }
    async fn store(&self, _key: &str, _value: Vec<DenseRate>) {}
    async fn evict_all(&self) {}
}

async fn seed_thb_series(store: &InMemoryStore) -> CurrencySeries {
    let now = Utc::now();
    store
        .seed_series(CurrencySeries {
            id: 0,
            currency_code: "THB".to_string(),
            provider_series_id: "DEXTHUS".to_string(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })
        .await
}

/// Dense query carries the last known rate forward across a gap,
/// including a holiday in the middle of the week.
#[tokio::test]
async fn range_crossing_a_holiday_carries_the_prior_days_rate_forward() {
    let store = Arc::new(InMemoryStore::new());
    let series = seed_thb_series(&store).await;
    let provider = Arc::new(FakeProviderAdapter::new());
    provider
        .seed(
            &series.provider_series_id,
            [
                (NaiveDate::from_ymd_opt(2024, 1, 13).unwrap(), dec!(35.10)),
                (NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(), dec!(35.20)),
                // 01-15 is the holiday: no observation.
                (NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(), dec!(35.40)),
                (NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(), dec!(35.50)),
            ]
            .into_iter()
            .collect(),
        )
        .await;

    let import_engine = ImportEngine::new(
        store.clone(),
        provider,
        Arc::new(NoopCache),
        ImportConfig::default(),
    );
    import_engine.import_for_series(series.id).await.unwrap();

    let query_engine = PlainQueryEngine::new(store);
    let dense = query_engine
        .get_exchange_rates(
            "THB",
            Some(NaiveDate::from_ymd_opt(2024, 1, 13).unwrap()),
            Some(NaiveDate::from_ymd_opt(2024, 1, 17).unwrap()),
        )
        .await
        .unwrap();

    assert_eq!(dense.len(), 5);
    let jan15 = &dense[2];
    assert_eq!(jan15.requested_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    assert_eq!(jan15.published_date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
    assert_eq!(jan15.rate, dec!(35.20));
}

/// Two scheduler instances fire at the same instant under the same lease
/// name; exactly one performs the import, the other returns without doing
/// any work.
#[tokio::test]
async fn two_schedulers_racing_on_the_same_lease_run_exactly_once() {
    let store = Arc::new(InMemoryStore::new());
    let series = seed_thb_series(&store).await;
    let provider = Arc::new(FakeProviderAdapter::new());
    provider
        .seed(
            &series.provider_series_id,
            [(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(35.0))]
                .into_iter()
                .collect(),
        )
        .await;

    let engine = Arc::new(ImportEngine::new(
        store.clone(),
        provider,
        Arc::new(NoopCache),
        ImportConfig::default(),
    ));
    let lease = Arc::new(FakeLeaseLock::new());

    let scheduler_a = Scheduler::new(
        Arc::clone(&engine),
        Arc::clone(&lease) as Arc<dyn fxrates_core::LeaseLock>,
        CronSchedule::parse("0 0 6 * * *").unwrap(),
        "exchangeRateImport",
        StdDuration::from_secs(600),
        StdDuration::from_secs(5),
        RetryConfig::default(),
    );
    let scheduler_b = Scheduler::new(
        engine,
        lease as Arc<dyn fxrates_core::LeaseLock>,
        CronSchedule::parse("0 0 6 * * *").unwrap(),
        "exchangeRateImport",
        StdDuration::from_secs(600),
        StdDuration::from_secs(5),
        RetryConfig::default(),
    );

    let (_, _) = tokio::join!(scheduler_a.fire(), scheduler_b.fire());

    // Exactly one replica actually imported: the single stored row reflects
    // one run, not two duplicate attempts.
    assert_eq!(store.rate_count().await, 1);
}

/// A `DomainEvent` consumer that simply records what it was asked to
/// handle, standing in for a subscribed broker consumer in scenario 7.
#[derive(Default)]
struct RecordingListener {
    handled: Mutex<Vec<DomainEvent>>,
}

#[async_trait]
impl EventListener for RecordingListener {
    fn listener_id(&self) -> &'static str {
        fxrates_core::CURRENCY_BROKER_LISTENER_ID
    }

    async fn handle(&self, event: &DomainEvent) -> FxResult<()> {
        self.handled.lock().await.push(event.clone());
        Ok(())
    }
}

/// A `CurrencyCreated` event is committed in the same transaction as the
/// catalog row, but the process "crashes" before
/// the broker bridge picks it up. A fresh `OutboxDispatcher` pass (modeling
/// the restarted process) finds the pending row, dispatches it, and the
/// listener's handler runs exactly once with the completion recorded.
#[tokio::test]
async fn outbox_event_survives_a_crash_between_commit_and_dispatch() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(FakeProviderAdapter::new());
    provider
        .seed(
            "DEXJPUS",
            [(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(144.0))]
                .into_iter()
                .collect(),
        )
        .await;
    let catalog = CatalogService::new(store.clone(), provider.clone());

    let created = catalog
        .create("JPY", "DEXJPUS", true, &fxrates_core::AuditContext::system(Utc::now()))
        .await
        .unwrap();

    // The process "crashes" here: the row and its outbox event are durably
    // committed, but nothing has dispatched the event to the broker yet.

    let mut dispatcher = OutboxDispatcher::new(store.clone(), 10, 30);
    let listener = Arc::new(RecordingListener::default());
    dispatcher.register(listener.clone());
    dispatcher.fire().await.unwrap();

    let handled = listener.handled.lock().await;
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].currency_code(), "JPY");
    drop(handled);

    // Once dispatched, the outbox row is marked completed and a second pass
    // over the store is a no-op.
    dispatcher.fire().await.unwrap();
    assert_eq!(listener.handled.lock().await.len(), 1);

    let import_engine = ImportEngine::new(
        store,
        provider,
        Arc::new(NoopCache),
        ImportConfig::default(),
    );
    let result = import_engine.import_for_series(created.id).await.unwrap();
    assert_eq!(result.new_count, 1);
}
