use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use fxrates_core::{DomainEvent, EventListener, FxResult, OutboxStore};
use tracing::{error, warn};

/// Polls the outbox for pending events, dispatches each to the
/// [`EventListener`] registered under its `listener_id`, and periodically
/// sweeps completed rows older than a retention window.
///
/// Completion is monotonic: once an event is marked completed it is never
/// redelivered, even if the same row is read again before the `mark_completed`
/// write is visible — `fire` only ever advances state forward.
pub struct OutboxDispatcher {
    store: Arc<dyn OutboxStore>,
    listeners: HashMap<&'static str, Arc<dyn EventListener>>,
    batch_size: i64,
    retention: Duration,
}

impl OutboxDispatcher {
    #[must_use]
    pub fn new(store: Arc<dyn OutboxStore>, batch_size: i64, retention_days: i64) -> Self {
        Self {
            store,
            listeners: HashMap::new(),
            batch_size,
            retention: Duration::days(retention_days),
        }
    }

    /// Register a listener under its own `listener_id`. The outbox dispatch
    /// key is `(listenerId, eventType)`, with `listenerId` supplied by the
    /// listener itself.
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.insert(listener.listener_id(), listener);
    }

    /// One dispatch pass: fetch up to `batch_size` pending events, hand each
    /// to its registered listener, mark it completed on success. A listener
    /// failure is logged and leaves the event pending for the next pass;
    /// dispatch failures never poison the outbox.
    pub async fn fire(&self) -> FxResult<()> {
        let pending = self.store.find_pending(self.batch_size).await?;
        for event in pending {
            let Ok(domain_event) = serde_json::from_value::<DomainEvent>(event.payload.clone())
            else {
                error!(event_id = event.id, "outbox event payload failed to deserialize");
                continue;
            };
            let Some(listener) = self.listeners.get(event.listener_id.as_str()) else {
                warn!(
                    event_id = event.id,
                    listener_id = %event.listener_id,
                    "no listener registered for outbox event, leaving pending"
                );
                continue;
            };
            match listener.handle(&domain_event).await {
                Ok(()) => {
                    self.store.mark_completed(event.id, Utc::now()).await?;
                }
                Err(err) => {
                    warn!(
                        event_id = event.id,
                        listener_id = %event.listener_id,
                        error = %err,
                        "outbox listener dispatch failed, will retry next pass"
                    );
                }
            }
        }
        Ok(())
    }

    /// Delete completed events older than the configured retention window.
    pub async fn sweep_retention(&self) -> FxResult<u64> {
        let cutoff = Utc::now() - self.retention;
        self.store.delete_completed_older_than(cutoff).await
    }

    /// Run forever: dispatch, sweep, sleep, repeat.
    pub async fn run_loop(&self, poll_interval: StdDuration) {
        loop {
            if let Err(err) = self.fire().await {
                error!(error = %err, "outbox dispatch pass failed");
            }
            if let Err(err) = self.sweep_retention().await {
                error!(error = %err, "outbox retention sweep failed");
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fxrates_core::{CurrencyEnabledMessage, WriteTx, CURRENCY_BROKER_LISTENER_ID};
    use fxrates_mock::InMemoryStore;
    use tokio::sync::Mutex as TokioMutex;

    struct RecordingListener {
        received: Arc<TokioMutex<Vec<CurrencyEnabledMessage>>>,
    }

    #[async_trait]
    impl EventListener for RecordingListener {
        fn listener_id(&self) -> &'static str {
            CURRENCY_BROKER_LISTENER_ID
        }

        async fn handle(&self, event: &DomainEvent) -> FxResult<()> {
            self.received.lock().await.push(event.into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatches_a_pending_event_to_its_listener_and_marks_it_completed() {
        let store = Arc::new(InMemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.enqueue_event(
            CURRENCY_BROKER_LISTENER_ID,
            &DomainEvent::CurrencyCreated {
                series_id: 1,
                currency_code: "EUR".to_string(),
                enabled: true,
                correlation_id: "corr-1".to_string(),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let received = Arc::new(TokioMutex::new(Vec::new()));
        let mut dispatcher = OutboxDispatcher::new(store.clone(), 100, 30);
        dispatcher.register(Arc::new(RecordingListener {
            received: Arc::clone(&received),
        }));

        dispatcher.fire().await.unwrap();

        assert_eq!(received.lock().await.len(), 1);
        assert!(store.find_pending(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_with_no_registered_listener_stays_pending() {
        let store = Arc::new(InMemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.enqueue_event(
            "unregistered-listener",
            &DomainEvent::CurrencyCreated {
                series_id: 1,
                currency_code: "EUR".to_string(),
                enabled: true,
                correlation_id: "corr-1".to_string(),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let dispatcher = OutboxDispatcher::new(store.clone(), 100, 30);
        dispatcher.fire().await.unwrap();

        assert_eq!(store.find_pending(100).await.unwrap().len(), 1);
    }
}
