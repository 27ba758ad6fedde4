use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use fxrates_core::{FxResult, LeaseLock};
use tracing::{info, warn};

use crate::cron::CronSchedule;
use crate::import::ImportEngine;

/// Retry policy applied to the scheduled import job itself (distinct from
/// the bounded-retry the broker consumer applies to individual messages):
/// retried up to `max_attempts` times with a fixed `delay` between
/// attempts, then left for the next scheduled fire.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: StdDuration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: StdDuration::from_secs(5),
        }
    }
}

/// Drives the recurring "import latest exchange rates" job under a
/// database-backed lease, so exactly one process instance runs it at a
/// time. A plain "compute next fire instant, sleep, run under lease"
/// loop: no declarative scheduling annotation.
pub struct Scheduler {
    engine: Arc<ImportEngine>,
    lease: Arc<dyn LeaseLock>,
    schedule: CronSchedule,
    lease_name: String,
    hold_at_most: StdDuration,
    hold_at_least: StdDuration,
    retry: RetryConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        engine: Arc<ImportEngine>,
        lease: Arc<dyn LeaseLock>,
        schedule: CronSchedule,
        lease_name: impl Into<String>,
        hold_at_most: StdDuration,
        hold_at_least: StdDuration,
        retry: RetryConfig,
    ) -> Self {
        Self {
            engine,
            lease,
            schedule,
            lease_name: lease_name.into(),
            hold_at_most,
            hold_at_least,
            retry,
        }
    }

    /// Run the zero-row ("missing") import once, unconditionally, without
    /// waiting for a cron fire or acquiring the lease — used at process
    /// startup.
    pub async fn run_startup_import(&self) -> FxResult<()> {
        let outcomes = self.engine.import_missing_exchange_rates().await?;
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            total = outcomes.len(),
            failed, "startup import of missing series complete"
        );
        Ok(())
    }

    /// Acquire the lease and run one import attempt now, with up to
    /// `retry.max_attempts` tries on a retryable error. Returns without
    /// error if the lease is already held elsewhere: that is a normal
    /// "another instance is handling this tick" outcome, not a failure.
    pub async fn fire(&self) {
        let lease = match self
            .lease
            .try_acquire(&self.lease_name, self.hold_at_most, self.hold_at_least)
            .await
        {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                info!(lease = %self.lease_name, "scheduled tick skipped, lease held elsewhere");
                return;
            }
            Err(err) => {
                warn!(lease = %self.lease_name, error = %err, "failed to acquire scheduler lease");
                return;
            }
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.engine.import_latest_exchange_rates().await {
                Ok(outcomes) => {
                    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                    info!(
                        total = outcomes.len(),
                        failed, attempt, "scheduled import complete"
                    );
                    break;
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(attempt, error = %err, "scheduled import attempt failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "scheduled import failed, giving up until next tick");
                    break;
                }
            }
        }

        if let Err(err) = lease.release().await {
            warn!(lease = %self.lease_name, error = %err, "failed to release scheduler lease");
        }
    }

    /// Run forever: compute the next fire instant from the cron schedule,
    /// sleep until then, run [`Self::fire`], repeat.
    pub async fn run_loop(&self) {
        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!("cron schedule produced no upcoming fire instant within one year, stopping");
                return;
            };
            let wait = (next - now)
                .to_std()
                .unwrap_or(StdDuration::from_secs(0));
            tokio::time::sleep(wait).await;
            self.fire().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_core::config::ImportConfig;
    use fxrates_mock::{FakeLeaseLock, FakeProviderAdapter, InMemoryStore};

    mod noop_cache {
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

    #[tokio::test]
    async fn fire_skips_cleanly_when_lease_is_already_held() {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(FakeProviderAdapter::new());
        let engine = Arc::new(ImportEngine::new(
            store,
            provider,
            Arc::new(noop_cache::NoopCache),
            ImportConfig::default(),
        ));
        let lease = Arc::new(FakeLeaseLock::new());
        lease.force_hold("fxrates-import-job").await;
        let scheduler = Scheduler::new(
            engine,
            lease,
            CronSchedule::parse("0 0 23 * * *").unwrap(),
            "fxrates-import-job",
            StdDuration::from_secs(60),
            StdDuration::from_secs(5),
            RetryConfig::default(),
        );

        scheduler.fire().await;
    }
}
