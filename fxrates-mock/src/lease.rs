use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxrates_core::{FxResult, Lease, LeaseLock, LeaseReleaser};
use tokio::sync::Mutex;

/// In-memory lease table, enforcing the same single-holder-per-name
/// semantics as the Postgres-backed implementation, without persistence.
#[derive(Debug, Clone, Default)]
pub struct FakeLeaseLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl FakeLeaseLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_held(&self, name: &str) -> bool {
        self.held.lock().await.contains(name)
    }

    /// Mark `name` as held without returning a releasable [`Lease`], so
    /// tests can simulate lease contention from another process instance.
    pub async fn force_hold(&self, name: &str) {
        self.held.lock().await.insert(name.to_string());
    }
}

#[async_trait]
impl LeaseLock for FakeLeaseLock {
    async fn try_acquire(
        &self,
        name: &str,
        _hold_at_most: Duration,
        hold_at_least: Duration,
    ) -> FxResult<Option<Lease>> {
        let mut held = self.held.lock().await;
        if !held.insert(name.to_string()) {
            return Ok(None);
        }
        Ok(Some(Lease::new(
            name.to_string(),
            Utc::now(),
            hold_at_least,
            Arc::new(FakeReleaser {
                held: Arc::clone(&self.held),
            }),
        )))
    }
}

struct FakeReleaser {
    held: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl LeaseReleaser for FakeReleaser {
    async fn release(
        &self,
        name: &str,
        _locked_at: DateTime<Utc>,
        _hold_at_least: Duration,
    ) -> FxResult<()> {
        self.held.lock().await.remove(name);
        Ok(())
    }
}
