use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxrates_core::{FxResult, Lease, LeaseLock, LeaseReleaser};
use sqlx::PgPool;

use crate::error_mapping::map_sqlx_err;

/// Row-based lease over `scheduler_locks`, the "ShedLock" pattern: a plain
/// `INSERT ... ON CONFLICT DO UPDATE ... WHERE <expired>` makes acquisition
/// atomic without `pg_advisory_lock`, whose session-scoped lifetime doesn't
/// suit a lease that must be inspectable and releasable from any process.
#[derive(Clone)]
pub struct PgLeaseLock {
    pool: PgPool,
    process_id: String,
}

impl PgLeaseLock {
    /// `process_id` defaults to the OS process id; pass `with_process_id`
    /// to set an explicit identifier (e.g. a pod name) instead.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            process_id: format!("pid-{}", std::process::id()),
        }
    }

    #[must_use]
    pub fn with_process_id(pool: PgPool, process_id: impl Into<String>) -> Self {
        Self {
            pool,
            process_id: process_id.into(),
        }
    }
}

#[async_trait]
impl LeaseLock for PgLeaseLock {
    async fn try_acquire(
        &self,
        name: &str,
        hold_at_most: Duration,
        hold_at_least: Duration,
    ) -> FxResult<Option<Lease>> {
        let now = Utc::now();
        let locked_until = now
            + chrono::Duration::from_std(hold_at_most)
                .unwrap_or_else(|_| chrono::Duration::zero());

        let result = sqlx::query(
            "INSERT INTO scheduler_locks (name, locked_at, locked_until, locked_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name) DO UPDATE
               SET locked_at = EXCLUDED.locked_at,
                   locked_until = EXCLUDED.locked_until,
                   locked_by = EXCLUDED.locked_by
             WHERE scheduler_locks.locked_until < EXCLUDED.locked_at",
        )
        .bind(name)
        .bind(now)
        .bind(locked_until)
        .bind(&self.process_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("try_acquire lease", e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Lease::new(
            name.to_string(),
            now,
            hold_at_least,
            Arc::new(PgLeaseReleaser {
                pool: self.pool.clone(),
            }),
        )))
    }
}

struct PgLeaseReleaser {
    pool: PgPool,
}

#[async_trait]
impl LeaseReleaser for PgLeaseReleaser {
    async fn release(
        &self,
        name: &str,
        locked_at: DateTime<Utc>,
        hold_at_least: Duration,
    ) -> FxResult<()> {
        let earliest_next = locked_at
            + chrono::Duration::from_std(hold_at_least)
                .unwrap_or_else(|_| chrono::Duration::zero());
        let locked_until = Utc::now().max(earliest_next);
        sqlx::query("UPDATE scheduler_locks SET locked_until = $1 WHERE name = $2")
            .bind(locked_until)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("release lease", e))?;
        Ok(())
    }
}
