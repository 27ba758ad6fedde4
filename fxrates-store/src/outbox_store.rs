use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxrates_core::{FxResult, OutboxEvent, OutboxStore};

use crate::error_mapping::map_sqlx_err;
use crate::rate_store::PgRateStore;
use crate::rows::OutboxEventRow;

#[async_trait]
impl OutboxStore for PgRateStore {
    async fn find_pending(&self, limit: i64) -> FxResult<Vec<OutboxEvent>> {
        let rows: Vec<OutboxEventRow> = sqlx::query_as(
            "SELECT id, listener_id, event_type, payload, publication_date, completion_date
             FROM outbox_events
             WHERE completion_date IS NULL
             ORDER BY publication_date ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_pending", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_completed(&self, id: i64, at: DateTime<Utc>) -> FxResult<()> {
        sqlx::query("UPDATE outbox_events SET completion_date = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("mark_completed", e))?;
        Ok(())
    }

    async fn delete_completed_older_than(&self, cutoff: DateTime<Utc>) -> FxResult<u64> {
        let result = sqlx::query("DELETE FROM outbox_events WHERE completion_date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("delete_completed_older_than", e))?;
        Ok(result.rows_affected())
    }
}
