use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fxrates_core::{
    CurrencySeries, DomainEvent, ExchangeRate, FxError, FxResult, NewExchangeRate, RateStore,
    SeriesId, UpsertOutcome, WriteTx,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error_mapping::map_sqlx_err;
use crate::rows::{CurrencySeriesRow, ExchangeRateRow};

/// `RateStore` over a Postgres pool. Reads are plain pooled queries; writes
/// go through [`PgWriteTx`], opened by [`RateStore::begin`].
#[derive(Clone)]
pub struct PgRateStore {
    pub(crate) pool: PgPool,
}

impl PgRateStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn find_series_by_currency_code(&self, code: &str) -> FxResult<Option<CurrencySeries>> {
        let row: Option<CurrencySeriesRow> = sqlx::query_as(
            "SELECT id, currency_code, provider_series_id, enabled, created_at, updated_at
             FROM currency_series WHERE currency_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_series_by_currency_code", e))?;
        Ok(row.map(Into::into))
    }

    async fn find_enabled_series(&self) -> FxResult<Vec<CurrencySeries>> {
        let rows: Vec<CurrencySeriesRow> = sqlx::query_as(
            "SELECT id, currency_code, provider_series_id, enabled, created_at, updated_at
             FROM currency_series WHERE enabled ORDER BY currency_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_enabled_series", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_all_series(&self) -> FxResult<Vec<CurrencySeries>> {
        let rows: Vec<CurrencySeriesRow> = sqlx::query_as(
            "SELECT id, currency_code, provider_series_id, enabled, created_at, updated_at
             FROM currency_series ORDER BY currency_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_all_series", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_series_by_id(&self, id: SeriesId) -> FxResult<Option<CurrencySeries>> {
        let row: Option<CurrencySeriesRow> = sqlx::query_as(
            "SELECT id, currency_code, provider_series_id, enabled, created_at, updated_at
             FROM currency_series WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_series_by_id", e))?;
        Ok(row.map(Into::into))
    }

    async fn series_exists_by_provider_id(&self, provider_series_id: &str) -> FxResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM currency_series WHERE provider_series_id = $1")
                .bind(provider_series_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_err("series_exists_by_provider_id", e))?;
        Ok(row.is_some())
    }

    async fn find_rate_by_triple(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> FxResult<Option<ExchangeRate>> {
        let row: Option<ExchangeRateRow> = sqlx::query_as(
            "SELECT id, series_id, base_currency, target_currency, date, rate, created_at, updated_at
             FROM exchange_rates WHERE base_currency = $1 AND target_currency = $2 AND date = $3",
        )
        .bind(base)
        .bind(target)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_rate_by_triple", e))?;
        Ok(row.map(Into::into))
    }

    async fn find_latest_rate_for_series(
        &self,
        series_id: SeriesId,
    ) -> FxResult<Option<ExchangeRate>> {
        let row: Option<ExchangeRateRow> = sqlx::query_as(
            "SELECT id, series_id, base_currency, target_currency, date, rate, created_at, updated_at
             FROM exchange_rates WHERE series_id = $1 ORDER BY date DESC LIMIT 1",
        )
        .bind(series_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_latest_rate_for_series", e))?;
        Ok(row.map(Into::into))
    }

    async fn count_rates_for_series(&self, series_id: SeriesId) -> FxResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT count(*) FROM exchange_rates WHERE series_id = $1")
                .bind(series_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_err("count_rates_for_series", e))?;
        Ok(row.0)
    }

    async fn find_earliest_date_for_target(&self, target: &str) -> FxResult<Option<NaiveDate>> {
        let row: (Option<NaiveDate>,) =
            sqlx::query_as("SELECT min(date) FROM exchange_rates WHERE target_currency = $1")
                .bind(target)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_err("find_earliest_date_for_target", e))?;
        Ok(row.0)
    }

    async fn find_latest_before(
        &self,
        target: &str,
        date: NaiveDate,
    ) -> FxResult<Option<ExchangeRate>> {
        let row: Option<ExchangeRateRow> = sqlx::query_as(
            "SELECT id, series_id, base_currency, target_currency, date, rate, created_at, updated_at
             FROM exchange_rates WHERE target_currency = $1 AND date <= $2
             ORDER BY date DESC LIMIT 1",
        )
        .bind(target)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_latest_before", e))?;
        Ok(row.map(Into::into))
    }

    async fn find_rates_in_range(
        &self,
        target: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> FxResult<Vec<ExchangeRate>> {
        let rows: Vec<ExchangeRateRow> = sqlx::query_as(
            "SELECT id, series_id, base_currency, target_currency, date, rate, created_at, updated_at
             FROM exchange_rates
             WHERE target_currency = $1
               AND ($2::date IS NULL OR date >= $2)
               AND ($3::date IS NULL OR date <= $3)
             ORDER BY date ASC",
        )
        .bind(target)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("find_rates_in_range", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn begin(&self) -> FxResult<Box<dyn WriteTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_err("begin transaction", e))?;
        Ok(Box::new(PgWriteTx {
            tx: Some(tx),
            hooks: Vec::new(),
        }))
    }
}

pub(crate) struct PgWriteTx {
    tx: Option<Transaction<'static, Postgres>>,
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl PgWriteTx {
    fn tx(&mut self) -> &mut Transaction<'static, Postgres> {
        self.tx.as_mut().expect("PgWriteTx used after commit/rollback")
    }
}

#[async_trait]
impl WriteTx for PgWriteTx {
    async fn save_series(&mut self, series: &CurrencySeries) -> FxResult<CurrencySeries> {
        let row: CurrencySeriesRow = if series.id == 0 {
            sqlx::query_as(
                "INSERT INTO currency_series (currency_code, provider_series_id, enabled, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 RETURNING id, currency_code, provider_series_id, enabled, created_at, updated_at",
            )
            .bind(&series.currency_code)
            .bind(&series.provider_series_id)
            .bind(series.enabled)
            .bind(series.created_at)
            .fetch_one(self.tx())
            .await
        } else {
            sqlx::query_as(
                "UPDATE currency_series
                 SET currency_code = $2, provider_series_id = $3, enabled = $4, updated_at = $5
                 WHERE id = $1
                 RETURNING id, currency_code, provider_series_id, enabled, created_at, updated_at",
            )
            .bind(series.id)
            .bind(&series.currency_code)
            .bind(&series.provider_series_id)
            .bind(series.enabled)
            .bind(series.updated_at)
            .fetch_one(self.tx())
            .await
        }
        .map_err(|e| map_sqlx_err("save_series", e))?;
        Ok(row.into())
    }

    async fn set_series_enabled(
        &mut self,
        id: SeriesId,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> FxResult<CurrencySeries> {
        let row: CurrencySeriesRow = sqlx::query_as(
            "UPDATE currency_series SET enabled = $2, updated_at = $3 WHERE id = $1
             RETURNING id, currency_code, provider_series_id, enabled, created_at, updated_at",
        )
        .bind(id)
        .bind(enabled)
        .bind(at)
        .fetch_optional(self.tx())
        .await
        .map_err(|e| map_sqlx_err("set_series_enabled", e))?
        .ok_or_else(|| FxError::ResourceNotFound(format!("currency series {id}")))?;
        Ok(row.into())
    }

    async fn bulk_insert_rates(&mut self, rates: &[NewExchangeRate]) -> FxResult<usize> {
        let now = Utc::now();
        for rate in rates {
            sqlx::query(
                "INSERT INTO exchange_rates
                    (series_id, base_currency, target_currency, date, rate, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $6)",
            )
            .bind(rate.series_id)
            .bind(&rate.base_currency)
            .bind(&rate.target_currency)
            .bind(rate.date)
            .bind(rate.rate)
            .bind(now)
            .execute(self.tx())
            .await
            .map_err(|e| map_sqlx_err("bulk_insert_rates", e))?;
        }
        Ok(rates.len())
    }

    async fn upsert_rate(&mut self, rate: &NewExchangeRate) -> FxResult<UpsertOutcome> {
        let existing: Option<ExchangeRateRow> = sqlx::query_as(
            "SELECT id, series_id, base_currency, target_currency, date, rate, created_at, updated_at
             FROM exchange_rates
             WHERE base_currency = $1 AND target_currency = $2 AND date = $3
             FOR UPDATE",
        )
        .bind(&rate.base_currency)
        .bind(&rate.target_currency)
        .bind(rate.date)
        .fetch_optional(self.tx())
        .await
        .map_err(|e| map_sqlx_err("upsert_rate (select)", e))?;

        let now = Utc::now();
        match existing {
            None => {
                sqlx::query(
                    "INSERT INTO exchange_rates
                        (series_id, base_currency, target_currency, date, rate, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $6)",
                )
                .bind(rate.series_id)
                .bind(&rate.base_currency)
                .bind(&rate.target_currency)
                .bind(rate.date)
                .bind(rate.rate)
                .bind(now)
                .execute(self.tx())
                .await
                .map_err(|e| map_sqlx_err("upsert_rate (insert)", e))?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(row) if row.rate == rate.rate => Ok(UpsertOutcome::SkippedUnchanged),
            Some(row) => {
                sqlx::query("UPDATE exchange_rates SET rate = $1, updated_at = $2 WHERE id = $3")
                    .bind(rate.rate)
                    .bind(now)
                    .bind(row.id)
                    .execute(self.tx())
                    .await
                    .map_err(|e| map_sqlx_err("upsert_rate (update)", e))?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    async fn enqueue_event(&mut self, listener_id: &str, event: &DomainEvent) -> FxResult<()> {
        let payload = serde_json::to_value(event)
            .map_err(|e| FxError::Internal(format!("serializing outbox payload: {e}")))?;
        sqlx::query(
            "INSERT INTO outbox_events (listener_id, event_type, payload, publication_date)
             VALUES ($1, $2, $3, now())",
        )
        .bind(listener_id)
        .bind(event.event_type())
        .bind(payload)
        .execute(self.tx())
        .await
        .map_err(|e| map_sqlx_err("enqueue_event", e))?;
        Ok(())
    }

    fn on_commit(&mut self, hook: Box<dyn FnOnce() + Send>) {
        self.hooks.push(hook);
    }

    async fn commit(mut self: Box<Self>) -> FxResult<()> {
        let tx = self.tx.take().expect("PgWriteTx used after commit/rollback");
        tx.commit().await.map_err(|e| map_sqlx_err("commit", e))?;
        for hook in self.hooks {
            hook();
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> FxResult<()> {
        let tx = self.tx.take().expect("PgWriteTx used after commit/rollback");
        tx.rollback().await.map_err(|e| map_sqlx_err("rollback", e))
    }
}
