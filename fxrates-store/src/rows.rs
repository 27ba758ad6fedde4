use chrono::{DateTime, NaiveDate, Utc};
use fxrates_core::{CurrencySeries, ExchangeRate, OutboxEvent};
use rust_decimal::Decimal;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CurrencySeriesRow {
    pub id: i64,
    pub currency_code: String,
    pub provider_series_id: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CurrencySeriesRow> for CurrencySeries {
    fn from(row: CurrencySeriesRow) -> Self {
        Self {
            id: row.id,
            currency_code: row.currency_code,
            provider_series_id: row.provider_series_id,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExchangeRateRow {
    pub id: i64,
    pub series_id: i64,
    pub base_currency: String,
    pub target_currency: String,
    pub date: NaiveDate,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExchangeRateRow> for ExchangeRate {
    fn from(row: ExchangeRateRow) -> Self {
        Self {
            id: row.id,
            series_id: row.series_id,
            base_currency: row.base_currency,
            target_currency: row.target_currency,
            date: row.date,
            rate: row.rate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OutboxEventRow {
    pub id: i64,
    pub listener_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub publication_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl From<OutboxEventRow> for OutboxEvent {
    fn from(row: OutboxEventRow) -> Self {
        Self {
            id: row.id,
            listener_id: row.listener_id,
            event_type: row.event_type,
            payload: row.payload,
            publication_date: row.publication_date,
            completion_date: row.completion_date,
        }
    }
}
