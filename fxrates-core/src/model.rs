use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stable numeric id for a [`CurrencySeries`] row.
pub type SeriesId = i64;

/// `listenerId` under which `CatalogService` enqueues `CurrencyCreated` /
/// `CurrencyUpdated` events and under which the broker bridge registers
/// itself as an `EventListener`. A plain string contract rather than a
/// shared type because producer (`fxrates-engine`) and consumer
/// (`fxrates-broker`) must not depend on one another.
pub const CURRENCY_BROKER_LISTENER_ID: &str = "currency-broker-bridge";

/// Broker topic carrying [`CurrencyEnabledMessage`].
pub const CURRENCY_ENABLED_TOPIC: &str = "currency.enabled";

/// A descriptor making one foreign currency importable.
///
/// Invariants (enforced by [`crate::catalog::validate_currency_code`] and the
/// store's unique constraints, not by this struct alone):
/// - `currency_code` matches `^[A-Z]{3}$` and is unique across the catalog.
/// - `provider_series_id` is unique across the catalog.
/// - `currency_code != "USD"` (USD is the fixed base).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencySeries {
    pub id: SeriesId,
    pub currency_code: String,
    pub provider_series_id: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One daily observation, persisted with `base_currency` always `"USD"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub id: i64,
    pub series_id: SeriesId,
    pub base_currency: String,
    pub target_currency: String,
    pub date: NaiveDate,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One dense, carry-forward-resolved element of a query result.
///
/// `published_date` is always `<= requested_date` and is the most recent
/// stored date for `target` on or before `requested_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenseRate {
    pub base_currency: String,
    pub target_currency: String,
    pub requested_date: NaiveDate,
    pub rate: Decimal,
    pub published_date: NaiveDate,
}

/// Outcome of importing one series, returned from `ImportEngine` operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub currency_code: String,
    pub provider_series_id: String,
    pub new_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub completed_at: DateTime<Utc>,
}

impl ImportResult {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.new_count == 0 && self.updated_count == 0 && self.skipped_count == 0
    }
}

/// A durable record of an intent to publish, persisted in the same
/// transaction as the business mutation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEvent {
    pub id: i64,
    pub listener_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub publication_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.completion_date.is_none()
    }
}

/// Domain events published through the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    CurrencyCreated {
        series_id: SeriesId,
        currency_code: String,
        enabled: bool,
        correlation_id: String,
    },
    CurrencyUpdated {
        series_id: SeriesId,
        currency_code: String,
        enabled: bool,
        correlation_id: String,
    },
}

impl DomainEvent {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::CurrencyCreated { .. } => "CurrencyCreated",
            Self::CurrencyUpdated { .. } => "CurrencyUpdated",
        }
    }

    /// Whether this event should produce a broker message. Both variants
    /// only translate to a message when the currency ends up `enabled =
    /// true`; a currency created or toggled disabled is recorded in the
    /// outbox but never reaches the broker.
    #[must_use]
    pub const fn publishes_to_broker(&self) -> bool {
        match self {
            Self::CurrencyCreated { enabled, .. } | Self::CurrencyUpdated { enabled, .. } => *enabled,
        }
    }

    #[must_use]
    pub const fn series_id(&self) -> SeriesId {
        match self {
            Self::CurrencyCreated { series_id, .. } | Self::CurrencyUpdated { series_id, .. } => {
                *series_id
            }
        }
    }

    #[must_use]
    pub fn currency_code(&self) -> &str {
        match self {
            Self::CurrencyCreated { currency_code, .. }
            | Self::CurrencyUpdated { currency_code, .. } => currency_code,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::CurrencyCreated { correlation_id, .. }
            | Self::CurrencyUpdated { correlation_id, .. } => correlation_id,
        }
    }
}

/// Payload carried by the broker's "currency enabled/created" topic.
/// Distinct from [`DomainEvent`] because only a subset of domain events
/// ever reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyEnabledMessage {
    pub currency_series_id: SeriesId,
    pub currency_code: String,
    pub correlation_id: String,
}

impl From<&DomainEvent> for CurrencyEnabledMessage {
    fn from(ev: &DomainEvent) -> Self {
        Self {
            currency_series_id: ev.series_id(),
            currency_code: ev.currency_code().to_string(),
            correlation_id: ev.correlation_id().to_string(),
        }
    }
}

/// Carried through writes so audit columns are stamped explicitly rather
/// than via ORM interception.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl AuditContext {
    #[must_use]
    pub fn system(at: DateTime<Utc>) -> Self {
        Self {
            actor: "system".to_string(),
            at,
        }
    }
}
