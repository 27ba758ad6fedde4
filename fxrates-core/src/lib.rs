//! Core domain types, error taxonomy, and cross-crate traits for the fxrates
//! reference-rate service: a local, query-optimized store of daily USD-base
//! FX rates sourced from a FRED-style observations API.
//!
//! Every other crate in this workspace depends on `fxrates-core` and none of
//! its siblings; it carries no I/O of its own beyond [`config`] loading.

pub mod config;
pub mod dense;
pub mod error;
pub mod iso4217;
pub mod model;
pub mod sanity;
pub mod traits;

pub use error::{ErrorCode, FxError, FxResult};
pub use model::{
    AuditContext, CurrencyEnabledMessage, CurrencySeries, DenseRate, DomainEvent, ExchangeRate,
    ImportResult, OutboxEvent, SeriesId, CURRENCY_BROKER_LISTENER_ID, CURRENCY_ENABLED_TOPIC,
};
pub use traits::{
    Broker, BrokerConsumerHandler, EventListener, Lease, LeaseLock, LeaseReleaser,
    NewExchangeRate, ObservationsResponse, OutboxStore, ProviderAdapter, ProviderClient,
    QueryEngine, RateCache, RateStore, RawObservation, UpsertOutcome, WriteTx,
};
