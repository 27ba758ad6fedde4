//! Composition-level orchestration for the fxrates service: `ImportEngine`,
//! the uncached `QueryEngine` implementation, `CatalogService`, the
//! `Scheduler`, the inbound broker-trigger handler, and the outbox
//! dispatcher.
//!
//! This crate depends only on `fxrates-core`'s traits; it never names a
//! concrete provider, store, cache, or broker implementation.

pub mod catalog;
pub mod consumer;
pub mod cron;
pub mod import;
pub mod outbox;
pub mod query;
pub mod scheduler;

pub use catalog::CatalogService;
pub use consumer::ImportTriggerHandler;
pub use cron::CronSchedule;
pub use import::{ImportEngine, SeriesImportOutcome};
pub use outbox::OutboxDispatcher;
pub use query::PlainQueryEngine;
pub use scheduler::{RetryConfig, Scheduler};
