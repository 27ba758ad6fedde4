//! Postgres-backed persistence for the fxrates service: the rate/series
//! store, the transactional outbox, and the named lease lock.

mod error_mapping;
mod lease;
mod outbox_store;
mod pool;
mod rate_store;
mod rows;

pub use lease::PgLeaseLock;
pub use pool::connect;
pub use rate_store::PgRateStore;

/// Embedded schema migrations, run at startup via
/// `MIGRATOR.run(&pool).await`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
