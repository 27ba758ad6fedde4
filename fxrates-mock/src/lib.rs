//! In-memory test doubles for every trait `fxrates-core` defines, used by
//! integration tests across the workspace in place of Postgres, the FRED
//! API, and a real broker.

pub mod broker;
pub mod lease;
pub mod provider;
pub mod store;

pub use broker::InMemoryBroker;
pub use lease::FakeLeaseLock;
pub use provider::{FakeProviderAdapter, FAIL_SERIES_ID, MISSING_SERIES_ID};
pub use store::InMemoryStore;
