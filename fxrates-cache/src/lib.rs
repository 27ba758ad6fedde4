//! Caching decorator for the query engine.

pub mod decorator;
pub mod moka_cache;

pub use decorator::CachingQueryEngine;
pub use moka_cache::MokaRateCache;
