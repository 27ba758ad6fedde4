//! `ProviderClient`/`ProviderAdapter` implementations for a FRED-style daily
//! exchange rate observations API.

pub mod adapter;
pub mod builder;
pub mod client;

pub use adapter::FredRateAdapter;
pub use builder::FredAdapterBuilder;
pub use client::FredClient;
