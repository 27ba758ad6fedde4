//! Process configuration, layered `config.toml` + `FXRATES_*` environment
//! overrides. Scheduling and locking parameters are plain config values
//! rather than annotation-driven defaults.

use serde::Deserialize;

use crate::error::{FxError, FxResult};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_http_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_provider_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_capacity() -> u64 {
    1024
}

const fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Quartz-style 6-field cron expression for the daily import sweep.
    #[serde(default = "default_import_cron")]
    pub import_cron: String,
    #[serde(default = "default_lease_hold_at_most_secs")]
    pub lease_hold_at_most_secs: u64,
    #[serde(default = "default_lease_hold_at_least_secs")]
    pub lease_hold_at_least_secs: u64,
}

fn default_import_cron() -> String {
    "0 0 23 * * *".to_string()
}

const fn default_lease_hold_at_most_secs() -> u64 {
    600
}

const fn default_lease_hold_at_least_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            import_cron: default_import_cron(),
            lease_hold_at_most_secs: default_lease_hold_at_most_secs(),
            lease_hold_at_least_secs: default_lease_hold_at_least_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_outbox_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_outbox_retention_days")]
    pub retention_days: i64,
}

const fn default_outbox_poll_interval_secs() -> u64 {
    5
}

const fn default_outbox_batch_size() -> i64 {
    100
}

const fn default_outbox_retention_days() -> i64 {
    30
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_outbox_poll_interval_secs(),
            batch_size: default_outbox_batch_size(),
            retention_days: default_outbox_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_min_coverage_ratio")]
    pub min_coverage_ratio: f64,
    /// Absolute payload-size cap in bytes for an incremental import
    /// (default 300 KiB).
    #[serde(default = "default_sanity_absolute_cap_bytes")]
    pub sanity_absolute_cap_bytes: u64,
    /// Expected bytes per day of history, used to size the proportional cap.
    #[serde(default = "default_sanity_expected_bytes_per_day")]
    pub sanity_expected_bytes_per_day: f64,
    /// Multiplier applied to the proportional cap before rejecting a payload.
    #[serde(default = "default_sanity_tolerance")]
    pub sanity_tolerance: f64,
}

const fn default_min_coverage_ratio() -> f64 {
    0.5
}

const fn default_sanity_absolute_cap_bytes() -> u64 {
    300 * 1024
}

const fn default_sanity_expected_bytes_per_day() -> f64 {
    20.0
}

const fn default_sanity_tolerance() -> f64 {
    4.0
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            min_coverage_ratio: default_min_coverage_ratio(),
            sanity_absolute_cap_bytes: default_sanity_absolute_cap_bytes(),
            sanity_expected_bytes_per_day: default_sanity_expected_bytes_per_day(),
            sanity_tolerance: default_sanity_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl AppConfig {
    /// Load configuration from an optional `config.toml`, overridden by
    /// `FXRATES_*` environment variables (double-underscore separated for
    /// nested keys, e.g. `FXRATES_DATABASE__URL`).
    ///
    /// # Errors
    /// Returns [`FxError::Internal`] if the layered sources cannot be parsed
    /// or a required field is missing.
    pub fn load(path: Option<&str>) -> FxResult<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("config").required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FXRATES")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder
            .build()
            .map_err(|e| FxError::Internal(format!("loading configuration: {e}")))?;
        cfg.try_deserialize()
            .map_err(|e| FxError::Internal(format!("parsing configuration: {e}")))
    }
}
