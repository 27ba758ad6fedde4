//! Composition root for the fxrates service: wires configuration, the
//! Postgres store, the FRED provider adapter, the Moka cache, the in-process
//! broker bridge, and the axum HTTP surface together, then serves forever.
//!
//! No component here is reused by any other crate: this binary's only job is
//! explicit construction, with dependencies passed down from one
//! composition root rather than a process-wide singleton.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use fxrates_broker::{channel_broker, BrokerConsumer, InMemoryDeadLetterQueue, OutboxBrokerListener, RetryPolicy};
use fxrates_cache::{CachingQueryEngine, MokaRateCache};
use fxrates_core::config::AppConfig;
use fxrates_core::{Broker, OutboxStore, QueryEngine, RateCache, RateStore};
use fxrates_engine::{CatalogService, CronSchedule, ImportEngine, ImportTriggerHandler, OutboxDispatcher, PlainQueryEngine, RetryConfig, Scheduler};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fxrates failed to start: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(None)?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pool = fxrates_store::connect(&config.database.url, config.database.max_connections).await?;
    fxrates_store::MIGRATOR.run(&pool).await?;
    let store: Arc<dyn RateStore> = Arc::new(fxrates_store::PgRateStore::new(pool.clone()));
    let outbox_store: Arc<dyn OutboxStore> = Arc::new(fxrates_store::PgRateStore::new(pool.clone()));
    let lease = Arc::new(fxrates_store::PgLeaseLock::new(pool));

    let base_url = url::Url::parse(&config.provider.base_url)?;
    let provider = fxrates_fred::FredAdapterBuilder::new(base_url, config.provider.api_key.clone())
        .with_timeout(Duration::from_secs(config.provider.timeout_secs))
        .build();

    let cache = Arc::new(MokaRateCache::new(
        config.cache.capacity,
        Duration::from_secs(config.cache.ttl_secs),
    ));

    let (channel_broker, broker_receiver) = channel_broker();
    let broker: Arc<dyn Broker> = Arc::new(channel_broker);

    let import_engine = Arc::new(ImportEngine::new(
        store.clone(),
        provider.clone(),
        Arc::clone(&cache) as Arc<dyn RateCache>,
        config.import.clone(),
    ));
    let catalog = Arc::new(CatalogService::new(store.clone(), provider));
    let query_engine: Arc<dyn QueryEngine> = Arc::new(CachingQueryEngine::new(
        Arc::new(PlainQueryEngine::new(store.clone())),
        Arc::clone(&cache) as Arc<dyn RateCache>,
    ));

    info!("running startup import of missing exchange rate series");
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&import_engine),
        lease,
        CronSchedule::parse(&config.scheduler.import_cron)?,
        "exchangeRateImport",
        Duration::from_secs(config.scheduler.lease_hold_at_most_secs),
        Duration::from_secs(config.scheduler.lease_hold_at_least_secs),
        RetryConfig::default(),
    ));
    scheduler.run_startup_import().await?;

    let mut outbox_dispatcher = OutboxDispatcher::new(
        outbox_store,
        config.outbox.batch_size,
        config.outbox.retention_days,
    );
    outbox_dispatcher.register(Arc::new(OutboxBrokerListener::new(Arc::clone(&broker))));
    let outbox_dispatcher = Arc::new(outbox_dispatcher);

    let import_trigger = Arc::new(ImportTriggerHandler::new(Arc::clone(&import_engine)));
    let dlq = Arc::new(InMemoryDeadLetterQueue::new());
    let consumer_handle = BrokerConsumer::spawn(broker_receiver, import_trigger, dlq, RetryPolicy::default());

    let outbox_task = {
        let dispatcher = Arc::clone(&outbox_dispatcher);
        let interval = Duration::from_secs(config.outbox.poll_interval_secs);
        tokio::spawn(async move {
            dispatcher.run_loop(interval).await;
        })
    };
    let scheduler_task = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler.run_loop().await;
        })
    };

    let app_state = fxrates_http::AppState::new(catalog, query_engine, import_engine);
    let router = fxrates_http::build_router(app_state);
    let bind_addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "fxrates listening");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    outbox_task.abort();
    scheduler_task.abort();
    consumer_handle.stop().await;

    if let Err(err) = serve_result {
        error!(error = %err, "http server exited with error");
        return Err(Box::new(err));
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
