use alert_lifecycle::Services;
use alert_lifecycle::aggregator::LowPriorityBatcher;
use alert_lifecycle::api::{IngestState, start_webserver};
use alert_lifecycle::clock::{Clock, SystemClock};
use alert_lifecycle::config::load_config;
use alert_lifecycle::lifecycle::{Engine, StatusRecorder};
use alert_lifecycle::notify::{Dispatcher, Notifier};
use alert_lifecycle::store::{
    DbDirectory, DbEventStore, DbMarkerStore, DbQueueSink, MaskCache, Markers, StrategyCache,
};
use alert_lifecycle::worker::{event_queue, spawn_workers};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "alert_lifecycle=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer().with_target(true).with_level(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

/// Keep the strategy and mask caches in step with the database.
async fn cache_sync_loop(
    db: Arc<DatabaseConnection>,
    strategies: StrategyCache,
    masks: Arc<MaskCache>,
    period: Duration,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match strategies.sync_from_db(&db).await {
            Ok(n) => tracing::debug!(
                name = "cache.strategies.synced",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                count = n,
                message = "Strategy cache synced"
            ),
            Err(e) => tracing::error!(
                name = "cache.strategies.sync_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Strategy cache sync failed, keeping previous rules"
            ),
        }
        match masks.sync_from_db(&db).await {
            Ok(n) => tracing::debug!(
                name = "cache.masks.synced",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                count = n,
                message = "Mask cache synced"
            ),
            Err(e) => tracing::error!(
                name = "cache.masks.sync_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Mask cache sync failed, keeping previous rules"
            ),
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    initialize_tracing();

    let config = Arc::new(load_config()?);

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let strategies = StrategyCache::new();
    let masks = Arc::new(MaskCache::new());
    strategies.sync_from_db(&db).await?;
    masks.sync_from_db(&db).await?;

    let services = Services {
        config: config.clone(),
        events: Arc::new(DbEventStore::new(db.clone())),
        markers: Markers::new(Arc::new(DbMarkerStore::new(db.clone(), clock.clone()))),
        queues: Arc::new(DbQueueSink::new(db.clone(), clock.clone())),
        directory: Arc::new(DbDirectory::new(db.clone())),
        strategies: strategies.clone(),
        masks: masks.clone(),
        clock,
    };

    let (dispatcher, _dispatch_task) =
        Dispatcher::spawn(Notifier::new(&services), config.queue_capacity);
    let batcher = LowPriorityBatcher::new(
        dispatcher.clone(),
        StatusRecorder::new(services.events.clone()),
    );
    let engine = Engine::new(services, dispatcher, batcher.clone());

    tracing::info!(
        name = "startup",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        high_priority_max = config.notify.high_priority_max,
        strategies = strategies.len(),
        message = "Alert lifecycle engine starting"
    );

    tokio::spawn(batcher.run(Duration::from_secs(
        config.notify.low_priority_flush_secs,
    )));
    tokio::spawn(cache_sync_loop(
        db.clone(),
        strategies,
        masks,
        Duration::from_secs(config.cache_sync_secs),
    ));

    let (tx, rx) = event_queue(config.queue_capacity);
    let _workers = spawn_workers(engine, rx, config.workers);

    start_webserver(&config.listen_addr, IngestState { tx }).await?;
    Ok(())
}
