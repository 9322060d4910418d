use calltrack::application::{LifecycleManager, StatisticsEngine};
use calltrack::config::{Config, StoreBackend};
use calltrack::domain::call::{CallDirection, CallFilters, CallStore, CreateCallRequest};
use calltrack::infrastructure::messaging::CallEventBroadcaster;
use calltrack::infrastructure::metrics::init_metrics;
use calltrack::infrastructure::persistence::MemoryCallStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use calltrack::infrastructure::persistence::{create_pool, run_migrations, PgCallStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::var("CALLTRACK_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Calltrack");
    info!("Configuration loaded: {:?}", config);

    let metrics_handle = init_metrics()?;
    info!("Prometheus metrics initialized");

    let store = build_store(&config).await?;

    let events = Arc::new(CallEventBroadcaster::new(config.events.capacity));
    let mut event_rx = events.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            info!(event_type = event.event_type(), call_id = %event.call_id(), "Call event");
        }
    });

    let lifecycle = LifecycleManager::new(store.clone()).with_event_broadcaster(events.clone());
    let statistics = StatisticsEngine::with_tariff(store, config.billing.clone());

    demo_call_lifecycle(&lifecycle, &statistics).await?;

    drop(lifecycle);
    drop(events);
    let _ = event_logger.await;

    println!("{}", metrics_handle.render());
    info!("Calltrack demo finished");

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn CallStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory call store");
            Ok(Arc::new(MemoryCallStore::new()))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database).await?;
            run_migrations(&pool).await?;
            info!("Using PostgreSQL call store");
            Ok(Arc::new(PgCallStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackend::Postgres => {
            anyhow::bail!("PostgreSQL store requested but the `postgres` feature is disabled")
        }
    }
}

async fn demo_call_lifecycle(
    lifecycle: &LifecycleManager,
    statistics: &StatisticsEngine,
) -> anyhow::Result<()> {
    info!("=== Call Lifecycle Demo ===");

    let call = lifecycle
        .create(CreateCallRequest::new("+351910000001", "+351910000002", CallDirection::Outbound))
        .await?;
    info!("Call created: {}", serde_json::to_string(&call)?);

    // Second call on a busy line
    match lifecycle
        .create(CreateCallRequest::new("+351910000002", "+351910000003", CallDirection::Inbound))
        .await
    {
        Ok(_) => warn!("Busy line accepted a second call"),
        Err(e) => info!("Second call rejected: {}", e),
    }

    let ended = lifecycle.end(call.id()).await?;
    info!("Call ended after {:?}", ended.duration());

    let batch = lifecycle
        .create_bulk(vec![
            CreateCallRequest::new("+351910000002", "+351910000003", CallDirection::Inbound),
            CreateCallRequest::new("+351910000004", "+351910000005", CallDirection::Outbound),
        ])
        .await?;
    for call in &batch {
        lifecycle.end(call.id()).await?;
    }

    let ended_count = lifecycle
        .count(&CallFilters::parse(None, Some("ENDED"))?)
        .await?;
    info!("Ended calls on record: {}", ended_count);

    let report = statistics.compute().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("=== Demo completed successfully ===");
    Ok(())
}
