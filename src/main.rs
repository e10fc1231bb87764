use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gunrack_tracker::api::health::HealthState;
use gunrack_tracker::api::latency::LatencyStats;
use gunrack_tracker::api::routes::{router, ApiState};
use gunrack_tracker::config::Config;
use gunrack_tracker::db::{SqliteStorage, Storage};
use gunrack_tracker::engine::Engine;
use gunrack_tracker::error::Result;
use gunrack_tracker::runner::SnapshotWatcher;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let storage = SqliteStorage::connect(&format!("sqlite:{}", cfg.db_path), 4).await?;
    info!("Database ready at {}", cfg.db_path);

    let active = storage.load_active_records().await?;
    info!(active = active.len(), "Inventory loaded: {} active listings", active.len());

    // --- Engine ---
    let latency = Arc::new(LatencyStats::new());
    let health = Arc::new(HealthState::new());
    let engine = Arc::new(Engine::with_observers(Arc::new(storage), latency, health));

    // --- Snapshot watcher (background) ---
    match &cfg.snapshot_path {
        Some(path) => {
            info!(
                "Watching {path} every {}s for new scrape snapshots",
                cfg.pass_interval_secs
            );
            let watcher = SnapshotWatcher::new(
                path.clone(),
                Duration::from_secs(cfg.pass_interval_secs),
                Arc::clone(&engine),
            );
            tokio::spawn(async move { watcher.run().await });
        }
        None => warn!("SNAPSHOT_PATH not set: no scrape passes will run, serving stored data only"),
    }

    // --- HTTP API server ---
    let api_state = ApiState {
        engine,
        top_deals_limit: cfg.top_deals_limit,
        history_window_days: cfg.history_window_days,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
