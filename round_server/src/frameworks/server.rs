// Framework bootstrap for the round server runtime.

use crate::domain::ports::{MapRegistry, StatsStore};
use crate::domain::tuning::RoundTuning;
use crate::frameworks::{config, db};
use crate::interface_adapters::maps::TomlMapRegistry;
use crate::interface_adapters::net::notice_serializer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::stores::{InMemoryStatsStore, PostgresStatsStore, SystemClock};
use crate::use_cases::{
    RoundEngine, RoundEvent, RoundNotice, RoundPorts, round_task, spawn_stats_worker,
};

use axum::extract::ws::Utf8Bytes;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

// Background tasks that must finish after the listener closes.
struct RoundRuntime {
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
    round: JoinHandle<()>,
    stats: JoinHandle<()>,
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let runtime = build_runtime().await?;
    let app = app(runtime.state.clone());

    tracing::info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(runtime.shutdown.clone()))
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })?;

    // The round task owns the last stats sink; once it exits the worker drains and stops.
    if let Err(e) = runtime.round.await {
        tracing::error!(error = %e, "round task failed");
    }
    if let Err(e) = runtime.stats.await {
        tracing::error!(error = %e, "stats worker failed");
    }
    tracing::info!("server stopped");
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

// Resolves when the round loop asks to stop, or on Ctrl-C.
async fn shutdown_signal(shutdown: Arc<Notify>) {
    tokio::select! {
        _ = shutdown.notified() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                shutdown.notified().await;
                return;
            }
            tracing::info!("ctrl-c received; stopping round loop");
            shutdown.notify_waiters();
        }
    }
}

fn load_maps() -> Result<Arc<TomlMapRegistry>> {
    let path = config::maps_config_path();
    let maps = TomlMapRegistry::load(&path)
        .map_err(|e| std::io::Error::other(format!("failed to load map config: {e}")))?;

    match maps.waiting_map() {
        Some(waiting_map) => tracing::info!(%waiting_map, "waiting map configured"),
        None => tracing::warn!("there isn't a configured waiting map"),
    }
    let pool = maps.list_maps();
    if pool.is_empty() {
        tracing::warn!("there are no configured game maps; rounds will not start");
    } else {
        tracing::info!(maps = ?pool, path = %path.display(), "map pool loaded");
    }
    Ok(Arc::new(maps))
}

async fn build_stats_store() -> Result<Arc<dyn StatsStore>> {
    let Some(database_url) = config::stats_database_url() else {
        tracing::warn!("STATS_DATABASE_URL is not set; statistics are kept in memory");
        return Ok(Arc::new(InMemoryStatsStore::new()));
    };

    let pool = db::connect_pool(&database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to connect stats database: {e}")))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to run stats migrations: {e}")))?;
    tracing::debug!("stats database ready");

    Ok(Arc::new(PostgresStatsStore::new(pool)))
}

async fn build_runtime() -> Result<RoundRuntime> {
    let maps = load_maps()?;
    let stats_store = build_stats_store().await?;
    let (stats_sink, stats) = spawn_stats_worker(stats_store.clone());

    let end_action = config::round_end_action();
    let engine = RoundEngine::new(
        RoundPorts {
            maps: maps.clone(),
            stats: Arc::new(stats_sink),
            clock: Arc::new(SystemClock),
        },
        RoundTuning::default(),
        end_action,
    );
    tracing::debug!(?end_action, "round engine configured");

    // Setup Channels
    // event_tx/rx: connection and operator events go to the single round task.
    let (event_tx, event_rx) = mpsc::channel::<RoundEvent>(config::EVENT_CHANNEL_CAPACITY);
    // notice_tx/rx: typed notices from the round task.
    let (notice_tx, notice_rx) =
        broadcast::channel::<RoundNotice>(config::NOTICE_BROADCAST_CAPACITY);
    // notice_bytes_tx/rx: serialized notices shared across all connections.
    let (notice_bytes_tx, _notice_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::NOTICE_BROADCAST_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
    let shutdown = Arc::new(Notify::new());

    tokio::spawn(notice_serializer(notice_rx, notice_bytes_tx.clone()));
    let round = tokio::spawn(round_task(
        engine,
        event_rx,
        notice_tx,
        snapshot_tx,
        config::TICK_INTERVAL,
        shutdown.clone(),
    ));

    let state = Arc::new(AppState {
        event_tx,
        notice_bytes_tx,
        snapshot_rx,
        stats_store,
        maps,
    });

    Ok(RoundRuntime {
        state,
        shutdown,
        round,
        stats,
    })
}
