//! ChatHub Server: real-time messaging, presence and call signalling
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use chathub_api::{AppState, build_app};
use chathub_auth::JwtDecoder;
use chathub_core::config::push::PushProvider;
use chathub_core::config::{AppConfig, StorageBackend};
use chathub_core::error::AppError;
use chathub_database::{DatabasePool, MemoryStore, Stores};
use chathub_realtime::connection::WsAuthenticator;
use chathub_realtime::{HttpPushGateway, LogPushGateway, PushGateway, RealtimeEngine};
use chathub_worker::CronScheduler;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("CHATHUB_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ChatHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores ───────────────────────────────────────────
    let (stores, db_pool) = match config.database.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            chathub_database::migration::run_migrations(pool.pool()).await?;

            let stores = chathub_database::repositories::postgres_stores(pool.pool().clone());
            (stores, Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            (Stores::from_single(Arc::new(MemoryStore::new())), None)
        }
    };

    // ── Step 2: Push gateway ─────────────────────────────────────
    let push: Arc<dyn PushGateway> = match config.push.provider {
        PushProvider::Log => Arc::new(LogPushGateway),
        PushProvider::Http => Arc::new(HttpPushGateway::new(&config.push)?),
    };
    tracing::info!(provider = ?config.push.provider, "Push gateway initialized");

    // ── Step 3: Realtime engine + auth ───────────────────────────
    let engine = RealtimeEngine::new(&config, stores, push);
    let decoder = Arc::new(JwtDecoder::new(&config.auth));
    let authenticator = WsAuthenticator::new(decoder);
    tracing::info!("Realtime engine initialized");

    // ── Step 4: Background worker ────────────────────────────────
    let scheduler = if config.worker.enabled {
        tracing::info!("Starting background worker...");
        let mut scheduler = CronScheduler::new().await?;
        scheduler
            .register_default_tasks(
                &config.calls,
                &config.worker,
                engine.call_expiry(),
                engine.counter_maintenance(),
            )
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 5: HTTP server ──────────────────────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let mut state = AppState::new(Arc::new(config), engine.clone(), authenticator);
    if let Some(pool) = &db_pool {
        state = state.with_database(pool.clone());
    }
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("ChatHub server listening on {}", addr);

    // Engine shutdown closes live sockets; the drain cannot finish without it.
    let shutdown_engine = engine.clone();
    let (draining_tx, mut draining_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = draining_tx.send(true);
        if let Err(e) = shutdown_engine.shutdown().await {
            tracing::warn!("Realtime engine shutdown failed: {}", e);
        }
    });

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = async {
            let _ = draining_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("Graceful shutdown timed out after {:?}", grace);
        }
    }

    // ── Step 6: Background tasks ─────────────────────────────────
    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("ChatHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
