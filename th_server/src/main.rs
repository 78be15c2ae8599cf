//! Tournament management server.
//!
//! Serves the REST API and change event stream over a single listener,
//! backed by either in-memory storage or PostgreSQL.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;
use th_server::{
    api,
    config::{ConfigOverrides, ServerConfig, StorageBackend},
    logging, metrics,
};
use tournament_hub::{
    EventBus, FeedbackManager, TournamentCoordinator,
    auth::TokenVerifier,
    db::{Database, InMemoryStore, PgStore, Store},
};

const HELP: &str = "\
Run the tournament management server

USAGE:
  th_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage      BACKEND   memory or postgres          [default: env STORAGE_BACKEND or memory]
  --db-url       URL       Database connection string  [default: env DATABASE_URL]
  --metrics-bind IP:PORT   Prometheus exporter address [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          memory | postgres
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (at least 32 characters)
  ACCESS_TOKEN_MINUTES     Lifetime of issued tokens
  EVENT_CHANNEL_CAPACITY   Change event buffer per subscriber
  BRACKET_SEED             Fixed seed for reproducible bracket shuffles
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str::<_, StorageBackend>("--storage")?,
        metrics_bind: pargs.opt_value_from_str::<_, SocketAddr>("--metrics-bind")?,
    };

    // Catching signals for exit; SIGTERM is covered by the `termination` feature.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;
    info!("Starting tournament server at {} ({} storage)", config.bind, config.storage);

    let (store, database): (Arc<dyn Store>, Option<Database>) = match (config.storage, &config.database) {
        (StorageBackend::Postgres, Some(db_config)) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.health_check().await.context("Database health check failed")?;

            let store = PgStore::new(Arc::new(db.pool().clone()));
            store.migrate().await.context("Failed to apply database schema")?;
            info!("Database connected successfully");
            let store: Arc<dyn Store> = Arc::new(store);
            (store, Some(db))
        }
        _ => {
            info!("Using in-memory storage; data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
            (store, None)
        }
    };

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    let events = EventBus::new(config.event_channel_capacity);
    let coordinator = match config.bracket_seed {
        Some(seed) => {
            log::warn!("BRACKET_SEED is set; bracket shuffles are reproducible");
            TournamentCoordinator::with_seed(store.clone(), events, seed)
        }
        None => TournamentCoordinator::new(store.clone(), events),
    };

    let verifier = TokenVerifier::new(&config.security.jwt_secret, config.security.access_token_minutes)
        .map_err(|e| anyhow::anyhow!("Invalid JWT configuration: {}", e))?;

    let api_state = api::AppState {
        coordinator: Arc::new(coordinator),
        feedback: Arc::new(FeedbackManager::new(store)),
        verifier: Arc::new(verifier),
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            // Sender gone: the handler can no longer fire
            std::future::pending::<()>().await;
        }
    }
    info!("Shutdown signal received, draining connections");
}
