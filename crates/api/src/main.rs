use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use coconut_api::app::{create_app, AppState, Stores};
use coconut_api::config::Config;
use coconut_api::jobs::{JobScheduler, PoolMetricsJob, RateLimitCleanupJob, SessionCleanupJob};
use coconut_api::{containers, middleware};
use persistence::repositories::{PoolHealth, SessionRepository, SetupRepository, UserRepository};

#[derive(Debug, Parser)]
#[command(name = "coconut", version, about = "Coconut server dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations and serve HTTP (default).
    Serve {
        /// Start without applying pending migrations.
        #[arg(long)]
        skip_migrations: bool,
    },
    /// Apply pending migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    // Held for the life of the process so buffered file logs are flushed.
    let _log_guard =
        middleware::logging::init_logging(&config.logging, config.effective_log_level());

    info!("Starting Coconut v{}", env!("CARGO_PKG_VERSION"));

    let db_config = persistence::db::DatabaseConfig::from(&config.database);
    let pool = persistence::db::create_pool(&db_config)
        .await
        .context("Failed to connect to the database")?;

    let skip_migrations = match cli.command.unwrap_or(Command::Serve {
        skip_migrations: false,
    }) {
        Command::Migrate => {
            run_migrations(&pool).await?;
            return Ok(());
        }
        Command::Serve { skip_migrations } => skip_migrations,
    };

    if skip_migrations {
        warn!("Skipping database migrations");
    } else {
        run_migrations(&pool).await?;
    }

    if let Err(e) = middleware::init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed; /metrics disabled");
    }

    let sessions = Arc::new(SessionRepository::new(pool.clone()));
    let stores = Stores {
        users: Arc::new(UserRepository::new(pool.clone())),
        sessions: sessions.clone(),
        setup: Arc::new(SetupRepository::new(pool.clone())),
        health: Arc::new(PoolHealth::new(pool.clone())),
    };

    let runtime = containers::detect(&config.containers).await;
    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid server host '{}'", config.server.host))?,
        config.server.port,
    );

    let state = AppState::build(config, stores, runtime).context("Invalid configuration")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(SessionCleanupJob::new(sessions));
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    if let Some(limiter) = state.rate_limiter.clone() {
        scheduler.register(RateLimitCleanupJob::new(limiter));
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    pool.close().await;

    info!("Server stopped");
    Ok(())
}

async fn run_migrations(pool: &sqlx::PgPool) -> Result<()> {
    persistence::db::run_migrations(pool)
        .await
        .context("Database migration failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
