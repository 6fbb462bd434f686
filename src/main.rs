//! depositaja - wallet balance and threshold flagging service
//!
//! One binary, several roles: the balance collector, the flagger and the
//! HTTP facade bound to the deposit or the withdraw stream. Roles are
//! picked on the command line and may share a process.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depositaja::api::{self, AppState};
use depositaja::codec::DepositCodec;
use depositaja::emitter::Emitter;
use depositaja::event_log::{EventLog, MemoryLog, PgEventLog};
use depositaja::handlers::{CheckHandler, DepositHandler};
use depositaja::processor::{BalanceCollector, Flagger, Processor};
use depositaja::view::View;
use depositaja::{db, shutdown, Config, Direction, LogBackend, Roles};

#[derive(Debug, Parser)]
#[command(name = "depositaja", about = "Wallet balance and threshold flagging service")]
struct Cli {
    /// Run the balance collector
    #[arg(long)]
    collector: bool,

    /// Run the flagger
    #[arg(long)]
    flagger: bool,

    /// Serve HTTP, publishing to the given stream
    #[arg(long, value_enum)]
    service: Option<Direction>,
}

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "depositaja=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Open the configured event log; the pool is returned so it can be closed
async fn open_log(config: &Config) -> anyhow::Result<(Arc<dyn EventLog>, Option<PgPool>)> {
    match config.log_backend {
        LogBackend::Memory => Ok((Arc::new(MemoryLog::new()), None)),
        LogBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;

            db::ensure_schema(&pool).await?;
            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }

            tracing::info!("Database connected successfully");
            Ok((Arc::new(PgEventLog::new(pool.clone())), Some(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let roles = Roles::new(cli.collector, cli.flagger, cli.service)?;
    let config = Config::from_env()?;

    if config.log_backend == LogBackend::Memory && config.is_production() {
        tracing::warn!("Memory log selected in production; events are lost on exit");
    }
    if config.log_backend == LogBackend::Memory && !roles.is_complete() {
        tracing::warn!(
            ?roles,
            "Memory log is private to this process; roles running elsewhere will not see its events"
        );
    }

    tracing::info!(?roles, backend = ?config.log_backend, "Starting depositaja");

    let (log, pool) = open_log(&config).await?;
    let processor_config = config.processor_config();
    let (trigger, signal) = shutdown::channel();
    let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

    if roles.run_collector {
        let processor = Processor::<BalanceCollector>::new(log.clone(), processor_config.clone());
        let signal = signal.clone();
        tasks.spawn(async move {
            processor.run(signal).await?;
            Ok(())
        });
    }

    if roles.run_flagger {
        let processor = Processor::<Flagger>::new(log.clone(), processor_config.clone());
        let signal = signal.clone();
        tasks.spawn(async move {
            processor.run(signal).await?;
            Ok(())
        });
    }

    if let Some(direction) = roles.service {
        let emitter =
            Emitter::<DepositCodec>::new(log.clone(), direction.stream(), config.partitions).await?;

        let balances = View::<BalanceCollector>::new(log.clone(), processor_config.clone());
        let flags = View::<Flagger>::new(log.clone(), processor_config.clone());

        let (view, view_signal) = (balances.clone(), signal.clone());
        tasks.spawn(async move { Ok(view.run(view_signal).await?) });
        let (view, view_signal) = (flags.clone(), signal.clone());
        tasks.spawn(async move { Ok(view.run(view_signal).await?) });

        let state = AppState::new(
            DepositHandler::new(emitter, direction),
            CheckHandler::new(balances, flags),
        );
        let app = api::build_router(state);

        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(stream = %direction, "Listening on http://{}", addr);

        let mut signal = signal.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.wait().await })
                .await?;
            Ok(())
        });
    }

    let mut failure: Option<anyhow::Error> = None;

    tokio::select! {
        _ = shutdown_signal() => {}
        Some(joined) = tasks.join_next() => {
            if let Err(e) = flatten(joined) {
                tracing::error!(error = %e, "Task failed, shutting down");
                failure = Some(e);
            }
        }
    }

    trigger.trigger();

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = flatten(joined) {
            tracing::error!(error = %e, "Task failed during shutdown");
            failure.get_or_insert(e);
        }
    }

    tracing::info!("Roles stopped");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn flatten(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) -> anyhow::Result<()> {
    joined.map_err(anyhow::Error::from)?
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
