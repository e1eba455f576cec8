use anyhow::{Context, Result};
use clap::Parser;
use juggernaut::config::{self, CliArgs, Config};
use juggernaut::rpa::chromium::{find_chromium, ChromiumLauncher};
use juggernaut::{create_app, db, repo, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` if set, otherwise `debug` or `info`
fn env_filter(debug: bool) -> EnvFilter {
    let default_level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs the global subscriber
///
/// With a log directory the output is also written to a daily rolling
/// file; the returned guard flushes it and must live until shutdown.
fn init_logging(config: &Config, debug: bool, json: bool) -> Option<WorkerGuard> {
    let filter = env_filter(debug);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "juggernaut.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads them
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    // The log directory comes from the config, so loading it logs to the
    // console only
    let config = tracing::subscriber::with_default(
        fmt().with_env_filter(env_filter(args.debug)).finish(),
        || config::get_config(&args),
    )?;
    let _log_guard = init_logging(&config, args.debug, args.log_json);

    info!("Starting Juggernaut Bot API v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Loaded configuration");

    // Initialize the database pool and bring the schema up to date
    let pool = Arc::new(db::init_pool(&config.database_url)?);
    {
        let mut conn = pool.get().context("Failed to get a database connection")?;
        db::run_migrations(&mut conn)?;
    }

    let interrupted = repo::fail_interrupted_tasks(&pool)?;
    if interrupted > 0 {
        warn!("Marked {} interrupted RPA tasks as failed", interrupted);
    }

    if find_chromium(config.chromium_path.as_deref()).is_none() {
        warn!("Chromium not found; RPA tasks will fail until it is installed or JUGGERNAUT_CHROMIUM_PATH is set");
    }
    let launcher = Arc::new(ChromiumLauncher::new(config.chromium_path.clone()));

    let state = AppState::new(pool, launcher, config.step_timeout());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}
