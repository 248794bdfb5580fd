pub mod api;
pub mod background;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,

        Commands::Grant { email, permission } => {
            cli::cmd_grant(&config, &email, &permission).await
        }

        Commands::InitConfig => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, leaving it untouched.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Marquee v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        warn!("server.enabled is false, nothing to do");
        return Ok(());
    }

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let port = config.server.port;
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = api::create_app_state_from_config(config, prometheus_handle).await?;
    let tasks = state.tasks.clone();

    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🌐 Web Server running at http://{}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, draining in-flight requests");
            let _ = stop_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            if let Err(e) = result {
                error!("Web server error: {}", e);
            }
        }
        () = async {
            if stop_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(?grace, "Grace period elapsed with requests still in flight");
        }
    }

    tasks.shutdown().await;
    info!("Marquee stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error listening for shutdown: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Error installing SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
