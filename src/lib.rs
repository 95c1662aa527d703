pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    match cli.command {
        Some(Commands::Resolve { reference, mode }) => {
            cli::cmd_resolve(config, &reference, mode).await
        }
        Some(Commands::Backfill { show_id }) => cli::cmd_backfill_show(config, &show_id).await,
        Some(Commands::Serve) => run_server(config, prometheus_handle).await,
        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("Created config.toml with default settings.");
            } else {
                println!("config.toml already exists.");
            }
            Ok(())
        }
        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Episoda - episode identity resolution and artwork backfill");
    println!();
    println!("USAGE:");
    println!("  episoda <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  resolve <reference> [--mode initial|manual|silent]");
    println!("                    Resolve an episode and backfill its artwork");
    println!("  backfill <show_id>");
    println!("                    Backfill artwork for every episode of a show");
    println!("  serve             Start the HTTP server");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("REFERENCES:");
    println!("  An internal episode id, or {{trakt_id}}-S{{season}}E{{episode}} (e.g. 41793-S2E1)");
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    if !config.server.enabled {
        info!("Server disabled in config, nothing to do");
        return Ok(());
    }

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config).await?);
    let api_state = api::create_app_state(shared, prometheus_handle);

    info!("Starting Web API on port {}", port);

    let app = api::router(api_state).await;
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("Web Server running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}
