use anyhow::{Context, Result};
use log::{info, warn, LevelFilter};
use std::env;
use std::sync::Arc;
use tokio::sync::watch;

use ckpool_stats::api;
use ckpool_stats::collector::{signal_shutdown, Collector};
use ckpool_stats::config::Config;
use ckpool_stats::database::db::Db;

#[tokio::main]
async fn main() -> Result<()> {
    let env_loaded = dotenv::dotenv().is_ok();

    let debug = env::var("DEBUG")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("ckpool_stats", if debug { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    if env_loaded {
        info!(".env file loaded successfully");
    } else {
        info!("No .env file found, relying on system environment variables");
    }
    let config = Config::load().context("Failed to load configuration")?;
    config.log_summary();

    let db = Arc::new(Db::connect(&config.database).await?);
    db.migrate().await.context("Failed to create database schema")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector = Collector::new(db.clone(), &config.paths, config.collect_interval);
    let collector_task = tokio::spawn(collector.run(shutdown_rx));

    let routes = api::routes(db.clone(), Arc::new(config.paths.clone()));
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.api_addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .context(format!("Failed to bind API server to {}", config.api_addr))?;

    info!("Server running on {}", addr);
    server.await;

    info!("Shutting down...");
    signal_shutdown(&shutdown_tx);
    if let Err(e) = collector_task.await {
        warn!("Collector task ended abnormally: {}", e);
    }
    db.pool.close().await;
    Ok(())
}
