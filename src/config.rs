// src/config.rs

use anyhow::{Context, Result};
use log::info;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Locations of the files ckpool writes under its base directory.
#[derive(Debug, Clone)]
pub struct PoolPaths {
    pub base: PathBuf,
    pub pool_status: PathBuf,
    pub users_dir: PathBuf,
}

impl PoolPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            pool_status: base.join("logs").join("pool").join("pool.status"),
            users_dir: base.join("logs").join("users"),
            base,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub paths: PoolPaths,
    pub database: DatabaseConfig,
    pub api_addr: SocketAddr,
    pub collect_interval: Duration,
}

impl Config {
    /// Builds the configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base = match var("POOL_BASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = dirs::home_dir()
                    .context("POOL_BASE_PATH is not set and failed to determine home directory")?;
                let base = home.join("ckpool");
                info!("POOL_BASE_PATH is not set. Using default: {}", base.display());
                base
            }
        };

        let database = DatabaseConfig {
            host: var("POSTGRES_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&var, "POSTGRES_PORT", 5432)?,
            user: var("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string()),
            password: var("POSTGRES_PASSWORD").unwrap_or_default(),
            database: var("POSTGRES_DB").unwrap_or_else(|| "ckpool".to_string()),
            max_connections: parse_or(&var, "POSTGRES_MAX_CONNECTIONS", 5)?,
        };

        let api_addr = parse_or(&var, "API_ADDR", SocketAddr::from(([0, 0, 0, 0], 8081)))?;
        let collect_interval = Duration::from_secs(parse_or(&var, "COLLECT_INTERVAL_SECS", 300u64)?.max(1));

        Ok(Self {
            paths: PoolPaths::new(base),
            database,
            api_addr,
            collect_interval,
        })
    }

    pub fn log_summary(&self) {
        info!(
            "Pool data: {} | Database: {}@{}:{}/{} (max {} connections) | API: {} | Collect every {}s",
            self.paths.base.display(),
            self.database.user,
            self.database.host,
            self.database.port,
            self.database.database,
            self.database.max_connections,
            self.api_addr,
            self.collect_interval.as_secs()
        );
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
