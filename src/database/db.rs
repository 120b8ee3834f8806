use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::{Duration, SystemTime};
use tokio_retry::{strategy::ExponentialBackoff, Retry};

use crate::ckpool::{PoolStatus, User, Worker};
use crate::config::DatabaseConfig;
use crate::database::schema::{Table, TABLES};
use crate::database::{
    HashrateHistory, Hashrates, PoolHashrates, PoolStatusRow, SqlValue, StatsSink, TableRow,
    UserRow, WorkerRow,
};
use crate::metrics::{DB_QUERIES_FAILED, DB_QUERIES_SUCCESS};

#[derive(Debug, Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(PgSslMode::Disable);

        // 500ms, 1s, 2s, 4s, 8s, then give up
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(Duration::from_secs(10))
            .take(5);
        let pool = Retry::spawn(retry_strategy, || {
            let options = options.clone();
            async move {
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        warn!("PostgreSQL at {}:{} not reachable: {}", config.host, config.port, e);
                        e
                    })
            }
        })
        .await
        .context(format!(
            "Failed to connect to PostgreSQL at {}:{}",
            config.host, config.port
        ))?;

        info!("Connected to PostgreSQL database {} at {}:{}", config.database, config.host, config.port);
        Ok(Db { pool })
    }

    /// Creates the history tables and their lookup indexes if missing.
    pub async fn migrate(&self) -> Result<()> {
        debug!("Initializing database tables");
        for table in TABLES {
            let start_time = SystemTime::now();
            let create = table.create_sql();
            let result = sqlx::query(&create)
                .execute(&self.pool)
                .await
                .context(format!("Failed to create {} table", table.name));
            record("create_table", start_time, result)?;

            for sql in table.index_sql() {
                let start_time = SystemTime::now();
                let result = sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .context(format!("Failed to create index on {} table", table.name));
                record("create_index", start_time, result)?;
            }
        }

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name::TEXT FROM information_schema.tables WHERE table_schema = current_schema()",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to verify database schema")?;
        for table in TABLES {
            if !tables.iter().any(|(name,)| name == table.name) {
                return Err(anyhow::anyhow!("Database schema missing table: {}", table.name));
            }
        }

        debug!("Database initialized successfully");
        Ok(())
    }

    async fn insert(&self, table: &'static Table, values: Vec<SqlValue>, query_type: &str) -> Result<()> {
        let start_time = SystemTime::now();
        let sql = table.insert_sql();
        let mut query = sqlx::query(&sql);
        for value in values {
            query = match value {
                SqlValue::BigInt(v) => query.bind(v),
                SqlValue::Double(v) => query.bind(v),
                SqlValue::Text(v) => query.bind(v),
            };
        }

        let result = query
            .execute(&self.pool)
            .await
            .context(format!("Failed to insert into {}", table.name));
        record(query_type, start_time, result).map(|_| ())
    }
}

fn record<T>(query_type: &str, start_time: SystemTime, result: Result<T>) -> Result<T> {
    let elapsed = start_time.elapsed().unwrap_or_default().as_secs_f64();
    debug!("{} query took {} seconds", query_type, elapsed);

    match result {
        Ok(value) => {
            DB_QUERIES_SUCCESS.with_label_values(&[query_type]).inc();
            Ok(value)
        }
        Err(e) => {
            DB_QUERIES_FAILED.with_label_values(&[query_type]).inc();
            Err(e)
        }
    }
}

#[async_trait]
impl StatsSink for Db {
    async fn insert_pool_status(&self, status: &PoolStatus) -> Result<()> {
        let row = PoolStatusRow(status);
        self.insert(row.table(), row.values(), "insert_pool_status").await
    }

    async fn insert_user(&self, username: &str, user: &User) -> Result<()> {
        let row = UserRow { username, user };
        self.insert(row.table(), row.values(), "insert_user").await
    }

    async fn insert_worker(&self, username: &str, worker: &Worker) -> Result<()> {
        let row = WorkerRow { username, worker };
        self.insert(row.table(), row.values(), "insert_worker").await
    }
}

#[async_trait]
impl HashrateHistory for Db {
    async fn pool_hashrates(&self) -> Result<Vec<PoolHashrates>> {
        let start_time = SystemTime::now();
        let result = sqlx::query_as::<_, PoolHashrates>(
            "SELECT hashrate1m, hashrate5m, hashrate15m, hashrate1hr, hashrate6hr, hashrate1d, hashrate7d, saved_at
             FROM pool_status
             ORDER BY saved_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pool hashrates");
        record("pool_hashrates", start_time, result)
    }

    async fn user_hashrates(&self, username: &str) -> Result<Vec<Hashrates>> {
        let start_time = SystemTime::now();
        let result = sqlx::query_as::<_, Hashrates>(
            "SELECT hashrate1m, hashrate5m, hashrate1hr, hashrate1d, hashrate7d, saved_at
             FROM users
             WHERE username = $1
             ORDER BY saved_at ASC, id ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .context(format!("Failed to fetch hashrates for user {}", username));
        record("user_hashrates", start_time, result)
    }

    async fn worker_hashrates(&self, username: &str, workername: &str) -> Result<Vec<Hashrates>> {
        let start_time = SystemTime::now();
        let result = sqlx::query_as::<_, Hashrates>(
            "SELECT hashrate1m, hashrate5m, hashrate1hr, hashrate1d, hashrate7d, saved_at
             FROM user_workers
             WHERE username = $1 AND workername = $2
             ORDER BY saved_at ASC, id ASC",
        )
        .bind(username)
        .bind(workername)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to fetch hashrates for worker {} of {}",
            workername, username
        ));
        record("worker_hashrates", start_time, result)
    }
}
