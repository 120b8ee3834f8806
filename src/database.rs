use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ckpool::{PoolStatus, User, Worker};
use crate::database::schema::{ColumnKind, Table, POOL_STATUS, USERS, USER_WORKERS};

pub mod db;
pub mod schema;
pub mod writer;

/// Append-only destination for collected records.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn insert_pool_status(&self, status: &PoolStatus) -> Result<()>;

    /// Inserts the top-level user fields only; workers are inserted separately.
    async fn insert_user(&self, username: &str, user: &User) -> Result<()>;

    async fn insert_worker(&self, username: &str, worker: &Worker) -> Result<()>;
}

/// Read side used by the HTTP routes. Rows come back oldest first.
#[async_trait]
pub trait HashrateHistory: Send + Sync {
    async fn pool_hashrates(&self) -> Result<Vec<PoolHashrates>>;

    async fn user_hashrates(&self, username: &str) -> Result<Vec<Hashrates>>;

    async fn worker_hashrates(&self, username: &str, workername: &str) -> Result<Vec<Hashrates>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PoolHashrates {
    pub hashrate1m: String,
    pub hashrate5m: String,
    pub hashrate15m: String,
    pub hashrate1hr: String,
    pub hashrate6hr: String,
    pub hashrate1d: String,
    pub hashrate7d: String,
    pub saved_at: NaiveDateTime,
}

/// User or worker hashrate sample.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Hashrates {
    pub hashrate1m: String,
    pub hashrate5m: String,
    pub hashrate1hr: String,
    pub hashrate1d: String,
    pub hashrate7d: String,
    pub saved_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    BigInt(i64),
    Double(f64),
    Text(String),
}

impl SqlValue {
    pub fn kind(&self) -> ColumnKind {
        match self {
            SqlValue::BigInt(_) => ColumnKind::BigInt,
            SqlValue::Double(_) => ColumnKind::Double,
            SqlValue::Text(_) => ColumnKind::Text,
        }
    }
}

/// Maps a record onto its table's columns, in declaration order.
pub trait TableRow {
    fn table(&self) -> &'static Table;
    fn values(&self) -> Vec<SqlValue>;
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_owned())
}

pub struct PoolStatusRow<'a>(pub &'a PoolStatus);

impl TableRow for PoolStatusRow<'_> {
    fn table(&self) -> &'static Table {
        &POOL_STATUS
    }

    fn values(&self) -> Vec<SqlValue> {
        let s = self.0;
        vec![
            SqlValue::BigInt(s.runtime),
            SqlValue::BigInt(s.lastupdate),
            SqlValue::BigInt(s.users),
            SqlValue::BigInt(s.workers),
            SqlValue::BigInt(s.idle),
            SqlValue::BigInt(s.disconnected),
            text(&s.hashrate1m),
            text(&s.hashrate5m),
            text(&s.hashrate15m),
            text(&s.hashrate1hr),
            text(&s.hashrate6hr),
            text(&s.hashrate1d),
            text(&s.hashrate7d),
            SqlValue::Double(s.diff),
            SqlValue::BigInt(s.accepted),
            SqlValue::BigInt(s.rejected),
            SqlValue::BigInt(s.bestshare),
            SqlValue::Double(s.sps1m),
            SqlValue::Double(s.sps5m),
            SqlValue::Double(s.sps15m),
            SqlValue::Double(s.sps1h),
        ]
    }
}

pub struct UserRow<'a> {
    pub username: &'a str,
    pub user: &'a User,
}

impl TableRow for UserRow<'_> {
    fn table(&self) -> &'static Table {
        &USERS
    }

    fn values(&self) -> Vec<SqlValue> {
        let u = self.user;
        vec![
            text(self.username),
            text(&u.hashrate1m),
            text(&u.hashrate5m),
            text(&u.hashrate1hr),
            text(&u.hashrate1d),
            text(&u.hashrate7d),
            SqlValue::BigInt(u.lastshare),
            SqlValue::BigInt(u.workers),
            SqlValue::BigInt(u.shares),
            SqlValue::Double(u.bestshare),
            SqlValue::BigInt(u.bestever),
            SqlValue::BigInt(u.authorised),
        ]
    }
}

pub struct WorkerRow<'a> {
    pub username: &'a str,
    pub worker: &'a Worker,
}

impl TableRow for WorkerRow<'_> {
    fn table(&self) -> &'static Table {
        &USER_WORKERS
    }

    fn values(&self) -> Vec<SqlValue> {
        let w = self.worker;
        vec![
            text(self.username),
            text(&w.workername),
            text(&w.hashrate1m),
            text(&w.hashrate5m),
            text(&w.hashrate1hr),
            text(&w.hashrate1d),
            text(&w.hashrate7d),
            SqlValue::BigInt(w.lastshare),
            SqlValue::BigInt(w.shares),
            SqlValue::Double(w.bestshare),
            SqlValue::BigInt(w.bestever),
        ]
    }
}
