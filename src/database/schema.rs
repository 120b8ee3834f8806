// src/database/schema.rs

//! Table layouts for the three append-only history tables.
//!
//! Every table gets an `id BIGSERIAL` identity and a `saved_at` collection
//! timestamp on top of the declared columns. Rows are only ever inserted.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    BigInt,
    Double,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::BigInt => "BIGINT",
            ColumnKind::Double => "DOUBLE PRECISION",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indexes: &'static [Index],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n    id BIGSERIAL PRIMARY KEY", self.name);
        for column in self.columns {
            let _ = write!(sql, ",\n    {} {}", column.name, column.kind.sql_type());
        }
        sql.push_str(",\n    saved_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP\n)");
        sql
    }

    pub fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index.name,
                    self.name,
                    index.columns.join(", ")
                )
            })
            .collect()
    }

    /// Positional insert over every declared column, in declaration order.
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

use ColumnKind::{BigInt, Double, Text};

pub static POOL_STATUS: Table = Table {
    name: "pool_status",
    columns: &[
        col("runtime", BigInt),
        col("lastupdate", BigInt),
        col("users", BigInt),
        col("workers", BigInt),
        col("idle", BigInt),
        col("disconnected", BigInt),
        col("hashrate1m", Text),
        col("hashrate5m", Text),
        col("hashrate15m", Text),
        col("hashrate1hr", Text),
        col("hashrate6hr", Text),
        col("hashrate1d", Text),
        col("hashrate7d", Text),
        col("diff", Double),
        col("accepted", BigInt),
        col("rejected", BigInt),
        col("bestshare", BigInt),
        col("sps1m", Double),
        col("sps5m", Double),
        col("sps15m", Double),
        col("sps1h", Double),
    ],
    indexes: &[Index {
        name: "idx_pool_status_saved_at",
        columns: &["saved_at"],
    }],
};

pub static USERS: Table = Table {
    name: "users",
    columns: &[
        col("username", Text),
        col("hashrate1m", Text),
        col("hashrate5m", Text),
        col("hashrate1hr", Text),
        col("hashrate1d", Text),
        col("hashrate7d", Text),
        col("lastshare", BigInt),
        col("workers", BigInt),
        col("shares", BigInt),
        col("bestshare", Double),
        col("bestever", BigInt),
        col("authorised", BigInt),
    ],
    indexes: &[Index {
        name: "idx_users_username_saved_at",
        columns: &["username", "saved_at"],
    }],
};

pub static USER_WORKERS: Table = Table {
    name: "user_workers",
    columns: &[
        col("username", Text),
        col("workername", Text),
        col("hashrate1m", Text),
        col("hashrate5m", Text),
        col("hashrate1hr", Text),
        col("hashrate1d", Text),
        col("hashrate7d", Text),
        col("lastshare", BigInt),
        col("shares", BigInt),
        col("bestshare", Double),
        col("bestever", BigInt),
    ],
    indexes: &[Index {
        name: "idx_user_workers_username_workername_saved_at",
        columns: &["username", "workername", "saved_at"],
    }],
};

pub static TABLES: [&Table; 3] = [&POOL_STATUS, &USERS, &USER_WORKERS];
