//! Collects the status logs a ckpool daemon writes to disk into PostgreSQL
//! history tables, and serves the live snapshot plus hashrate history over
//! HTTP.
//!
//! - `ckpool` - readers for `pool.status` and the per-user documents
//! - `database` - table layouts, the PostgreSQL store and the row writer
//! - `collector` - the recurring collection task
//! - `api` - read-only HTTP routes

pub mod api;
pub mod ckpool;
pub mod collector;
pub mod config;
pub mod database;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;
