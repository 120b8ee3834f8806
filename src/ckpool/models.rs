// src/ckpool/models.rs

use serde::{Deserialize, Serialize};

/// Pool-wide state as written by ckpool to `logs/pool/pool.status`.
///
/// The daemon spreads one logical record over several lines, so every
/// field defaults to zero when a line leaves it out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolStatus {
    pub runtime: i64,
    pub lastupdate: i64,
    #[serde(rename = "Users")]
    pub users: i64,
    #[serde(rename = "Workers")]
    pub workers: i64,
    #[serde(rename = "Idle")]
    pub idle: i64,
    #[serde(rename = "Disconnected")]
    pub disconnected: i64,
    pub hashrate1m: String,
    pub hashrate5m: String,
    pub hashrate15m: String,
    pub hashrate1hr: String,
    pub hashrate6hr: String,
    pub hashrate1d: String,
    pub hashrate7d: String,
    pub diff: f64,
    pub accepted: i64,
    pub rejected: i64,
    pub bestshare: i64,
    #[serde(rename = "SPS1m")]
    pub sps1m: f64,
    #[serde(rename = "SPS5m")]
    pub sps5m: f64,
    #[serde(rename = "SPS15m")]
    pub sps15m: f64,
    #[serde(rename = "SPS1h")]
    pub sps1h: f64,
}

/// One account document from `logs/users/<username>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub hashrate1m: String,
    pub hashrate5m: String,
    pub hashrate1hr: String,
    pub hashrate1d: String,
    pub hashrate7d: String,
    pub lastshare: i64,
    pub workers: i64,
    pub shares: i64,
    pub bestshare: f64,
    pub bestever: i64,
    pub authorised: i64,
    pub worker: Vec<Worker>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Worker {
    pub workername: String,
    pub hashrate1m: String,
    pub hashrate5m: String,
    pub hashrate1hr: String,
    pub hashrate1d: String,
    pub hashrate7d: String,
    pub lastshare: i64,
    pub shares: i64,
    pub bestshare: f64,
    pub bestever: i64,
}
