//! In-memory store with failure injection, for tests that need a sink or
//! history without PostgreSQL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::ckpool::{PoolStatus, User, Worker};
use crate::database::{HashrateHistory, Hashrates, PoolHashrates, StatsSink};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pool_statuses: Mutex<Vec<(PoolStatus, NaiveDateTime)>>,
    users: Mutex<Vec<(String, User, NaiveDateTime)>>,
    workers: Mutex<Vec<(String, Worker, NaiveDateTime)>>,
    writes: Mutex<i64>,
    fail_pool_status: AtomicBool,
    fail_reads: AtomicBool,
    failing_users: Mutex<HashSet<String>>,
    failing_workers: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn fail_pool_status(&self) {
        self.fail_pool_status.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_user(&self, username: &str) {
        self.failing_users.lock().unwrap().insert(username.to_owned());
    }

    pub fn fail_worker(&self, workername: &str) {
        self.failing_workers.lock().unwrap().insert(workername.to_owned());
    }

    pub fn pool_statuses(&self) -> Vec<PoolStatus> {
        self.pool_statuses.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn users(&self) -> Vec<(String, User)> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .map(|(name, user, _)| (name.clone(), user.clone()))
            .collect()
    }

    pub fn workers(&self) -> Vec<(String, Worker)> {
        self.workers
            .lock()
            .unwrap()
            .iter()
            .map(|(name, worker, _)| (name.clone(), worker.clone()))
            .collect()
    }

    // Strictly increasing so history ordering is observable.
    fn saved_at(&self) -> NaiveDateTime {
        let mut writes = self.writes.lock().unwrap();
        *writes += 1;
        Utc::now().naive_utc() + Duration::milliseconds(*writes)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("injected read failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsSink for MemoryStore {
    async fn insert_pool_status(&self, status: &PoolStatus) -> Result<()> {
        if self.fail_pool_status.load(Ordering::SeqCst) {
            return Err(anyhow!("injected pool_status failure"));
        }
        let saved_at = self.saved_at();
        self.pool_statuses.lock().unwrap().push((status.clone(), saved_at));
        Ok(())
    }

    async fn insert_user(&self, username: &str, user: &User) -> Result<()> {
        if self.failing_users.lock().unwrap().contains(username) {
            return Err(anyhow!("injected failure for user {}", username));
        }
        let saved_at = self.saved_at();
        self.users.lock().unwrap().push((username.to_owned(), user.clone(), saved_at));
        Ok(())
    }

    async fn insert_worker(&self, username: &str, worker: &Worker) -> Result<()> {
        if self.failing_workers.lock().unwrap().contains(&worker.workername) {
            return Err(anyhow!("injected failure for worker {}", worker.workername));
        }
        let saved_at = self.saved_at();
        self.workers.lock().unwrap().push((username.to_owned(), worker.clone(), saved_at));
        Ok(())
    }
}

#[async_trait]
impl HashrateHistory for MemoryStore {
    async fn pool_hashrates(&self) -> Result<Vec<PoolHashrates>> {
        self.check_reads()?;
        Ok(self
            .pool_statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(s, saved_at)| PoolHashrates {
                hashrate1m: s.hashrate1m.clone(),
                hashrate5m: s.hashrate5m.clone(),
                hashrate15m: s.hashrate15m.clone(),
                hashrate1hr: s.hashrate1hr.clone(),
                hashrate6hr: s.hashrate6hr.clone(),
                hashrate1d: s.hashrate1d.clone(),
                hashrate7d: s.hashrate7d.clone(),
                saved_at: *saved_at,
            })
            .collect())
    }

    async fn user_hashrates(&self, username: &str) -> Result<Vec<Hashrates>> {
        self.check_reads()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == username)
            .map(|(_, u, saved_at)| Hashrates {
                hashrate1m: u.hashrate1m.clone(),
                hashrate5m: u.hashrate5m.clone(),
                hashrate1hr: u.hashrate1hr.clone(),
                hashrate1d: u.hashrate1d.clone(),
                hashrate7d: u.hashrate7d.clone(),
                saved_at: *saved_at,
            })
            .collect())
    }

    async fn worker_hashrates(&self, username: &str, workername: &str) -> Result<Vec<Hashrates>> {
        self.check_reads()?;
        Ok(self
            .workers
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, w, _)| name == username && w.workername == workername)
            .map(|(_, w, saved_at)| Hashrates {
                hashrate1m: w.hashrate1m.clone(),
                hashrate5m: w.hashrate5m.clone(),
                hashrate1hr: w.hashrate1hr.clone(),
                hashrate1d: w.hashrate1d.clone(),
                hashrate7d: w.hashrate7d.clone(),
                saved_at: *saved_at,
            })
            .collect())
    }
}
