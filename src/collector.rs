// src/collector.rs

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::ckpool::status::read_pool_status;
use crate::ckpool::users::UserFiles;
use crate::config::PoolPaths;
use crate::database::writer::{write_pool_status, write_user};
use crate::database::StatsSink;
use crate::metrics::{COLLECTOR_TICKS, LAST_TICK_SECONDS};

/// What one collection tick managed to persist.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub pool_status_written: bool,
    pub users_seen: usize,
    pub users_written: usize,
    pub users_failed: usize,
    pub workers_written: usize,
    pub workers_failed: usize,
    pub files_skipped: usize,
}

/// Periodically copies ckpool's status logs into the history tables.
pub struct Collector<S: ?Sized> {
    sink: Arc<S>,
    pool_status_path: PathBuf,
    users_dir: PathBuf,
    interval: Duration,
}

impl<S: StatsSink + ?Sized> Collector<S> {
    pub fn new(sink: Arc<S>, paths: &PoolPaths, interval: Duration) -> Self {
        Self {
            sink,
            pool_status_path: paths.pool_status.clone(),
            users_dir: paths.users_dir.clone(),
            interval,
        }
    }

    /// Runs one tick: the pool snapshot first, then every user file.
    /// A failure in the first phase never prevents the second.
    pub async fn collect_once(&self) -> TickReport {
        let mut report = TickReport::default();

        match read_pool_status(&self.pool_status_path).await {
            Ok(Some(status)) => {
                report.pool_status_written = write_pool_status(&*self.sink, &status).await;
            }
            Ok(None) => {
                warn!(
                    "No parseable lines in {}, skipping pool status",
                    self.pool_status_path.display()
                );
            }
            Err(e) => warn!("Error reading pool status: {}", e),
        }

        let mut files = match UserFiles::open(&self.users_dir).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Error walking users directory: {}", e);
                return report;
            }
        };

        debug!("{} user files queued", files.remaining());
        while let Some(entry) = files.next().await {
            report.users_seen += 1;
            let outcome = write_user(&*self.sink, &entry.username, &entry.user).await;
            if outcome.user_written {
                report.users_written += 1;
            } else {
                report.users_failed += 1;
            }
            report.workers_written += outcome.workers_written;
            report.workers_failed += outcome.workers_failed;
        }
        report.files_skipped = files.skipped();

        report
    }

    /// Collects immediately, then again `interval` after each tick
    /// finishes, until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Collector started | pool.status: {} | users: {} | interval: {}s",
            self.pool_status_path.display(),
            self.users_dir.display(),
            self.interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let start_time = Instant::now();
            let report = self.collect_once().await;
            let elapsed = start_time.elapsed();
            COLLECTOR_TICKS.inc();
            LAST_TICK_SECONDS.set(elapsed.as_secs_f64());
            info!(
                "Collection tick done in {:.2}s | pool_status={} users={}/{} (failed {}) workers={} (failed {}) skipped_files={}",
                elapsed.as_secs_f64(),
                report.pool_status_written,
                report.users_written,
                report.users_seen,
                report.users_failed,
                report.workers_written,
                report.workers_failed,
                report.files_skipped
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!("Collector stopped");
    }
}

/// Asks a running collector to stop. Returns `false` when it has already
/// exited and nothing was listening.
pub fn signal_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    if shutdown.send(true).is_err() {
        debug!("Collector already exited before shutdown");
        return false;
    }
    true
}
