// src/database/writer.rs

use log::{debug, warn};

use crate::ckpool::{PoolStatus, User};
use crate::database::schema::{POOL_STATUS, USERS, USER_WORKERS};
use crate::database::StatsSink;
use crate::metrics::{INSERTS_FAILED, ROWS_INSERTED};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UserWriteOutcome {
    pub user_written: bool,
    pub workers_written: usize,
    pub workers_failed: usize,
}

/// Appends one `pool_status` row. Failures are logged, never propagated.
pub async fn write_pool_status<S: StatsSink + ?Sized>(sink: &S, status: &PoolStatus) -> bool {
    match sink.insert_pool_status(status).await {
        Ok(()) => {
            ROWS_INSERTED.with_label_values(&[POOL_STATUS.name]).inc();
            true
        }
        Err(e) => {
            INSERTS_FAILED.with_label_values(&[POOL_STATUS.name]).inc();
            warn!("Error inserting pool status into database: {:#}", e);
            false
        }
    }
}

/// Appends the user row and one row per worker.
///
/// Each insert stands alone: a failed user row does not stop its workers,
/// and a failed worker row does not stop the workers after it.
pub async fn write_user<S: StatsSink + ?Sized>(sink: &S, username: &str, user: &User) -> UserWriteOutcome {
    let mut outcome = UserWriteOutcome::default();

    match sink.insert_user(username, user).await {
        Ok(()) => {
            ROWS_INSERTED.with_label_values(&[USERS.name]).inc();
            outcome.user_written = true;
        }
        Err(e) => {
            INSERTS_FAILED.with_label_values(&[USERS.name]).inc();
            warn!("Error inserting user data for {} into database: {:#}", username, e);
        }
    }

    for worker in &user.worker {
        match sink.insert_worker(username, worker).await {
            Ok(()) => {
                ROWS_INSERTED.with_label_values(&[USER_WORKERS.name]).inc();
                outcome.workers_written += 1;
            }
            Err(e) => {
                INSERTS_FAILED.with_label_values(&[USER_WORKERS.name]).inc();
                warn!(
                    "Error inserting worker data for {} of {} into database: {:#}",
                    worker.workername, username, e
                );
                outcome.workers_failed += 1;
            }
        }
    }

    debug!(
        "Stored user {}: user_row={} workers={} failed_workers={}",
        username, outcome.user_written, outcome.workers_written, outcome.workers_failed
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckpool::Worker;
    use crate::testing::MemoryStore;

    fn user_with_workers(names: &[&str]) -> User {
        User {
            hashrate1m: "10K".into(),
            worker: names
                .iter()
                .map(|name| Worker {
                    workername: name.to_string(),
                    shares: 3,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn writes_user_and_every_worker() {
        let store = MemoryStore::default();
        let user = user_with_workers(&["rig1", "rig2", "rig3"]);

        let outcome = write_user(&store, "alice", &user).await;

        assert_eq!(
            outcome,
            UserWriteOutcome { user_written: true, workers_written: 3, workers_failed: 0 }
        );
        assert_eq!(store.users().len(), 1);
        let workers = store.workers();
        assert_eq!(workers.len(), 3);
        assert!(workers.iter().all(|(owner, w)| owner == "alice" && w.shares == 3));
    }

    #[tokio::test]
    async fn failed_worker_does_not_stop_later_workers() {
        let store = MemoryStore::default();
        store.fail_worker("rig2");
        let user = user_with_workers(&["rig1", "rig2", "rig3"]);

        let outcome = write_user(&store, "alice", &user).await;

        assert_eq!(outcome.workers_written, 2);
        assert_eq!(outcome.workers_failed, 1);
        let names: Vec<String> = store.workers().into_iter().map(|(_, w)| w.workername).collect();
        assert_eq!(names, vec!["rig1", "rig3"]);
    }

    #[tokio::test]
    async fn failed_user_row_still_writes_workers() {
        let store = MemoryStore::default();
        store.fail_user("alice");
        let user = user_with_workers(&["rig1"]);

        let outcome = write_user(&store, "alice", &user).await;

        assert!(!outcome.user_written);
        assert_eq!(outcome.workers_written, 1);
        assert!(store.users().is_empty());
    }

    #[tokio::test]
    async fn pool_status_failure_is_reported() {
        let store = MemoryStore::default();
        assert!(write_pool_status(&store, &PoolStatus::default()).await);

        store.fail_pool_status();
        assert!(!write_pool_status(&store, &PoolStatus::default()).await);
        assert_eq!(store.pool_statuses().len(), 1);
    }
}
