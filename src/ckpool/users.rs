// src/ckpool/users.rs

use log::{debug, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::ckpool::models::User;
use crate::ckpool::ReadError;
use crate::metrics::USER_FILES_SKIPPED;

#[derive(Debug)]
pub struct UserEntry {
    pub username: String,
    pub user: User,
}

/// Lazily reads the per-user documents in ckpool's `logs/users` directory.
///
/// The file name is the username. Files are read one at a time as `next`
/// is awaited; unreadable or malformed files are logged and skipped.
#[derive(Debug)]
pub struct UserFiles {
    pending: VecDeque<(String, PathBuf)>,
    skipped: usize,
}

impl UserFiles {
    pub async fn open(dir: &Path) -> Result<Self, ReadError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ReadError::io(dir, e))?;

        let mut files = Vec::new();
        let mut skipped = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ReadError::io(dir, e))? {
            let path = entry.path();
            let is_file = match entry.file_type().await {
                Ok(file_type) if file_type.is_symlink() => tokio::fs::metadata(&path)
                    .await
                    .map(|meta| meta.is_file()),
                Ok(file_type) => Ok(file_type.is_file()),
                Err(e) => Err(e),
            };
            match is_file {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Ignoring non-regular entry {}", path.display());
                    continue;
                }
                Err(e) => {
                    warn!("Error inspecting user file {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            }
            match entry.file_name().into_string() {
                Ok(username) => files.push((username, path)),
                Err(name) => {
                    warn!("Skipping user file with non UTF-8 name {:?}", name);
                    skipped += 1;
                }
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("Found {} user files in {}", files.len(), dir.display());

        USER_FILES_SKIPPED.inc_by(skipped as u64);
        Ok(Self {
            pending: files.into(),
            skipped,
        })
    }

    pub async fn next(&mut self) -> Option<UserEntry> {
        while let Some((username, path)) = self.pending.pop_front() {
            match read_user_path(&path).await {
                Ok(user) => return Some(UserEntry { username, user }),
                Err(e) => {
                    warn!("Skipping user file {}: {}", username, e);
                    self.skipped += 1;
                    USER_FILES_SKIPPED.inc();
                }
            }
        }
        None
    }

    /// Files skipped so far, including those rejected while listing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

pub async fn read_user_file(dir: &Path, username: &str) -> Result<User, ReadError> {
    read_user_path(&dir.join(username)).await
}

async fn read_user_path(path: &Path) -> Result<User, ReadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReadError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ReadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    async fn collect(files: &mut UserFiles) -> Vec<UserEntry> {
        let mut out = Vec::new();
        while let Some(entry) = files.next().await {
            out.push(entry);
        }
        out
    }

    #[tokio::test]
    async fn malformed_file_is_skipped_and_others_are_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "alice", r#"{"hashrate1m":"1K"}"#);
        write(dir.path(), "bob", "{ not json");
        write(dir.path(), "carol", r#"{"hashrate1m":"3K"}"#);

        let mut files = UserFiles::open(dir.path()).await.unwrap();
        let entries = collect(&mut files).await;

        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert_eq!(entries[1].user.hashrate1m, "3K");
        assert_eq!(files.skipped(), 1);
    }

    #[tokio::test]
    async fn subdirectories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        write(&dir.path().join("archive"), "old", r#"{"shares":1}"#);
        write(dir.path(), "dave", r#"{"shares":2}"#);

        let mut files = UserFiles::open(dir.path()).await.unwrap();
        assert_eq!(files.remaining(), 1);

        let entries = collect(&mut files).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].username, "dave");
        assert_eq!(entries[0].user.shares, 2);
        assert_eq!(files.skipped(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn only_regular_files_and_links_to_them_are_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "gina", r#"{"shares":5}"#);
        std::os::unix::fs::symlink(dir.path().join("gina"), dir.path().join("hank")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("ivan")).unwrap();
        let _socket = std::os::unix::net::UnixListener::bind(dir.path().join("jill")).unwrap();

        let mut files = UserFiles::open(dir.path()).await.unwrap();
        assert_eq!(files.remaining(), 2);

        let entries = collect(&mut files).await;
        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["gina", "hank"]);
        assert_eq!(entries[1].user.shares, 5);
        assert_eq!(files.skipped(), 1);
    }

    #[tokio::test]
    async fn workers_are_exposed_with_the_user() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "erin",
            r#"{"hashrate1m":"10K","worker":[{"workername":"rig1","shares":3}]}"#,
        );

        let mut files = UserFiles::open(dir.path()).await.unwrap();
        let entry = files.next().await.unwrap();
        assert_eq!(entry.user.worker.len(), 1);
        assert_eq!(entry.user.worker[0].workername, "rig1");
        assert_eq!(entry.user.worker[0].shares, 3);
        assert!(files.next().await.is_none());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UserFiles::open(&dir.path().join("users")).await.unwrap_err();
        assert!(matches!(err, ReadError::NotFound(_)));
    }

    #[tokio::test]
    async fn read_user_file_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "frank", "[");

        assert!(matches!(
            read_user_file(dir.path(), "nobody").await,
            Err(ReadError::NotFound(_))
        ));
        assert!(matches!(
            read_user_file(dir.path(), "frank").await,
            Err(ReadError::Parse { .. })
        ));
    }
}
