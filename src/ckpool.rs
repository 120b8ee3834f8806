use std::path::PathBuf;
use thiserror::Error;

pub mod models;
pub mod status;
pub mod users;

pub use models::{PoolStatus, User, Worker};

/// Failure reading one of ckpool's log files.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ReadError::NotFound(path)
        } else {
            ReadError::Io { path, source }
        }
    }
}
