// src/ckpool/status.rs

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::ckpool::models::PoolStatus;
use crate::ckpool::ReadError;

/// Result of folding the lines of a `pool.status` file into one record.
#[derive(Debug, Default)]
pub struct StatusMerge {
    pub fields: Map<String, Value>,
    pub merged_lines: usize,
    pub skipped_lines: usize,
    pub dropped_fields: usize,
}

impl StatusMerge {
    /// `None` when no line could be merged.
    pub fn into_status(self) -> Result<Option<PoolStatus>, serde_json::Error> {
        if self.merged_lines == 0 {
            return Ok(None);
        }
        serde_json::from_value(Value::Object(self.fields)).map(Some)
    }
}

/// Overlays every parseable line onto the previous ones; the last line
/// that sets a key wins.
///
/// Lines are split on raw bytes, so a line that is not valid UTF-8 only
/// costs that line. A key whose value has the wrong type is dropped on its
/// own and the rest of its line still merges.
pub fn merge_status_lines(text: impl AsRef<[u8]>) -> StatusMerge {
    let mut merge = StatusMerge::default();

    for (index, line) in text.as_ref().split(|b| *b == b'\n').enumerate() {
        let line = trim_line(line);
        if line.is_empty() {
            continue;
        }
        let fields: Map<String, Value> = match serde_json::from_slice(line) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Skipping pool.status line {}: {}", index + 1, e);
                merge.skipped_lines += 1;
                continue;
            }
        };
        for (key, value) in fields {
            match check_status_field(&key, &value) {
                Ok(()) => {
                    merge.fields.insert(key, value);
                }
                Err(e) => {
                    warn!("Dropping pool.status field {} on line {}: {}", key, index + 1, e);
                    merge.dropped_fields += 1;
                }
            }
        }
        merge.merged_lines += 1;
    }

    merge
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &line[start..end]
}

// Unknown keys pass; known keys must deserialize into their field type.
fn check_status_field(key: &str, value: &Value) -> Result<(), serde_json::Error> {
    let mut single = Map::with_capacity(1);
    single.insert(key.to_string(), value.clone());
    PoolStatus::deserialize(&Value::Object(single)).map(|_| ())
}

pub async fn read_pool_status(path: &Path) -> Result<Option<PoolStatus>, ReadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReadError::io(path, e))?;

    let merge = merge_status_lines(&bytes);
    debug!(
        "Merged {} lines from {} ({} skipped, {} fields dropped)",
        merge.merged_lines,
        path.display(),
        merge.skipped_lines,
        merge.dropped_fields
    );
    if merge.skipped_lines > 0 {
        crate::metrics::STATUS_LINES_SKIPPED.inc_by(merge.skipped_lines as u64);
    }

    merge.into_status().map_err(|source| ReadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
