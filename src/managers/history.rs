//! Backup history ledger
//!
//! One pretty-printed JSON array per backup root (`backup-history.json`).
//! Every mutation rewrites the whole file through a sibling `.tmp` file and
//! a rename, so readers never see a half-written ledger. Writers are not
//! coordinated; one process at a time per backup root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const HISTORY_FILE: &str = "backup-history.json";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to access history file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("History file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Outcome of one backup attempt, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub target_name: String,
    pub timestamp: DateTime<Utc>,
    /// Empty for failed attempts
    pub file_name: String,
    pub file_size_bytes: u64,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BackupRecord {
    pub fn success(
        target_name: &str,
        timestamp: DateTime<Utc>,
        file_name: &str,
        file_size_bytes: u64,
        duration: Duration,
    ) -> Self {
        Self {
            target_name: target_name.to_string(),
            timestamp,
            file_name: file_name.to_string(),
            file_size_bytes,
            duration_ms: duration.as_millis() as u64,
            success: true,
            error_message: None,
        }
    }

    pub fn failure(
        target_name: &str,
        timestamp: DateTime<Utc>,
        duration: Duration,
        error_message: &str,
    ) -> Self {
        Self {
            target_name: target_name.to_string(),
            timestamp,
            file_name: String::new(),
            file_size_bytes: 0,
            duration_ms: duration.as_millis() as u64,
            success: false,
            error_message: Some(error_message.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store for the ledger at the root of a backup directory
    pub fn new(backup_directory: &Path) -> Self {
        Self {
            path: backup_directory.join(HISTORY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record
    pub fn append(&self, record: BackupRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)
    }

    /// All records, newest first
    pub fn all(&self) -> Result<Vec<BackupRecord>> {
        let mut records = self.load()?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Records of one target, newest first
    pub fn for_target(&self, target_name: &str) -> Result<Vec<BackupRecord>> {
        let mut records: Vec<_> = self
            .load()?
            .into_iter()
            .filter(|r| r.target_name == target_name)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Remove the record for `(target_name, file_name)`.
    ///
    /// Returns whether anything matched. The file is only rewritten on a match.
    pub fn remove(&self, target_name: &str, file_name: &str) -> Result<bool> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| !(r.target_name == target_name && r.file_name == file_name));

        if records.len() == before {
            return Ok(false);
        }

        self.save(&records)?;
        Ok(true)
    }

    fn load(&self) -> Result<Vec<BackupRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| HistoryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, records: &[BackupRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_vec_pretty(records).map_err(|source| HistoryError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        let write_tmp = || -> io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()
        };
        write_tmp().map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Wrote {} history records to {:?}", records.len(), self.path);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn io_error(&self, source: io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn sort_newest_first(records: &mut [BackupRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
