//! File-backed storage for the usage record.
//!
//! The file holds one JSON object, `{"count": n, "date": "YYYY-MM-DD"}`,
//! rewritten wholesale on every write. Writes go to a temporary file in the
//! same directory which is then renamed over the target, so a crash leaves
//! either the old record or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::record::UsageRecord;

/// Durable home of the usage record.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the raw persisted record. `Ok(None)` when no file exists.
    pub fn load(&self) -> Result<Option<UsageRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::StorageRead {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::StorageCorrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    /// Record as seen on `today`.
    ///
    /// Never fails: missing, unreadable or corrupt storage reads as a fresh
    /// record, and so does a record from another day. Storage is not touched.
    pub fn read(&self, today: NaiveDate) -> UsageRecord {
        match self.load() {
            Ok(Some(record)) => {
                if record.date != today {
                    debug!(stored = %record.date, today = %today, "Usage record is from another day");
                }
                record.as_of(today)
            }
            Ok(None) => UsageRecord::fresh(today),
            Err(e) => {
                warn!(error = %e.format_for_log(), "Usage ledger unreadable, treating as zero");
                UsageRecord::fresh(today)
            }
        }
    }

    /// Persist `{count, today}`, replacing whatever was stored.
    pub fn write(&self, count: u32, today: NaiveDate) -> Result<()> {
        let record = UsageRecord::new(count, today);
        let write_err = |message: String| Error::StorageWrite {
            path: self.path.clone(),
            message,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
        let body = serde_json::to_vec(&record).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(&body).map_err(|e| write_err(e.to_string()))?;
        tmp.as_file().sync_all().map_err(|e| write_err(e.to_string()))?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error.to_string()))?;

        debug!(count, date = %today, path = %self.path.display(), "Usage record written");
        Ok(())
    }
}
