//! File-backed operation log.
//!
//! Lines are appended to the end of the file and flushed one at a time, so
//! the file always ends on a complete line. Existing content is never
//! rewritten.

use super::{LogEvent, OperationLog};
use crate::error::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only log file
pub struct FileLog {
    /// The log file, opened in append mode
    file: Mutex<File>,
    /// Path the log was opened at
    path: PathBuf,
    /// Whether to sync after each line
    sync_on_write: bool,
}

impl FileLog {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
            sync_on_write,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OperationLog for FileLog {
    fn append(&self, event: &LogEvent) -> Result<()> {
        let line = format!("{event}\n");

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;

        if self.sync_on_write {
            file.sync_data()?;
        }

        Ok(())
    }
}
