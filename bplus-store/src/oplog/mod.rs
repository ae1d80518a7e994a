//! Operation log: an append-only, line-oriented record of store operations.
//!
//! Every logical operation on a `Db` produces exactly one `LogEvent`, which
//! is appended once the outcome of the operation is known. Sinks sit behind
//! the `OperationLog` trait so the file-backed log can be swapped for an
//! in-memory one in tests.

mod file_log;

pub use file_log::FileLog;

use crate::error::Result;
use crate::types::Key;
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;

/// One logged operation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A new key was inserted
    Inserted { key: Key, value: String },
    /// An existing key received a new value (by insert or update)
    Updated { key: Key, value: String },
    /// Update of an absent key
    UpdateFailed { key: Key },
    /// Successful lookup
    Found { key: Key, value: String },
    /// Lookup of an absent key
    FindFailed { key: Key },
    /// A key was removed
    Deleted { key: Key },
    /// Delete of an absent key
    DeleteFailed { key: Key },
    /// Full ordered scan
    Displayed,
    /// Bulk load finished
    Loaded { path: PathBuf },
    /// Every entry was dropped
    Cleared,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted { key, value } => write!(f, "Inserted: {key} -> {}", OneLine(value)),
            Self::Updated { key, value } => write!(f, "Updated: {key} -> {}", OneLine(value)),
            Self::UpdateFailed { key } => write!(f, "Update failed: {key}"),
            Self::Found { key, value } => write!(f, "Found: {key} -> {}", OneLine(value)),
            Self::FindFailed { key } => write!(f, "Find failed: {key}"),
            Self::Deleted { key } => write!(f, "Deleted: {key}"),
            Self::DeleteFailed { key } => write!(f, "Delete failed: {key}"),
            Self::Displayed => write!(f, "Displayed data."),
            Self::Loaded { path } => {
                let path = path.display().to_string();
                write!(f, "Loaded from file: {}", OneLine(&path))
            }
            Self::Cleared => write!(f, "Cleared."),
        }
    }
}

/// Displays a value with line breaks and backslashes escaped
///
/// Every event must stay on one line. Values without `\n`, `\r` or `\\`
/// print unchanged.
struct OneLine<'a>(&'a str);

impl fmt::Display for OneLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(pos) = rest.find(['\\', '\n', '\r']) {
            f.write_str(&rest[..pos])?;
            match rest.as_bytes()[pos] {
                b'\n' => f.write_str("\\n")?,
                b'\r' => f.write_str("\\r")?,
                _ => f.write_str("\\\\")?,
            }
            rest = &rest[pos + 1..];
        }
        f.write_str(rest)
    }
}

/// Sink for operation log lines
pub trait OperationLog: Send + Sync {
    /// Append one event as a single line
    fn append(&self, event: &LogEvent) -> Result<()>;
}

/// Log that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl OperationLog for NullLog {
    fn append(&self, _event: &LogEvent) -> Result<()> {
        Ok(())
    }
}

/// Log that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Create an empty in-memory log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines logged so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl OperationLog for MemoryLog {
    fn append(&self, event: &LogEvent) -> Result<()> {
        self.lines.lock().push(event.to_string());
        Ok(())
    }
}
