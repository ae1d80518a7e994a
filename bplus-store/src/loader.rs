//! Bulk-load file reader.
//!
//! A bulk-load file holds one record per line: an integer key, a single
//! space, then the value running to the end of the line. The value may be
//! wrapped in a pair of double quotes, which are stripped. There is no
//! escaping; a quote inside the value is kept as is.
//!
//! ```text
//! 10 plain value
//! 20 "quoted value"
//! ```
//!
//! Blank lines are ignored. Lines whose key does not parse, or that are not
//! valid UTF-8, are handled according to the `LoadPolicy`.

use crate::error::{Result, StoreError};
use crate::types::{Key, Value};
use std::io::BufRead;
use std::time::Duration;

/// What to do with a line that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Skip the line, warn, and keep loading
    #[default]
    Skip,
    /// Fail the whole load before anything is inserted
    Abort,
}

/// One parsed line of a bulk-load file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the source
    pub line: usize,
    pub key: Key,
    pub value: Value,
}

/// Records read from a bulk-load source, in file order
#[derive(Debug, Default)]
pub struct Parsed {
    pub records: Vec<Record>,
    /// Malformed lines skipped under `LoadPolicy::Skip`
    pub skipped: usize,
}

/// Outcome of a bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records whose key was new
    pub inserted: usize,
    /// Records that replaced the value of an existing key
    pub overwritten: usize,
    /// Malformed lines skipped
    pub skipped: usize,
    /// Time spent inserting
    pub elapsed: Duration,
}

/// Parse a single line
///
/// Returns `Ok(None)` for a blank line and `Err(reason)` for a malformed one.
pub fn parse_record(line: &str) -> std::result::Result<Option<(Key, Value)>, String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.is_empty() {
        return Ok(None);
    }

    let Some((key_token, value)) = line.split_once(' ') else {
        return Err(format!("missing value after key `{line}`"));
    };
    let key = key_token
        .parse::<Key>()
        .map_err(|e| format!("invalid key `{key_token}`: {e}"))?;

    Ok(Some((key, unquote(value).to_string())))
}

/// Strip one pair of surrounding double quotes
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Read every record from a source
pub fn read_records<R: BufRead>(mut reader: R, policy: LoadPolicy) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) => parse_record(line),
            Err(e) => Err(format!("line is not valid UTF-8: {e}")),
        };

        match outcome {
            Ok(Some((key, value))) => parsed.records.push(Record {
                line: line_no,
                key,
                value,
            }),
            Ok(None) => {}
            Err(reason) => match policy {
                LoadPolicy::Skip => {
                    tracing::warn!(line = line_no, %reason, "skipping malformed record");
                    parsed.skipped += 1;
                }
                LoadPolicy::Abort => return Err(StoreError::malformed(line_no, reason)),
            },
        }
    }

    Ok(parsed)
}
