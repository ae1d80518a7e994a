//! # B+ Tree Record Store
//!
//! An in-memory ordered key-value store indexed by a B+ tree whose leaves are
//! linked for cheap in-order traversal.
//!
//! ## Architecture
//!
//! - **B+ Tree Layer** (`btree`): nodes, node arena, insert/split propagation,
//!   lookups, deletes and leaf-chain iteration
//! - **Operation Log** (`oplog`): append-only record of every operation
//! - **Loader** (`loader`): bulk-load file parsing
//! - **Db**: the public handle tying them together behind a single lock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bplus_store::{Config, Db};
//!
//! let db = Db::open(Config::new().log_path("log.txt"))?;
//!
//! db.insert(10, "ten");
//! let value = db.find(10)?;
//! db.update(10, "TEN")?;
//! db.delete(10)?;
//!
//! db.load_file("100.txt")?;
//! for (key, value) in db.scan() {
//!     println!("{key} => {value}");
//! }
//! ```

pub mod btree;
pub mod error;
pub mod loader;
pub mod oplog;
pub mod types;

pub use error::{Result, StoreError};
pub use types::{Key, NodeId, TreeConfig, Value, DEFAULT_ORDER};

// Re-export main public API
pub use btree::BPlusTree;
pub use loader::{LoadPolicy, LoadReport};
pub use oplog::{FileLog, LogEvent, MemoryLog, NullLog, OperationLog};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Store configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Path of the operation log (None disables logging)
    pub log_path: Option<PathBuf>,
    /// Whether to sync the log after each line (default: false)
    pub sync_on_write: bool,
    /// Tree configuration
    pub tree_config: TreeConfig,
    /// Handling of malformed bulk-load lines (default: skip)
    pub load_policy: LoadPolicy,
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Append operations to a log file
    pub fn log_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Enable sync on write for durability of the log
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Set tree configuration
    pub fn tree_config(mut self, config: TreeConfig) -> Self {
        self.tree_config = config;
        self
    }

    /// Set tree order
    pub fn order(mut self, order: usize) -> Self {
        self.tree_config = TreeConfig::new(order);
        self
    }

    /// Set bulk-load policy
    pub fn load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }
}

/// Node snapshot for visualization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Node id
    pub node_id: u32,
    /// Whether this is a leaf node
    pub is_leaf: bool,
    /// Keys in this node
    pub keys: Vec<String>,
    /// Values (only for leaf nodes)
    pub values: Vec<String>,
    /// Next leaf in the chain (only for leaf nodes)
    pub next: Option<u32>,
    /// Child nodes (only for internal nodes)
    pub children: Vec<TreeNode>,
}

/// Main store handle providing ordered key-value storage backed by a B+ tree
///
/// The tree itself is single-threaded; `Db` guards it with one reader-writer
/// lock so a handle can be shared. Every operation appends exactly one line
/// to the operation log after its outcome is known, while still holding the
/// lock, so log order always matches the order mutations took effect.
pub struct Db {
    tree: RwLock<BPlusTree<Key, Value>>,
    log: Arc<dyn OperationLog>,
    config: Config,
}

impl Db {
    /// Create a store, opening the configured log file if any
    pub fn open(config: Config) -> Result<Self> {
        let log: Arc<dyn OperationLog> = match &config.log_path {
            Some(path) => Arc::new(FileLog::open(path, config.sync_on_write)?),
            None => Arc::new(NullLog),
        };
        Self::with_log(config, log)
    }

    /// Create a store writing to a caller-supplied log
    pub fn with_log(config: Config, log: Arc<dyn OperationLog>) -> Result<Self> {
        let tree = BPlusTree::with_config(config.tree_config)?;

        Ok(Self {
            tree: RwLock::new(tree),
            log,
            config,
        })
    }

    /// Get the current tree configuration
    pub fn tree_config(&self) -> TreeConfig {
        self.config.tree_config
    }

    /// Insert a key-value pair, replacing the value if the key exists
    pub fn insert(&self, key: Key, value: impl Into<Value>) {
        let value = value.into();
        let mut tree = self.tree.write();
        let previous = tree.insert(key, value.clone());

        self.record(&match previous {
            Some(_) => LogEvent::Updated { key, value },
            None => LogEvent::Inserted { key, value },
        });
    }

    /// Get the value of a key
    ///
    /// Returns `StoreError::KeyNotFound` if the key does not exist.
    pub fn find(&self, key: Key) -> Result<Value> {
        let tree = self.tree.read();

        match tree.get(&key).cloned() {
            Some(value) => {
                self.record(&LogEvent::Found {
                    key,
                    value: value.clone(),
                });
                Ok(value)
            }
            None => {
                self.record(&LogEvent::FindFailed { key });
                Err(StoreError::KeyNotFound(key))
            }
        }
    }

    /// Replace the value of an existing key
    ///
    /// Returns `StoreError::KeyNotFound`, leaving the store unchanged, if the
    /// key does not exist.
    pub fn update(&self, key: Key, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let mut tree = self.tree.write();

        match tree.update(&key, value.clone()) {
            Some(_) => {
                self.record(&LogEvent::Updated { key, value });
                Ok(())
            }
            None => {
                self.record(&LogEvent::UpdateFailed { key });
                Err(StoreError::KeyNotFound(key))
            }
        }
    }

    /// Delete a key, returning its value
    ///
    /// Returns `StoreError::KeyNotFound` if the key does not exist. Leaves
    /// are not rebalanced after a delete.
    pub fn delete(&self, key: Key) -> Result<Value> {
        let mut tree = self.tree.write();

        match tree.remove(&key) {
            Some(value) => {
                self.record(&LogEvent::Deleted { key });
                Ok(value)
            }
            None => {
                self.record(&LogEvent::DeleteFailed { key });
                Err(StoreError::KeyNotFound(key))
            }
        }
    }

    /// Check if a key exists (not logged)
    pub fn contains(&self, key: Key) -> bool {
        self.tree.read().contains_key(&key)
    }

    /// All key-value pairs in key order
    pub fn scan(&self) -> Vec<(Key, Value)> {
        let tree = self.tree.read();
        let entries: Vec<(Key, Value)> = tree.iter().map(|(k, v)| (*k, v.clone())).collect();
        self.record(&LogEvent::Displayed);
        entries
    }

    /// Key-value pairs with `start <= key < end`, in key order (not logged)
    ///
    /// Both bounds are optional; `None` means unbounded on that side.
    pub fn range(&self, start: Option<Key>, end: Option<Key>) -> Vec<(Key, Value)> {
        let tree = self.tree.read();
        let iter = match start {
            Some(start) => tree.range_from(&start),
            None => tree.iter(),
        };
        iter.take_while(|(k, _)| end.map_or(true, |end| **k < end))
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Bulk-load records from a file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let report = self.load_reader(BufReader::new(file))?;

        self.record(&LogEvent::Loaded {
            path: path.to_path_buf(),
        });
        Ok(report)
    }

    /// Bulk-load records from any line-oriented source
    ///
    /// Records are inserted one at a time in source order, each logged like
    /// a plain insert. The write lock is held for the whole load. Under `LoadPolicy::Abort` a malformed line fails the
    /// load before any record is inserted.
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<LoadReport> {
        let parsed = loader::read_records(reader, self.config.load_policy)?;
        let mut report = LoadReport {
            skipped: parsed.skipped,
            ..LoadReport::default()
        };

        let start = Instant::now();
        let mut tree = self.tree.write();
        for record in parsed.records {
            let previous = tree.insert(record.key, record.value.clone());
            let event = match previous {
                Some(_) => {
                    report.overwritten += 1;
                    LogEvent::Updated {
                        key: record.key,
                        value: record.value,
                    }
                }
                None => {
                    report.inserted += 1;
                    LogEvent::Inserted {
                        key: record.key,
                        value: record.value,
                    }
                }
            };
            self.record(&event);
        }
        drop(tree);
        report.elapsed = start.elapsed();

        tracing::debug!(
            inserted = report.inserted,
            overwritten = report.overwritten,
            skipped = report.skipped,
            "bulk load finished"
        );
        Ok(report)
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut tree = self.tree.write();
        tree.clear();
        self.record(&LogEvent::Cleared);
    }

    /// Get statistics about the store
    pub fn stats(&self) -> DbStats {
        let tree = self.tree.read();
        DbStats {
            entries: tree.len(),
            tree_height: tree.height(),
            node_count: tree.node_count(),
            leaf_count: tree.leaf_count(),
            order: tree.config().order,
        }
    }

    /// Export the tree structure for visualization
    pub fn export_tree(&self) -> Option<TreeNode> {
        self.tree.read().export()
    }

    /// Verify the structural invariants of the tree
    pub fn check(&self) -> Result<()> {
        self.tree.read().check_invariants()
    }

    /// Append an event to the operation log
    ///
    /// The operation it describes has already taken effect, so a failing
    /// sink is reported but does not fail the operation.
    fn record(&self, event: &LogEvent) {
        if let Err(e) = self.log.append(event) {
            tracing::error!(error = %e, event = %event, "failed to append to operation log");
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStats {
    /// Number of key-value pairs
    pub entries: usize,
    /// Height of the tree
    pub tree_height: usize,
    /// Nodes owned by the tree, including leaves emptied by deletes
    pub node_count: usize,
    /// Leaves in the leaf chain
    pub leaf_count: usize,
    /// Tree order
    pub order: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    fn memory_db(config: Config) -> (Db, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let db = Db::with_log(config, log.clone()).unwrap();
        (db, log)
    }

    #[test]
    fn test_basic_operations() -> Result<()> {
        let (db, log) = memory_db(Config::new());

        db.insert(1, "value1");
        assert_eq!(db.find(1)?, "value1");

        db.insert(1, "value2");
        assert_eq!(db.find(1)?, "value2");

        db.update(1, "value3")?;
        assert_eq!(db.find(1)?, "value3");

        assert_eq!(db.delete(1)?, "value3");
        assert!(db.find(1).unwrap_err().is_not_found());

        assert_eq!(
            log.lines(),
            vec![
                "Inserted: 1 -> value1",
                "Found: 1 -> value1",
                "Updated: 1 -> value2",
                "Found: 1 -> value2",
                "Updated: 1 -> value3",
                "Found: 1 -> value3",
                "Deleted: 1",
                "Find failed: 1",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_not_found_on_empty_store() {
        let (db, log) = memory_db(Config::new());

        assert!(matches!(db.find(5), Err(StoreError::KeyNotFound(5))));
        assert!(matches!(db.update(5, "x"), Err(StoreError::KeyNotFound(5))));
        assert!(matches!(db.delete(5), Err(StoreError::KeyNotFound(5))));
        assert_eq!(db.export_tree(), None);
        assert!(db.scan().is_empty());

        assert_eq!(
            log.lines(),
            vec![
                "Find failed: 5",
                "Update failed: 5",
                "Delete failed: 5",
                "Displayed data.",
            ]
        );
    }

    #[test]
    fn test_scan_and_range() {
        let (db, _log) = memory_db(Config::new());
        for k in [50, 10, 40, 20, 30] {
            db.insert(k, format!("v{k}"));
        }

        let keys: Vec<Key> = db.scan().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![10, 20, 30, 40, 50]);

        let range = db.range(Some(20), Some(40));
        assert_eq!(range, vec![(20, "v20".to_string()), (30, "v30".to_string())]);
        assert_eq!(db.range(None, Some(15)).len(), 1);
        assert_eq!(db.range(Some(45), None).len(), 1);
        assert!(db.contains(30));
        assert!(!db.contains(35));
    }

    #[test]
    fn test_load_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let data = dir.path().join("100.txt");
        let mut file = File::create(&data)?;
        writeln!(file, "3 \"three\"")?;
        writeln!(file, "1 one")?;
        writeln!(file, "oops")?;
        writeln!(file, "2 two words")?;
        writeln!(file, "1 uno")?;
        drop(file);

        let log_path = dir.path().join("log.txt");
        let db = Db::open(Config::new().log_path(&log_path))?;
        let report = db.load_file(&data)?;

        assert_eq!(report.inserted, 3);
        assert_eq!(report.overwritten, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            db.scan(),
            vec![
                (1, "uno".to_string()),
                (2, "two words".to_string()),
                (3, "three".to_string()),
            ]
        );

        let log = std::fs::read_to_string(&log_path)?;
        let expected = format!(
            "Inserted: 3 -> three\nInserted: 1 -> one\nInserted: 2 -> two words\n\
             Updated: 1 -> uno\nLoaded from file: {}\nDisplayed data.\n",
            data.display()
        );
        assert_eq!(log, expected);
        Ok(())
    }

    #[test]
    fn test_load_abort_inserts_nothing() {
        let (db, log) = memory_db(Config::new().load_policy(LoadPolicy::Abort));
        let err = db.load_reader(Cursor::new("1 one\nbad\n2 two\n")).unwrap_err();

        assert!(matches!(err, StoreError::MalformedRecord { line: 2, .. }));
        assert_eq!(db.stats().entries, 0);
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let (db, log) = memory_db(Config::new());
        let err = db.load_file("/nonexistent/records.txt").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_stats_and_export() -> Result<()> {
        let (db, _log) = memory_db(Config::new().order(4));
        for k in [10, 20, 30, 40, 35, 50] {
            db.insert(k, format!("v{k}"));
        }

        let stats = db.stats();
        assert_eq!(stats.entries, 6);
        assert_eq!(stats.tree_height, 2);
        assert_eq!(stats.leaf_count, 3);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.order, 4);

        let root = db.export_tree().unwrap();
        assert_eq!(root.keys, vec!["30", "40"]);
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["isLeaf"], false);
        assert_eq!(json["children"][1]["keys"][1], "35");

        db.check()
    }

    #[test]
    fn test_clear() {
        let (db, log) = memory_db(Config::new());
        for k in 0..20 {
            db.insert(k, "x");
        }
        db.clear();
        assert_eq!(db.stats().entries, 0);
        assert_eq!(db.stats().node_count, 0);
        assert_eq!(log.lines().last().map(String::as_str), Some("Cleared."));
    }

    #[test]
    fn test_invalid_order() {
        let config = Config::new().tree_config(TreeConfig { order: 1 });
        assert!(matches!(
            Db::with_log(config, Arc::new(NullLog)),
            Err(StoreError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_shared_across_threads() {
        let (db, log) = memory_db(Config::new());
        let db = Arc::new(db);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for k in 0..250 {
                        db.insert(t * 1000 + k, format!("{t}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.stats().entries, 1000);
        assert_eq!(log.lines().len(), 1000);
        db.check().unwrap();
    }

    #[test]
    fn test_log_order_matches_tree_under_contention() {
        let (db, log) = memory_db(Config::new());
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        db.insert(7, format!("t{t}-{i}"));
                        if i % 50 == 0 {
                            let _ = db.delete(7);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Replaying the log must reproduce the tree's history for key 7
        let mut present = false;
        let mut last = None;
        for line in log.lines() {
            if let Some(value) = line.strip_prefix("Inserted: 7 -> ") {
                assert!(!present, "insert logged over a live key: {line}");
                present = true;
                last = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Updated: 7 -> ") {
                assert!(present, "update logged for an absent key: {line}");
                last = Some(value.to_string());
            } else if line == "Deleted: 7" {
                assert!(present, "delete logged for an absent key");
                present = false;
            } else {
                assert_eq!(line, "Delete failed: 7");
                assert!(!present, "failed delete logged over a live key");
            }
        }

        assert!(present);
        assert_eq!(db.find(7).ok(), last);
    }

    #[test]
    fn test_multiline_value_logs_one_line() -> Result<()> {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("log.txt");
        let db = Db::open(Config::new().log_path(&log_path))?;

        db.insert(1, "a\nDeleted: 1");
        db.update(1, "b\r\nc")?;
        assert_eq!(db.find(1)?, "b\r\nc");

        let content = std::fs::read_to_string(&log_path)?;
        assert_eq!(
            content,
            "Inserted: 1 -> a\\nDeleted: 1\nUpdated: 1 -> b\\r\\nc\nFound: 1 -> b\\r\\nc\n"
        );
        assert_eq!(content.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn test_load_skips_invalid_utf8_line() -> Result<()> {
        let (db, log) = memory_db(Config::new());
        let report = db.load_reader(Cursor::new(&b"1 one\n2 caf\xE9\n3 three\n"[..]))?;

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);
        assert!(!db.contains(2));
        assert_eq!(log.lines(), vec!["Inserted: 1 -> one", "Inserted: 3 -> three"]);
        Ok(())
    }
}
