//! Common types used throughout the store.

mod node_id;

pub use node_id::NodeId;

use serde::{Deserialize, Serialize};

/// Key type of the record store (integer keys, as in the bulk-load format)
pub type Key = i64;

/// Value type of the record store
pub type Value = String;

/// Default tree order: nodes split when they reach 4 keys
pub const DEFAULT_ORDER: usize = 4;

/// Smallest order that still yields two non-empty halves on an internal split
pub const MIN_ORDER: usize = 3;

/// Tree configuration
///
/// `order` is the fan-out parameter: a node may hold at most `order - 1`
/// keys once an operation returns, and is split the moment it reaches
/// `order` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    /// Maximum fan-out of an internal node
    pub order: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
        }
    }
}

impl TreeConfig {
    /// Create a new config, clamping the order to `MIN_ORDER`
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(MIN_ORDER),
        }
    }

    /// Key capacity of a node once an operation has returned
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }
}
