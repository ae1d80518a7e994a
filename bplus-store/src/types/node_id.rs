//! Node identifier type.

use std::fmt;

/// Handle naming one node inside a tree's node arena.
///
/// Ids are handed out by the arena in allocation order and are never reused
/// while the owning tree is alive. Two handles are equal exactly when they
/// name the same node, which is what ancestor lookups compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node id from a raw arena index
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).unwrap_or_else(|_| {
            panic!("node arena exceeded {} nodes", u32::MAX)
        });
        Self(raw)
    }

    /// Get the arena index for this id
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw id value
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
