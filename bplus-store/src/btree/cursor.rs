//! Leaf-chain iteration.
//!
//! The iterator holds a position `(leaf, index)` and walks the `next` links
//! between leaves, so a full scan never revisits internal nodes. Empty
//! leaves left behind by deletes are stepped over.

use super::arena::NodeArena;
use crate::types::NodeId;
use std::iter::FusedIterator;

/// Iterator over tree entries in key order
pub struct Iter<'a, K, V> {
    /// The arena holding the leaves
    arena: &'a NodeArena<K, V>,
    /// Leaf currently being read (None once the chain is exhausted)
    leaf: Option<NodeId>,
    /// Position of the next entry within `leaf`
    index: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    /// Create an iterator positioned at entry `index` of `leaf`
    pub(crate) fn new(arena: &'a NodeArena<K, V>, leaf: Option<NodeId>, index: usize) -> Self {
        Self { arena, leaf, index }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        loop {
            let leaf = arena.leaf(self.leaf?);

            if self.index < leaf.keys.len() {
                let idx = self.index;
                self.index += 1;
                return Some((&leaf.keys[idx], &leaf.values[idx]));
            }

            // Move to the next leaf in the chain
            self.leaf = leaf.next;
            self.index = 0;
        }
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            leaf: self.leaf,
            index: self.index,
        }
    }
}
