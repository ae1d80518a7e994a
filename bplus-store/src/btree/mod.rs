//! B+ tree implementation.
//!
//! This module provides an in-memory B+ tree that supports:
//! - Point lookups (get)
//! - Insertions (insert), updating existing keys in place
//! - Value replacement (update)
//! - Deletions (remove), without rebalancing
//! - Ordered scans over the linked leaves

mod arena;
mod cursor;
mod node;
mod tree;

pub use cursor::Iter;
pub use node::{InternalNode, LeafNode, Node};
pub use tree::BPlusTree;
