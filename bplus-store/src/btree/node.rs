//! Tree nodes.
//!
//! A node is either a leaf, holding parallel key and value sequences plus a
//! link to the next leaf in key order, or an internal node, holding separator
//! keys and one more child than it has keys. Each variant carries only the
//! fields relevant to it.

use crate::types::NodeId;

/// A node of the B+ tree
#[derive(Debug, Clone)]
pub enum Node<K, V> {
    /// Leaf node (keys + values)
    Leaf(LeafNode<K, V>),
    /// Internal node (separator keys + child ids)
    Internal(InternalNode<K>),
}

impl<K, V> Node<K, V> {
    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Keys stored in this node
    pub fn keys(&self) -> &[K] {
        match self {
            Self::Leaf(leaf) => &leaf.keys,
            Self::Internal(internal) => &internal.keys,
        }
    }

    /// Number of keys stored in this node
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if this node holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Borrow as a leaf, if this is one
    pub fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Internal(_) => None,
        }
    }

    /// Borrow as an internal node, if this is one
    pub fn as_internal(&self) -> Option<&InternalNode<K>> {
        match self {
            Self::Internal(internal) => Some(internal),
            Self::Leaf(_) => None,
        }
    }
}

/// A leaf node: sorted keys, their values, and the next leaf in key order
#[derive(Debug, Clone)]
pub struct LeafNode<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) next: Option<NodeId>,
}

impl<K: Ord, V> LeafNode<K, V> {
    /// Create an empty, unlinked leaf
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }

    /// Create a leaf holding a single entry
    pub fn with_entry(key: K, value: V) -> Self {
        Self {
            keys: vec![key],
            values: vec![value],
            next: None,
        }
    }

    /// Sorted keys of this leaf
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Values, parallel to `keys()`
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// The next leaf in key order
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the leaf holds no entries
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Binary search for a key: `Ok(index)` if present, `Err(insert position)` otherwise
    pub fn search(&self, key: &K) -> Result<usize, usize> {
        self.keys.binary_search(key)
    }

    /// Insert an entry at a position, keeping keys and values in step
    pub(crate) fn insert_at(&mut self, pos: usize, key: K, value: V) {
        self.keys.insert(pos, key);
        self.values.insert(pos, value);
    }

    /// Remove the entry at a position, keeping keys and values in step
    pub(crate) fn remove_at(&mut self, pos: usize) -> (K, V) {
        let key = self.keys.remove(pos);
        let value = self.values.remove(pos);
        (key, value)
    }
}

impl<K: Ord + Clone, V> LeafNode<K, V> {
    /// Split this leaf in half
    ///
    /// This leaf keeps entries `[0, mid)`, the returned leaf takes `[mid, len)`
    /// and inherits this leaf's `next` link. The caller links the two once the
    /// new leaf has an id. The separator is the first key of the right half.
    pub(crate) fn split(&mut self) -> (Self, K) {
        let mid = self.keys.len() / 2;
        let right = Self {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
            next: self.next.take(),
        };
        let separator = right.keys[0].clone();
        (right, separator)
    }
}

impl<K: Ord, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// An internal node: separator keys and `keys.len() + 1` children
///
/// Child `i` covers keys `k` with `keys[i - 1] <= k < keys[i]`, open at both ends.
#[derive(Debug, Clone)]
pub struct InternalNode<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<NodeId>,
}

impl<K: Ord> InternalNode<K> {
    /// Create a root over two children separated by one key
    pub fn new_root(separator: K, left: NodeId, right: NodeId) -> Self {
        Self {
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    /// Separator keys
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Child ids, one more than `keys()`
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Index of the child whose range can contain `key`
    ///
    /// This is the number of separators `<= key`.
    pub fn child_index(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// The child whose range can contain `key`
    pub fn child_for(&self, key: &K) -> NodeId {
        self.children[self.child_index(key)]
    }

    /// Insert a separator with its right-hand child
    ///
    /// The separator lands at its upper-bound position and the new child
    /// directly after the child that was split.
    pub(crate) fn insert_separator(&mut self, separator: K, right: NodeId) -> usize {
        let pos = self.child_index(&separator);
        self.keys.insert(pos, separator);
        self.children.insert(pos + 1, right);
        pos
    }

    /// Split this internal node around its middle key
    ///
    /// This node keeps keys `[0, mid)` and children `[0, mid]`; the returned
    /// node takes keys `[mid + 1, len)` and children `[mid + 1, len]`. The
    /// middle key is lifted out of both halves and returned.
    pub(crate) fn split(&mut self) -> (Self, K) {
        let mid = self.keys.len() / 2;
        let right = Self {
            keys: self.keys.split_off(mid + 1),
            children: self.children.split_off(mid + 1),
        };
        let lifted = self
            .keys
            .pop()
            .unwrap_or_else(|| unreachable!("internal split of a node with {mid} keys"));
        (right, lifted)
    }
}
