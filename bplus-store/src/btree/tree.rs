//! B+ tree core implementation.
//!
//! This module provides the main BPlusTree struct with operations for:
//! - insert: Insertions, folding updates of existing keys
//! - get / update: Point lookups and in-place value replacement
//! - remove: Removals (no rebalancing)
//! - iter / range_from: Ordered scans over the leaf chain

use super::arena::NodeArena;
use super::cursor::Iter;
use super::node::{InternalNode, LeafNode, Node};
use crate::error::{Result, StoreError};
use crate::types::{NodeId, TreeConfig, MIN_ORDER};
use crate::TreeNode;
use std::fmt::Display;

/// An in-memory B+ tree with linked leaves
///
/// Nodes never store parent links. Inserts remember the internal nodes they
/// pass on the way down and split upwards along that recorded path.
///
/// Deletion removes entries from leaves without merging or borrowing, so a
/// leaf may end up empty. It stays in the leaf chain and under its parent.
#[derive(Debug, Clone)]
pub struct BPlusTree<K, V> {
    /// Owner of every node reachable from `root`
    arena: NodeArena<K, V>,
    /// Root node (None means empty tree)
    root: Option<NodeId>,
    /// Node order
    config: TreeConfig,
    /// Number of entries
    len: usize,
    /// Number of levels, counting the leaf level
    height: usize,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Create an empty tree with the default order
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            root: None,
            config: TreeConfig::default(),
            len: 0,
            height: 0,
        }
    }

    /// Create an empty tree with a custom order
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        if config.order < MIN_ORDER {
            return Err(StoreError::InvalidOrder {
                order: config.order,
                min: MIN_ORDER,
            });
        }

        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Get the tree configuration
    pub fn config(&self) -> TreeConfig {
        self.config
    }

    /// Number of entries in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the tree holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the height of the tree (0 when no root exists)
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the root node id
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Borrow a node by id
    pub fn node(&self, id: NodeId) -> &Node<K, V> {
        self.arena.get(id)
    }

    /// Number of nodes owned by the tree
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of leaves in the leaf chain
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut current = self.leftmost_leaf();
        while let Some(id) = current {
            count += 1;
            current = self.arena.leaf(id).next;
        }
        count
    }

    /// Drop every node, leaving an empty tree with the same order
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
        self.height = 0;
    }

    /// Look up a key and return its value
    pub fn get(&self, key: &K) -> Option<&V> {
        let leaf = self.arena.leaf(self.find_leaf(key)?);
        let idx = leaf.search(key).ok()?;
        Some(&leaf.values[idx])
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert or update a key-value pair
    ///
    /// Returns the previous value if the key already existed; its value is
    /// replaced in place and the tree shape does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(root) = self.root else {
            let id = self.arena.alloc(Node::Leaf(LeafNode::with_entry(key, value)));
            self.root = Some(id);
            self.height = 1;
            self.len = 1;
            return None;
        };

        let mut path = Vec::with_capacity(self.height);
        let leaf_id = self.descend(root, &key, Some(&mut path));

        let leaf = self.arena.leaf_mut(leaf_id);
        let pos = match leaf.search(&key) {
            Ok(idx) => return Some(std::mem::replace(&mut leaf.values[idx], value)),
            Err(pos) => pos,
        };
        leaf.insert_at(pos, key, value);
        self.len += 1;

        if leaf.len() >= self.config.order {
            self.split_leaf(leaf_id, path);
        }

        None
    }

    /// Replace the value of an existing key
    ///
    /// Returns the previous value, or None (and changes nothing) if the key
    /// is absent.
    pub fn update(&mut self, key: &K, value: V) -> Option<V> {
        let leaf_id = self.find_leaf(key)?;
        let leaf = self.arena.leaf_mut(leaf_id);
        let idx = leaf.search(key).ok()?;
        Some(std::mem::replace(&mut leaf.values[idx], value))
    }

    /// Remove a key from the tree
    ///
    /// Returns the removed value. The leaf is never merged with a sibling or
    /// refilled, even when this leaves it empty.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let leaf_id = self.find_leaf(key)?;
        let leaf = self.arena.leaf_mut(leaf_id);
        let idx = leaf.search(key).ok()?;
        let (_, value) = leaf.remove_at(idx);
        self.len -= 1;
        Some(value)
    }

    /// Iterate over all entries in key order
    ///
    /// Each call starts again from the leftmost leaf.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.arena, self.leftmost_leaf(), 0)
    }

    /// Iterate in key order starting at the first key `>= start`
    pub fn range_from(&self, start: &K) -> Iter<'_, K, V> {
        match self.find_leaf(start) {
            Some(leaf_id) => {
                let pos = match self.arena.leaf(leaf_id).search(start) {
                    Ok(idx) | Err(idx) => idx,
                };
                Iter::new(&self.arena, Some(leaf_id), pos)
            }
            None => Iter::new(&self.arena, None, 0),
        }
    }

    /// Find the parent of a node by searching down from the root
    ///
    /// Returns None if `target` is the root or is not reachable. This costs
    /// a walk over the tree; inserts do not use it and instead consume the
    /// path recorded during their descent.
    pub fn parent_of(&self, target: NodeId) -> Option<NodeId> {
        let root = self.root?;
        self.parent_of_from(root, target)
    }

    fn parent_of_from(&self, current: NodeId, target: NodeId) -> Option<NodeId> {
        let internal = self.arena.get(current).as_internal()?;
        for &child in &internal.children {
            if child == target {
                return Some(current);
            }
            if let Some(parent) = self.parent_of_from(child, target) {
                return Some(parent);
            }
        }
        None
    }

    /// Descend from the root to the leaf whose range can contain `key`
    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let root = self.root?;
        Some(self.descend(root, key, None))
    }

    /// Descend from `start` to a leaf, optionally recording internal nodes passed
    fn descend(&self, start: NodeId, key: &K, mut path: Option<&mut Vec<NodeId>>) -> NodeId {
        let mut current = start;
        while let Node::Internal(internal) = self.arena.get(current) {
            if let Some(path) = path.as_deref_mut() {
                path.push(current);
            }
            current = internal.child_for(key);
        }
        current
    }

    /// Descend through first children to the leftmost leaf
    pub(crate) fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        while let Node::Internal(internal) = self.arena.get(current) {
            current = internal.children[0];
        }
        Some(current)
    }

    /// Split an overflowing leaf and propagate its separator upwards
    fn split_leaf(&mut self, leaf_id: NodeId, path: Vec<NodeId>) {
        let (right, separator) = self.arena.leaf_mut(leaf_id).split();
        let right_id = self.arena.alloc(Node::Leaf(right));
        self.arena.leaf_mut(leaf_id).next = Some(right_id);

        tracing::trace!(leaf = %leaf_id, new_leaf = %right_id, "split leaf");

        self.insert_into_parent(path, leaf_id, separator, right_id);
    }

    /// Insert a separator and its right child into the parent of `left`
    ///
    /// `path` holds the internal nodes from the root down to the parent of
    /// `left`. Each overflowing parent is split and its middle key carried
    /// one level further up; an empty path means `left` is the root.
    fn insert_into_parent(
        &mut self,
        mut path: Vec<NodeId>,
        mut left: NodeId,
        mut separator: K,
        mut right: NodeId,
    ) {
        loop {
            let Some(parent_id) = path.pop() else {
                self.grow_root(left, separator, right);
                return;
            };

            let parent = self.arena.internal_mut(parent_id);
            let pos = parent.insert_separator(separator, right);
            debug_assert_eq!(parent.children[pos], left);

            if parent.keys.len() < self.config.order {
                return;
            }

            let (sibling, lifted) = parent.split();
            let sibling_id = self.arena.alloc(Node::Internal(sibling));

            tracing::trace!(node = %parent_id, new_node = %sibling_id, "split internal node");

            left = parent_id;
            separator = lifted;
            right = sibling_id;
        }
    }

    /// Put a new root above a root that has just split
    fn grow_root(&mut self, left: NodeId, separator: K, right: NodeId) {
        let root = self
            .arena
            .alloc(Node::Internal(InternalNode::new_root(separator, left, right)));
        self.root = Some(root);
        self.height += 1;

        tracing::debug!(root = %root, height = self.height, "tree grew a level");
    }

    /// Verify the structural invariants of the tree
    ///
    /// Checks key order and uniqueness in every node, child counts, node
    /// capacity, separator partitioning, uniform leaf depth, the recorded
    /// height and size, and that the leaf chain visits exactly the leaves of
    /// an in-order walk.
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.len != 0 || self.height != 0 {
                return Err(StoreError::corruption(format!(
                    "empty tree reports len {} and height {}",
                    self.len, self.height
                )));
            }
            return Ok(());
        };

        let mut walk = Walk::default();
        self.check_node(root, None, None, 1, &mut walk)?;

        if walk.leaf_depth != Some(self.height) {
            return Err(StoreError::corruption(format!(
                "leaf depth {:?} differs from height {}",
                walk.leaf_depth, self.height
            )));
        }
        if walk.entries != self.len {
            return Err(StoreError::corruption(format!(
                "found {} entries, tree reports {}",
                walk.entries, self.len
            )));
        }

        let mut chain = Vec::with_capacity(walk.leaves.len());
        let mut current = self.leftmost_leaf();
        while let Some(id) = current {
            if chain.len() > walk.leaves.len() {
                return Err(StoreError::corruption("leaf chain does not terminate"));
            }
            chain.push(id);
            current = self.arena.leaf(id).next;
        }
        if chain != walk.leaves {
            return Err(StoreError::corruption(
                "leaf chain differs from in-order leaves",
            ));
        }

        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = self.arena.get(id);
        let keys = node.keys();

        if keys.len() > self.config.max_keys() {
            return Err(StoreError::corruption(format!(
                "node {id} holds {} keys (max: {})",
                keys.len(),
                self.config.max_keys()
            )));
        }
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StoreError::corruption(format!(
                "node {id} keys are not strictly ascending"
            )));
        }
        let in_range = |k: &K| lower.map_or(true, |lo| k >= lo) && upper.map_or(true, |hi| k < hi);
        if !keys.iter().all(in_range) {
            return Err(StoreError::corruption(format!(
                "node {id} holds keys outside its parent's separators"
            )));
        }

        match node {
            Node::Leaf(leaf) => {
                if leaf.values.len() != leaf.keys.len() {
                    return Err(StoreError::corruption(format!(
                        "leaf {id} has {} keys but {} values",
                        leaf.keys.len(),
                        leaf.values.len()
                    )));
                }
                match walk.leaf_depth {
                    Some(expected) if expected != depth => {
                        return Err(StoreError::corruption(format!(
                            "leaf {id} at depth {depth}, expected {expected}"
                        )));
                    }
                    _ => walk.leaf_depth = Some(depth),
                }
                walk.entries += leaf.keys.len();
                walk.leaves.push(id);
            }
            Node::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(StoreError::corruption(format!(
                        "internal node {id} has {} keys but {} children",
                        internal.keys.len(),
                        internal.children.len()
                    )));
                }
                for (i, &child) in internal.children.iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { internal.keys.get(i - 1) };
                    let child_upper = internal.keys.get(i).or(upper);
                    self.check_node(child, child_lower, child_upper, depth + 1, walk)?;
                }
            }
        }

        Ok(())
    }
}

impl<K: Ord + Clone + Display, V: Display> BPlusTree<K, V> {
    /// Export the tree structure for visualization
    pub fn export(&self) -> Option<TreeNode> {
        self.root.map(|root| self.export_node(root))
    }

    fn export_node(&self, id: NodeId) -> TreeNode {
        match self.arena.get(id) {
            Node::Leaf(leaf) => TreeNode {
                node_id: id.value(),
                is_leaf: true,
                keys: leaf.keys.iter().map(ToString::to_string).collect(),
                values: leaf.values.iter().map(ToString::to_string).collect(),
                next: leaf.next.map(NodeId::value),
                children: Vec::new(),
            },
            Node::Internal(internal) => TreeNode {
                node_id: id.value(),
                is_leaf: false,
                keys: internal.keys.iter().map(ToString::to_string).collect(),
                values: Vec::new(),
                next: None,
                children: internal
                    .children
                    .iter()
                    .map(|&child| self.export_node(child))
                    .collect(),
            },
        }
    }
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K: Ord + Clone, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BPlusTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for BPlusTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

/// State gathered while checking invariants
#[derive(Default)]
struct Walk {
    leaf_depth: Option<usize>,
    entries: usize,
    leaves: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn tree_with(keys: &[i64]) -> BPlusTree<i64, String> {
        let mut tree = BPlusTree::new();
        for &k in keys {
            tree.insert(k, format!("v{k}"));
        }
        tree
    }

    fn root_internal(tree: &BPlusTree<i64, String>) -> &InternalNode<i64> {
        tree.node(tree.root().unwrap()).as_internal().unwrap()
    }

    fn leaf_keys(tree: &BPlusTree<i64, String>, id: NodeId) -> Vec<i64> {
        tree.node(id).keys().to_vec()
    }

    fn chain<V>(tree: &BPlusTree<i64, V>) -> Vec<Vec<i64>> {
        let mut leaves = Vec::new();
        let mut current = tree.leftmost_leaf();
        while let Some(id) = current {
            let leaf = tree.node(id).as_leaf().unwrap();
            leaves.push(leaf.keys().to_vec());
            current = leaf.next();
        }
        leaves
    }

    #[test]
    fn test_tree_empty() {
        let mut tree: BPlusTree<i64, String> = BPlusTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.get(&1), None);
        assert_eq!(tree.update(&1, "x".into()), None);
        assert_eq!(tree.remove(&1), None);
        assert_eq!(tree.iter().count(), 0);
        assert_eq!(tree.node_count(), 0);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_tree_rejects_small_order() {
        let config = TreeConfig { order: 2 };
        let err = BPlusTree::<i64, String>::with_config(config).unwrap_err();
        assert!(matches!(err, StoreError::InvalidOrder { order: 2, min: 3 }));
    }

    #[test]
    fn test_tree_first_insert_creates_root_leaf() {
        let tree = tree_with(&[7]);
        let root = tree.root().unwrap();
        assert!(tree.node(root).is_leaf());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.get(&7).map(String::as_str), Some("v7"));
    }

    #[test]
    fn test_tree_split_scenario() {
        let mut tree = tree_with(&[10, 20, 30]);
        assert_eq!(tree.height(), 1);

        tree.insert(40, "v40".into());
        let root = root_internal(&tree);
        assert_eq!(root.keys(), &[30]);
        let (left, right) = (root.children()[0], root.children()[1]);
        assert_eq!(leaf_keys(&tree, left), vec![10, 20]);
        assert_eq!(leaf_keys(&tree, right), vec![30, 40]);
        assert_eq!(tree.node(left).as_leaf().unwrap().values(), &["v10", "v20"]);
        assert_eq!(tree.node(right).as_leaf().unwrap().values(), &["v30", "v40"]);
        assert_eq!(tree.node(left).as_leaf().unwrap().next(), Some(right));
        assert_eq!(tree.node(right).as_leaf().unwrap().next(), None);
        assert_eq!(tree.height(), 2);

        tree.insert(35, "x".into());
        assert_eq!(root_internal(&tree).keys(), &[30]);
        assert_eq!(leaf_keys(&tree, right), vec![30, 35, 40]);

        tree.insert(50, "y".into());
        assert_eq!(root_internal(&tree).keys(), &[30, 40]);
        assert_eq!(chain(&tree), vec![vec![10, 20], vec![30, 35], vec![40, 50]]);
        assert_eq!(tree.height(), 2);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_tree_root_grows_only_on_root_split() {
        let mut tree: BPlusTree<i64, String> = BPlusTree::new();
        let mut height = 0;
        for k in 0..500 {
            let root_before = tree.root();
            let root_was_full = root_before
                .map(|r| tree.node(r).len() == tree.config().max_keys())
                .unwrap_or(false);
            tree.insert(k, String::new());
            if tree.height() != height {
                assert_eq!(tree.height(), height + 1);
                assert!(root_before.is_none() || root_was_full);
                if let Some(old_root) = root_before {
                    assert_eq!(tree.parent_of(old_root), tree.root());
                }
                height = tree.height();
            } else {
                assert_eq!(tree.root(), root_before);
            }
        }
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_tree_last_write_wins() {
        let mut tree: BPlusTree<i64, String> = BPlusTree::new();
        for round in 0..3 {
            for k in 0..50 {
                tree.insert(k, format!("{k}-{round}"));
            }
        }
        assert_eq!(tree.len(), 50);
        for k in 0..50 {
            assert_eq!(tree.get(&k), Some(&format!("{k}-2")));
        }
        assert_eq!(tree.insert(3, "new".into()), Some("3-2".into()));
    }

    #[test]
    fn test_tree_update() {
        let mut tree = tree_with(&[1, 2, 3, 4, 5]);
        let shape = format!("{:?}", tree.export());

        assert_eq!(tree.update(&3, "three".into()), Some("v3".into()));
        assert_eq!(tree.get(&3).map(String::as_str), Some("three"));
        assert_eq!(tree.update(&9, "nine".into()), None);
        assert_eq!(tree.get(&9), None);
        assert_eq!(tree.len(), 5);
        assert_eq!(
            format!("{:?}", tree.export()),
            shape.replace("\"v3\"", "\"three\"")
        );
    }

    #[test]
    fn test_tree_remove_leaves_empty_leaf_linked() {
        let mut tree = tree_with(&[10, 20, 30, 40]);
        assert_eq!(tree.remove(&10), Some("v10".into()));
        assert_eq!(tree.remove(&20), Some("v20".into()));
        assert_eq!(tree.remove(&20), None);

        assert_eq!(chain(&tree), vec![vec![], vec![30, 40]]);
        assert_eq!(root_internal(&tree).keys(), &[30]);
        assert_eq!(tree.len(), 2);
        tree.check_invariants().unwrap();

        tree.insert(5, "v5".into());
        assert_eq!(chain(&tree), vec![vec![5], vec![30, 40]]);
        let scanned: Vec<i64> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(scanned, vec![5, 30, 40]);
    }

    #[test]
    fn test_tree_remove_only_touches_target_leaf() {
        let mut tree = tree_with(&(0..40).collect::<Vec<_>>());
        let before = tree.export().unwrap();
        let target_leaf = tree.find_leaf(&17).unwrap();

        tree.remove(&17).unwrap();
        let after = tree.export().unwrap();

        fn leaves(node: &TreeNode, out: &mut Vec<TreeNode>) {
            if node.is_leaf {
                out.push(node.clone());
            }
            for child in &node.children {
                leaves(child, out);
            }
        }
        let (mut old, mut new) = (Vec::new(), Vec::new());
        leaves(&before, &mut old);
        leaves(&after, &mut new);
        assert_eq!(old.len(), new.len());
        for (o, n) in old.iter().zip(&new) {
            assert_eq!(o.next, n.next);
            if o.node_id == target_leaf.value() {
                assert!(o.keys.contains(&"17".to_string()));
                assert!(!n.keys.contains(&"17".to_string()));
            } else {
                assert_eq!(o, n);
            }
        }
    }

    #[test]
    fn test_tree_not_found_between_separators() {
        let mut tree = tree_with(&[10, 20, 30, 40, 50]);
        let before = tree.export();
        assert_eq!(tree.get(&25), None);
        assert_eq!(tree.update(&25, "x".into()), None);
        assert_eq!(tree.remove(&25), None);
        assert_eq!(tree.export(), before);
    }

    #[test]
    fn test_tree_parent_of() {
        let tree = tree_with(&(0..30).collect::<Vec<_>>());
        let root = tree.root().unwrap();
        assert_eq!(tree.parent_of(root), None);

        let mut path = Vec::new();
        let leaf = tree.descend(root, &13, Some(&mut path));
        assert_eq!(tree.parent_of(leaf), path.last().copied());
        for pair in path.windows(2) {
            assert_eq!(tree.parent_of(pair[1]), Some(pair[0]));
        }
    }

    #[test]
    fn test_tree_range_from() {
        let tree = tree_with(&[10, 20, 30, 40, 50, 60]);
        let keys = |start| tree.range_from(&start).map(|(k, _)| *k).collect::<Vec<_>>();
        assert_eq!(keys(25), vec![30, 40, 50, 60]);
        assert_eq!(keys(40), vec![40, 50, 60]);
        assert_eq!(keys(0), vec![10, 20, 30, 40, 50, 60]);
        assert!(keys(61).is_empty());
    }

    #[test]
    fn test_tree_clear() {
        let mut tree = tree_with(&(0..100).collect::<Vec<_>>());
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.node_count(), 0);
        tree.check_invariants().unwrap();
        tree.insert(1, "one".into());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_tree_export_shape() {
        let tree = tree_with(&[10, 20, 30, 40]);
        let root = tree.export().unwrap();
        assert!(!root.is_leaf);
        assert_eq!(root.keys, vec!["30"]);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].values, vec!["v10", "v20"]);
        assert_eq!(root.children[0].next, Some(root.children[1].node_id));
    }

    #[test]
    fn test_tree_larger_orders() {
        for order in [3, 5, 8, 33] {
            let mut tree = BPlusTree::with_config(TreeConfig::new(order)).unwrap();
            for k in (0..1000).rev() {
                tree.insert(k, k * 2);
            }
            tree.check_invariants().unwrap();
            let scanned: Vec<i64> = tree.iter().map(|(k, _)| *k).collect();
            assert_eq!(scanned, (0..1000).collect::<Vec<_>>());
            assert_eq!(tree.get(&500), Some(&1000));
        }
    }

    #[test]
    fn test_tree_chain_complete_after_random_inserts() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut keys: Vec<i64> = (0..2000).collect();
        keys.shuffle(&mut rng);

        let mut tree = BPlusTree::new();
        for &k in &keys {
            tree.insert(k, ());
            let root = tree.root().unwrap();
            assert!(tree.node(root).len() <= tree.config().max_keys());
        }
        tree.check_invariants().unwrap();

        let scanned: Vec<i64> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(scanned, (0..2000).collect::<Vec<_>>());
        assert_eq!(tree.leaf_count(), chain(&tree).len());
    }

    #[test]
    fn test_tree_matches_btreemap_model() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut tree = BPlusTree::new();
        let mut model = BTreeMap::new();

        for step in 0..5000u32 {
            let key: i64 = rng.gen_range(0..400);
            match rng.gen_range(0..4) {
                0 | 1 => assert_eq!(tree.insert(key, step), model.insert(key, step)),
                2 => {
                    let expected = model.get_mut(&key).map(|v| std::mem::replace(v, step));
                    assert_eq!(tree.update(&key, step), expected);
                }
                _ => assert_eq!(tree.remove(&key), model.remove(&key)),
            }
            assert_eq!(tree.len(), model.len());
        }

        tree.check_invariants().unwrap();
        let scanned: Vec<(i64, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(i64, u32)> = model.into_iter().collect();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn test_tree_from_iterator() {
        let tree: BPlusTree<i64, &str> = [(3, "c"), (1, "a"), (2, "b"), (1, "z")].into_iter().collect();
        let entries: Vec<_> = (&tree).into_iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, vec![(1, "z"), (2, "b"), (3, "c")]);
    }
}
