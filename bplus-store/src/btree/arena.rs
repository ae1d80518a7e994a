//! Node arena.
//!
//! The arena owns every node of a tree. Nodes reference each other only by
//! `NodeId`, so the tree stays a plain owned structure with no aliasing, and
//! dropping the arena releases every node at once.

use super::node::{InternalNode, LeafNode, Node};
use crate::types::NodeId;

/// Owning storage for the nodes of one tree
#[derive(Debug, Clone)]
pub(crate) struct NodeArena<K, V> {
    nodes: Vec<Node<K, V>>,
}

impl<K, V> NodeArena<K, V> {
    /// Create an empty arena
    pub(crate) const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes ever allocated
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Take ownership of a node, returning its id
    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Borrow a node
    pub(crate) fn get(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    /// Borrow a node that descent has established to be a leaf
    pub(crate) fn leaf(&self, id: NodeId) -> &LeafNode<K, V> {
        match self.get(id) {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("node {id} is internal, expected a leaf"),
        }
    }

    /// Mutably borrow a node that descent has established to be a leaf
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K, V> {
        match &mut self.nodes[id.index()] {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("node {id} is internal, expected a leaf"),
        }
    }

    /// Mutably borrow a node recorded on a descent path
    pub(crate) fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode<K> {
        match &mut self.nodes[id.index()] {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => unreachable!("node {id} is a leaf, expected an internal node"),
        }
    }

    /// Drop every node
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}
