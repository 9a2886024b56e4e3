//! Node storage for the pattern tree.
//!
//! Nodes live in a contiguous slot vector and refer to each other by
//! [`NodeId`]. Children are owned through the tree structure (each node id
//! appears in exactly one parent's child map); the `parent` field is a plain
//! handle used for pruning and statistics propagation, so there are no
//! reference cycles. Released slots go on a free list and are reused by the
//! next allocation.

use rustc_hash::FxHashMap;
use std::ops::{Index, IndexMut};

use crate::Token;
use crate::api::Category;

/// Handle of a node inside a [`PatternTree`](crate::PatternTree).
///
/// Handles are 32 bits wide, so one tree holds at most `u32::MAX + 1` node
/// slots.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The root is allocated first and never released.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_index(index: usize) -> NodeId {
        debug_assert!(u32::try_from(index).is_ok(), "node arena overflow at slot {index}");
        NodeId(index as u32)
    }
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    /// Edge label leading here from `parent`; `None` only for the root.
    pub key: Option<Token>,
    pub parent: Option<NodeId>,
    pub children: FxHashMap<Token, NodeId>,
    pub category: Option<Category<T>>,
    /// Minimum number of edges to a node without children.
    pub height: u32,
    pub average_size: f64,
}

impl<T> Node<T> {
    fn new(parent: Option<NodeId>, key: Option<Token>) -> Self {
        Node { key, parent, children: FxHashMap::default(), category: None, height: 0, average_size: 0.0 }
    }

    pub fn child(&self, token: &Token) -> Option<NodeId> {
        self.children.get(token).copied()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug)]
pub(crate) struct NodeArena<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
    live: usize,
}

impl<T> NodeArena<T> {
    /// Create an arena holding only the root node.
    pub fn new() -> Self {
        NodeArena { slots: vec![Some(Node::new(None, None))], free: Vec::new(), live: 1 }
    }

    /// Allocate a child node under `parent` reached through `key`, and link it.
    pub fn alloc_child(&mut self, parent: NodeId, key: Token) -> NodeId {
        let node = Node::new(Some(parent), Some(key.clone()));
        let id = match self.free.pop() {
            Some(id) => {
                debug_assert!(self.slots[id.index()].is_none(), "free slot should be empty");
                self.slots[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId::from_index(self.slots.len());
                self.slots.push(Some(node));
                id
            }
        };
        self.live += 1;
        self[parent].children.insert(key, id);
        id
    }

    /// Unlink a childless node from its parent and free its slot.
    ///
    /// Returns the parent handle. The root cannot be released.
    pub fn release(&mut self, id: NodeId) -> Option<NodeId> {
        debug_assert!(self[id].children.is_empty(), "only childless nodes are released");
        if self[id].is_root() {
            return None;
        }
        let node = self.slots.get_mut(id.index()).and_then(Option::take)?;
        let parent = node.parent?;
        if let Some(key) = &node.key {
            self[parent].children.remove(key);
        }
        self.free.push(id);
        self.live -= 1;
        Some(parent)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId::from_index(i), n)))
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Node<T> {
        self.slots[id.index()].as_ref().unwrap_or_else(|| panic!("stale node handle {id:?}"))
    }
}

impl<T> IndexMut<NodeId> for NodeArena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.slots[id.index()].as_mut().unwrap_or_else(|| panic!("stale node handle {id:?}"))
    }
}
