//! The bucket table: an arena of fixed-size node records.
//!
//! Nodes are addressed by plain indices. Slot `0` always holds the root.
//! Siblings under one parent form a doubly linked chain (`prev`/`next`), every
//! non-root node points back at its parent, and an internal node points at the
//! first node of its child chain.
//!
//! Freed slots are reclaimed eagerly: the last slot of the table is moved into
//! the hole and every link that referenced it is rewritten, so the table
//! never contains dead records.

use std::ops::{Index, IndexMut};

use super::error::CapacityError;

/// Position of a node record in the table.
pub(crate) type NodeIndex = usize;

/// The slot that always holds the root node.
pub(crate) const ROOT: NodeIndex = 0;

/// What a node refers to below itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Leaf: owns run `run` of the backing store.
    Leaf { run: usize },
    /// Internal node: owns the chain starting at `first_child`.
    Internal { first_child: NodeIndex },
}

/// One tree node.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    /// Elements in this node's subtree.
    pub(crate) count: usize,
    pub(crate) prev: Option<NodeIndex>,
    pub(crate) next: Option<NodeIndex>,
    /// `None` only for the root (and for records detached while being freed).
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Creates a detached, empty leaf over `run`.
    #[inline]
    pub(crate) const fn leaf(run: usize) -> Self {
        Self {
            count: 0,
            prev: None,
            next: None,
            parent: None,
            kind: NodeKind::Leaf { run },
        }
    }

    /// Creates a detached internal node over the chain at `first_child`.
    #[inline]
    pub(crate) const fn internal(first_child: NodeIndex, count: usize) -> Self {
        Self {
            count,
            prev: None,
            next: None,
            parent: None,
            kind: NodeKind::Internal { first_child },
        }
    }

    #[inline]
    pub(crate) const fn first_child(&self) -> Option<NodeIndex> {
        match self.kind {
            NodeKind::Internal { first_child } => Some(first_child),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Records that the node in slot `from` now lives in slot `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub(crate) from: NodeIndex,
    pub(crate) to: NodeIndex,
}

impl Relocation {
    /// Rewrites a cached index that may have pointed at the moved slot.
    #[inline]
    pub(crate) fn apply(self, index: &mut NodeIndex) {
        if *index == self.from {
            *index = self.to;
        }
    }
}

/// Growable table of node records.
#[derive(Clone, Debug)]
pub(crate) struct NodeTable {
    nodes: Vec<Node>,
}

impl NodeTable {
    /// Creates a table holding only `root`.
    pub(crate) fn new(root: Node) -> Self {
        Self { nodes: vec![root] }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Makes room for `additional` pushes without reallocating.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        self.nodes
            .try_reserve(additional)
            .map_err(|_| CapacityError {
                requested: self.nodes.len().saturating_add(additional),
            })
    }

    /// Appends a detached record and returns its slot.
    #[inline]
    pub(crate) fn push(&mut self, node: Node) -> NodeIndex {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Drops every record and installs `root` in slot 0.
    pub(crate) fn reset(&mut self, root: Node) {
        self.nodes.clear();
        self.nodes.push(root);
    }

    /// Points every node of the chain starting at `first` at `parent`.
    pub(crate) fn reparent_chain(&mut self, first: NodeIndex, parent: NodeIndex) {
        let mut cursor = Some(first);
        while let Some(node) = cursor {
            self.nodes[node].parent = Some(parent);
            cursor = self.nodes[node].next;
        }
    }

    /// Inserts the detached `node` into `anchor`'s chain, right after `anchor`.
    pub(crate) fn link_after(&mut self, anchor: NodeIndex, node: NodeIndex) {
        let next = self.nodes[anchor].next;
        let parent = self.nodes[anchor].parent;
        debug_assert!(parent.is_some(), "the root has no sibling chain");

        let record = &mut self.nodes[node];
        record.prev = Some(anchor);
        record.next = next;
        record.parent = parent;

        if let Some(next) = next {
            self.nodes[next].prev = Some(node);
        }
        self.nodes[anchor].next = Some(node);
    }

    /// Removes `node` from its chain and detaches it from its parent.
    ///
    /// The parent must keep at least one other child.
    pub(crate) fn unlink(&mut self, node: NodeIndex) {
        let Node {
            prev, next, parent, ..
        } = self.nodes[node];

        match (prev, parent) {
            (Some(prev), _) => self.nodes[prev].next = next,
            (None, Some(parent)) => match next {
                Some(next) => {
                    self.nodes[parent].kind = NodeKind::Internal { first_child: next };
                }
                None => unreachable!("unlinking the only child of node {parent}"),
            },
            (None, None) => {}
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }

        let record = &mut self.nodes[node];
        record.prev = None;
        record.next = None;
        record.parent = None;
    }

    /// Frees `slot` by moving the last record into it.
    ///
    /// No live record may still reference `slot`. Returns where the last
    /// record went, if it moved, so callers can rewrite cached indices.
    pub(crate) fn release(&mut self, slot: NodeIndex) -> Option<Relocation> {
        debug_assert_ne!(slot, ROOT, "the root slot is never released");
        let last = self.nodes.len() - 1;
        if slot == last {
            self.nodes.pop();
            return None;
        }

        let Some(moved) = self.nodes.pop() else {
            unreachable!("release from an empty table")
        };
        self.nodes[slot] = moved;

        match (moved.prev, moved.parent) {
            (Some(prev), _) => self.nodes[prev].next = Some(slot),
            (None, Some(parent)) => {
                if self.nodes[parent].first_child() == Some(last) {
                    self.nodes[parent].kind = NodeKind::Internal { first_child: slot };
                }
            }
            (None, None) => {}
        }
        if let Some(next) = moved.next {
            self.nodes[next].prev = Some(slot);
        }
        if let NodeKind::Internal { first_child } = moved.kind {
            self.reparent_chain(first_child, slot);
        }

        Some(Relocation { from: last, to: slot })
    }

    /// Returns the leftmost leaf below `node`.
    pub(crate) fn first_leaf(&self, mut node: NodeIndex) -> NodeIndex {
        while let NodeKind::Internal { first_child } = self.nodes[node].kind {
            node = first_child;
        }
        node
    }

    /// Returns the physically last leaf of the tree.
    pub(crate) fn last_leaf(&self) -> NodeIndex {
        let mut node = ROOT;
        while let NodeKind::Internal { first_child } = self.nodes[node].kind {
            node = first_child;
            while let Some(next) = self.nodes[node].next {
                node = next;
            }
        }
        node
    }

    /// Returns the leaf that follows `leaf` in positional order.
    pub(crate) fn next_leaf(&self, leaf: NodeIndex) -> Option<NodeIndex> {
        let mut node = leaf;
        loop {
            if let Some(next) = self.nodes[node].next {
                return Some(self.first_leaf(next));
            }
            node = self.nodes[node].parent?;
        }
    }
}

impl Index<NodeIndex> for NodeTable {
    type Output = Node;

    #[inline]
    fn index(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }
}

impl IndexMut<NodeIndex> for NodeTable {
    #[inline]
    fn index_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index]
    }
}
