//! Tree maintenance: descent, splitting and collapsing.
//!
//! Leaves sit at level 0 and all of them are at the same depth. An internal
//! node at level `L` may hold at most `LEAF_CAPACITY * BRANCHING_FACTOR^L`
//! elements; going over that splits it at the child boundary closest to its
//! midpoint. A leaf is split before it would go over `LEAF_CAPACITY`.
//!
//! Every mutating entry point leaves the tree fully consistent: counts summed
//! up to the root, chains doubly linked, no empty node other than an empty
//! root leaf, no unused table slot, and `rightmost` naming the last leaf.

use smallvec::{SmallVec, smallvec};

use super::error::CapacityError;
use super::node::{Node, NodeIndex, NodeKind, NodeTable, ROOT};
use super::slots::SlotBuffer;
use super::store::BackingStore;
use crate::tracing_helpers::{debug_log, trace_log};

pub(crate) struct BucketTree<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> {
    pub(crate) table: NodeTable,
    pub(crate) store: BackingStore<T, S, LEAF_CAPACITY>,
    /// Cached append target: the physically last leaf.
    pub(crate) rightmost: NodeIndex,
    /// Level of the root; `0` while the root is a leaf.
    pub(crate) height: usize,
}

impl<T: Clone, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: Clone> Clone
    for BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            store: self.store.clone(),
            rightmost: self.rightmost,
            height: self.height,
        }
    }
}

/// Unwraps a reservation on a path that mirrors `Vec`'s abort-on-OOM behavior.
#[inline]
pub(crate) fn infallible<R>(result: Result<R, CapacityError>) -> R {
    match result {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    const VALID_TUNING: () = assert!(
        LEAF_CAPACITY >= 2 && BRANCHING_FACTOR >= 2,
        "leaf capacity and branching factor must both be at least 2"
    );

    /// Creates a tree made of one empty root leaf.
    pub(crate) fn new() -> Self {
        let () = Self::VALID_TUNING;
        let mut store = BackingStore::new();
        infallible(store.ensure_spare_run());
        let run = store.issue_run();
        Self {
            table: NodeTable::new(Node::leaf(run)),
            store,
            rightmost: ROOT,
            height: 0,
        }
    }

    /// Maximum element count of a node at `level`.
    pub(crate) const fn level_capacity(level: usize) -> usize {
        let mut capacity = LEAF_CAPACITY;
        let mut remaining = level;
        while remaining > 0 {
            capacity = capacity.saturating_mul(BRANCHING_FACTOR);
            remaining -= 1;
        }
        capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.table[ROOT].count
    }

    #[inline]
    pub(crate) fn leaf_run(&self, leaf: NodeIndex) -> usize {
        match self.table[leaf].kind {
            NodeKind::Leaf { run } => run,
            NodeKind::Internal { .. } => unreachable!("node {leaf} is not a leaf"),
        }
    }

    // =========================================================================
    // Descent
    // =========================================================================

    /// Finds the leaf holding `index` and the offset of `index` inside it.
    ///
    /// `index` must be below `len()`.
    pub(crate) fn locate(&self, index: usize) -> (NodeIndex, usize) {
        debug_assert!(index < self.len());
        let mut node = ROOT;
        let mut remaining = index;
        loop {
            match self.table[node].kind {
                NodeKind::Leaf { .. } => return (node, remaining),
                NodeKind::Internal { first_child } => {
                    let mut child = first_child;
                    while remaining >= self.table[child].count {
                        remaining -= self.table[child].count;
                        child = match self.table[child].next {
                            Some(next) => next,
                            None => unreachable!("index {index} runs past node {node}"),
                        };
                    }
                    node = child;
                }
            }
        }
    }

    #[inline]
    pub(crate) fn element(&self, leaf: NodeIndex, offset: usize) -> &T {
        self.store.get(self.leaf_run(leaf), offset)
    }

    #[inline]
    pub(crate) fn element_mut(&mut self, leaf: NodeIndex, offset: usize) -> &mut T {
        let run = self.leaf_run(leaf);
        self.store.get_mut(run, offset)
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Reserves everything an insertion at `index` can allocate.
    ///
    /// One insertion creates at most one leaf, one split node per internal
    /// level and one new root. A run is only needed when the target leaf is full.
    pub(crate) fn reserve_for_insert(&mut self, index: usize) -> Result<(), CapacityError> {
        let target = if index == self.len() {
            self.rightmost
        } else {
            self.locate(index).0
        };
        if self.table[target].count == LEAF_CAPACITY {
            self.store.ensure_spare_run()?;
        }
        self.table.try_reserve(self.height + 3)
    }

    /// Grows the backing store so that `additional` appends issue no allocation.
    pub(crate) fn reserve_appends(&mut self, additional: usize) -> Result<(), CapacityError> {
        let room = LEAF_CAPACITY - self.table[self.rightmost].count;
        let runs = additional.saturating_sub(room).div_ceil(LEAF_CAPACITY);
        self.store.reserve_additional_runs(runs)
    }

    /// Inserts `value` at `index`, which must be at most `len()`.
    ///
    /// [`reserve_for_insert`](Self::reserve_for_insert) must have succeeded.
    pub(crate) fn insert(&mut self, index: usize, value: T) {
        let (mut leaf, mut offset) = if index == self.len() {
            let leaf = self.append_target();
            (leaf, self.table[leaf].count)
        } else {
            self.locate(index)
        };

        if self.table[leaf].count == LEAF_CAPACITY {
            (leaf, offset) = self.split_leaf(leaf, offset);
        }

        let run = self.leaf_run(leaf);
        self.store.insert(run, self.table[leaf].count, offset, value);
        self.table[leaf].count += 1;
        self.grow_ancestors(leaf);
    }

    /// Returns the leaf to append into, chaining a fresh one if the last is full.
    fn append_target(&mut self) -> NodeIndex {
        let last = self.rightmost;
        if self.table[last].count < LEAF_CAPACITY {
            return last;
        }

        let last = if last == ROOT { self.level_up() } else { last };
        let run = self.store.issue_run();
        let fresh = self.table.push(Node::leaf(run));
        self.table.link_after(last, fresh);
        self.rightmost = fresh;
        trace_log!(leaf = fresh, run, "chained new rightmost leaf");
        fresh
    }

    /// Splits a full leaf in half and returns where `offset` now lives.
    fn split_leaf(&mut self, leaf: NodeIndex, offset: usize) -> (NodeIndex, usize) {
        let leaf = if leaf == ROOT { self.level_up() } else { leaf };
        let half = LEAF_CAPACITY / 2;
        let moved = LEAF_CAPACITY - half;

        let source = self.leaf_run(leaf);
        let run = self.store.issue_run();
        self.store.transfer(source, half, run, moved);

        let right = self.table.push(Node {
            count: moved,
            ..Node::leaf(run)
        });
        self.table[leaf].count = half;
        self.table.link_after(leaf, right);
        if self.rightmost == leaf {
            self.rightmost = right;
        }
        trace_log!(leaf, right, "split leaf");

        if offset > half {
            (right, offset - half)
        } else {
            (leaf, offset)
        }
    }

    /// Adds one to every ancestor of `leaf`, splitting those that overflow.
    fn grow_ancestors(&mut self, leaf: NodeIndex) {
        let mut cursor = self.table[leaf].parent;
        while let Some(node) = cursor {
            self.table[node].count += 1;
            cursor = self.table[node].parent;
        }

        let mut cursor = self.table[leaf].parent;
        let mut level = 1;
        while let Some(mut node) = cursor {
            if self.table[node].count > Self::level_capacity(level) {
                if node == ROOT {
                    node = self.level_up();
                }
                self.split_internal(node);
            }
            cursor = self.table[node].parent;
            level += 1;
        }
    }

    /// Moves the root record to a fresh slot under a new internal root.
    ///
    /// Returns the slot the old root now occupies.
    fn level_up(&mut self) -> NodeIndex {
        let old_root = self.table[ROOT];
        let moved = self.table.push(Node {
            parent: Some(ROOT),
            ..old_root
        });
        if let NodeKind::Internal { first_child } = old_root.kind {
            self.table.reparent_chain(first_child, moved);
        }
        self.table[ROOT] = Node::internal(moved, old_root.count);
        if self.rightmost == ROOT {
            self.rightmost = moved;
        }
        self.height += 1;
        debug_log!(height = self.height, "tree grew a level");
        moved
    }

    /// Splits an overfull internal node at the child boundary nearest its midpoint.
    fn split_internal(&mut self, node: NodeIndex) {
        let total = self.table[node].count;
        let half = total / 2;
        let Some(first_child) = self.table[node].first_child() else {
            unreachable!("split of leaf {node} through the internal path")
        };

        let mut last_kept = first_child;
        let mut kept = self.table[first_child].count;
        while let Some(next) = self.table[last_kept].next {
            let next_count = self.table[next].count;
            if kept + next_count > half {
                break;
            }
            kept += next_count;
            last_kept = next;
        }
        let Some(first_moved) = self.table[last_kept].next else {
            unreachable!("node {node} overflowed with nothing to move")
        };

        self.table[last_kept].next = None;
        self.table[first_moved].prev = None;
        let sibling = self.table.push(Node::internal(first_moved, total - kept));
        self.table.reparent_chain(first_moved, sibling);
        self.table[node].count = kept;
        self.table.link_after(node, sibling);
        trace_log!(node, sibling, kept, "split internal node");
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes and returns the element at `index`, which must be below `len()`.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        let (leaf, offset) = self.locate(index);
        let run = self.leaf_run(leaf);
        let value = self.store.remove(run, self.table[leaf].count, offset);
        self.shrink_path(leaf, 1);
        value
    }

    /// Drops `count` elements starting at `index`; the range must be in bounds.
    ///
    /// Works leaf by leaf: the boundary leaves shrink in place, leaves fully
    /// inside the range are emptied and collapsed, and each ancestor count is
    /// lowered once per leaf rather than once per element.
    pub(crate) fn remove_range(&mut self, index: usize, count: usize) {
        let mut remaining = count;
        while remaining > 0 {
            let (leaf, offset) = self.locate(index);
            let length = self.table[leaf].count;
            let batch = remaining.min(length - offset);
            let run = self.leaf_run(leaf);
            self.store.remove_span(run, length, offset, batch);
            self.shrink_path(leaf, batch);
            remaining -= batch;
        }
    }

    /// Subtracts `amount` along the path from `leaf` to the root and cleans up.
    fn shrink_path(&mut self, leaf: NodeIndex, amount: usize) {
        let mut cursor = Some(leaf);
        while let Some(node) = cursor {
            self.table[node].count -= amount;
            cursor = self.table[node].parent;
        }
        if self.table[leaf].count == 0 {
            self.collapse(leaf);
        }
        self.level_down();
    }

    /// Unlinks an emptied leaf together with every ancestor it leaves empty.
    fn collapse(&mut self, leaf: NodeIndex) {
        if leaf == ROOT {
            return;
        }
        let was_rightmost = self.rightmost == leaf;

        let mut doomed: SmallVec<[NodeIndex; 8]> = smallvec![leaf];
        let mut top = leaf;
        while let Some(parent) = self.table[top].parent {
            if self.table[parent].count > 0 {
                break;
            }
            doomed.push(parent);
            top = parent;
        }
        if top == ROOT {
            self.reset();
            return;
        }

        self.table.unlink(top);
        trace_log!(leaf, top, levels = doomed.len(), "collapsing empty subtree");

        // Free top-down; each record is detached before its slot is reused.
        while let Some(node) = doomed.pop() {
            match self.table[node].kind {
                NodeKind::Internal { first_child } => self.table[first_child].parent = None,
                NodeKind::Leaf { run } => self.store.release_run(run),
            }
            if let Some(relocation) = self.table.release(node) {
                for pending in &mut doomed {
                    relocation.apply(pending);
                }
                relocation.apply(&mut self.rightmost);
            }
        }

        if was_rightmost {
            self.rightmost = self.table.last_leaf();
        }
    }

    /// Promotes the root's only child into slot 0 until the root branches.
    fn level_down(&mut self) {
        while let NodeKind::Internal { first_child } = self.table[ROOT].kind {
            if self.table[first_child].next.is_some() {
                return;
            }
            let child = self.table[first_child];
            self.table[ROOT] = Node {
                parent: None,
                ..child
            };
            if let NodeKind::Internal {
                first_child: grandchild,
            } = child.kind
            {
                self.table.reparent_chain(grandchild, ROOT);
            }
            if self.rightmost == first_child {
                self.rightmost = ROOT;
            }
            if let Some(relocation) = self.table.release(first_child) {
                relocation.apply(&mut self.rightmost);
            }
            self.height -= 1;
            debug_log!(height = self.height, "tree dropped a level");
        }
    }

    /// Drops every element and returns to a single empty root leaf.
    pub(crate) fn reset(&mut self) {
        self.store.reset();
        let run = self.store.issue_run();
        self.table.reset(Node::leaf(run));
        self.rightmost = ROOT;
        self.height = 0;
        debug_log!("tree reset to an empty root leaf");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::slots::SafeSlots;
    use rstest::rstest;

    type SmallTree = BucketTree<u32, 4, 2, SafeSlots<u32>>;

    fn tree_with(count: u32) -> SmallTree {
        let mut tree = SmallTree::new();
        for value in 0..count {
            tree.reserve_for_insert(value as usize).unwrap();
            tree.insert(value as usize, value);
        }
        tree
    }

    fn contents(tree: &SmallTree) -> Vec<u32> {
        (0..tree.len())
            .map(|index| {
                let (leaf, offset) = tree.locate(index);
                *tree.element(leaf, offset)
            })
            .collect()
    }

    #[rstest]
    #[case(0, 4)]
    #[case(1, 8)]
    #[case(2, 16)]
    #[case(3, 32)]
    fn test_level_capacity(#[case] level: usize, #[case] expected: usize) {
        assert_eq!(SmallTree::level_capacity(level), expected);
    }

    #[rstest]
    fn test_level_capacity_saturates() {
        assert_eq!(
            BucketTree::<u8, 128, 8, SafeSlots<u8>>::level_capacity(64),
            usize::MAX
        );
    }

    #[rstest]
    fn test_full_root_leaf_levels_up_on_append() {
        let tree = tree_with(5);

        assert_eq!(tree.height, 1);
        assert_eq!(tree.table.len(), 3);
        assert_eq!(tree.table[tree.rightmost].count, 1);
        assert_eq!(contents(&tree), [0, 1, 2, 3, 4]);
        tree.verify().unwrap();
    }

    #[rstest]
    fn test_insert_into_full_leaf_splits_it() {
        let mut tree = tree_with(4);
        tree.reserve_for_insert(1).unwrap();
        tree.insert(1, 100);

        assert_eq!(contents(&tree), [0, 100, 1, 2, 3]);
        assert_eq!(tree.height, 1);
        tree.verify().unwrap();
    }

    #[rstest]
    fn test_internal_overflow_splits_and_grows_height() {
        let tree = tree_with(40);

        assert!(tree.height >= 2);
        assert_eq!(contents(&tree), (0..40).collect::<Vec<_>>());
        tree.verify().unwrap();
    }

    #[rstest]
    fn test_removing_everything_resets_to_root_leaf() {
        let mut tree = tree_with(40);
        while tree.len() > 0 {
            tree.remove(tree.len() / 2);
            tree.verify().unwrap();
        }

        assert_eq!(tree.height, 0);
        assert_eq!(tree.table.len(), 1);
        assert_eq!(tree.rightmost, ROOT);
    }

    #[rstest]
    fn test_remove_range_spanning_leaves() {
        let mut tree = tree_with(40);
        tree.remove_range(3, 30);

        assert_eq!(contents(&tree), [0, 1, 2, 33, 34, 35, 36, 37, 38, 39]);
        tree.verify().unwrap();
    }

    #[rstest]
    fn test_collapse_of_rightmost_leaf_moves_append_target() {
        let mut tree = tree_with(9);
        tree.remove(8);
        tree.verify().unwrap();

        tree.reserve_for_insert(8).unwrap();
        tree.insert(8, 99);
        assert_eq!(contents(&tree), [0, 1, 2, 3, 4, 5, 6, 7, 99]);
        tree.verify().unwrap();
    }
}
