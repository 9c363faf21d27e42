//! Internal consistency check for the bucket tree.

use super::error::InvariantViolation;
use super::node::{NodeIndex, NodeKind, ROOT};
use super::slots::SlotBuffer;
use super::tree::BucketTree;

macro_rules! ensure {
    ($condition:expr, $($detail:tt)+) => {
        if !$condition {
            return Err(InvariantViolation::new(format!($($detail)+)));
        }
    };
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    /// Walks every level from the root and checks all structural invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub(crate) fn verify(&self) -> Result<(), InvariantViolation> {
        let table = &self.table;
        let slots = table.len();
        ensure!(slots > 0, "node table is empty");

        let root = &table[ROOT];
        ensure!(
            root.parent.is_none() && root.prev.is_none() && root.next.is_none(),
            "root has parent or sibling links"
        );

        let mut visited = vec![false; slots];
        let mut runs_in_use = vec![false; self.store.runs_issued()];
        let mut pending: Vec<(NodeIndex, usize)> = vec![(ROOT, self.height)];
        let mut reachable = 0;

        while let Some((node, level)) = pending.pop() {
            ensure!(!visited[node], "node {node} is reachable twice");
            visited[node] = true;
            reachable += 1;

            let record = &table[node];
            match record.kind {
                NodeKind::Leaf { run } => {
                    ensure!(level == 0, "leaf {node} sits at level {level}");
                    ensure!(
                        record.count <= LEAF_CAPACITY,
                        "leaf {node} holds {} elements",
                        record.count
                    );
                    ensure!(
                        run < runs_in_use.len() && !runs_in_use[run],
                        "leaf {node} owns invalid or shared run {run}"
                    );
                    runs_in_use[run] = true;
                }
                NodeKind::Internal { first_child } => {
                    ensure!(level > 0, "internal node {node} sits at leaf level");
                    ensure!(
                        record.count <= Self::level_capacity(level),
                        "node {node} at level {level} holds {} elements",
                        record.count
                    );
                    ensure!(first_child < slots, "node {node} anchors missing slot");
                    ensure!(
                        table[first_child].prev.is_none(),
                        "first child of node {node} has a predecessor"
                    );

                    let mut sum = 0usize;
                    let mut previous = None;
                    let mut cursor = Some(first_child);
                    let mut steps = 0;
                    while let Some(child) = cursor {
                        ensure!(child < slots, "chain under node {node} leaves the table");
                        steps += 1;
                        ensure!(steps <= slots, "chain under node {node} is cyclic");

                        let child_record = &table[child];
                        ensure!(
                            child_record.parent == Some(node),
                            "node {child} is chained under {node} but points at {:?}",
                            child_record.parent
                        );
                        ensure!(
                            child_record.prev == previous,
                            "node {child} has prev {:?}, expected {previous:?}",
                            child_record.prev
                        );
                        ensure!(child_record.count > 0, "node {child} is empty");

                        sum += child_record.count;
                        pending.push((child, level - 1));
                        previous = Some(child);
                        cursor = child_record.next;
                    }
                    ensure!(
                        sum == record.count,
                        "node {node} counts {} but its children hold {sum}",
                        record.count
                    );
                }
            }
        }

        ensure!(
            reachable == slots,
            "{} of {slots} table slots are unreachable",
            slots - reachable
        );

        let used = runs_in_use.iter().filter(|used| **used).count();
        let free = self.store.free_runs();
        ensure!(
            used + free.len() == self.store.runs_issued(),
            "{used} runs in use and {} free, but {} issued",
            free.len(),
            self.store.runs_issued()
        );
        for &run in free {
            ensure!(
                run < runs_in_use.len() && !runs_in_use[run],
                "free run {run} is still owned by a leaf"
            );
        }
        ensure!(
            self.store.runs_issued() <= self.store.run_capacity(),
            "issued runs exceed the backing allocation"
        );

        let last = table.last_leaf();
        ensure!(
            self.rightmost == last,
            "rightmost cache names {} but the last leaf is {last}",
            self.rightmost
        );

        Ok(())
    }
}
