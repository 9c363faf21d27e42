//! The backing store: one flat slot buffer carved into leaf-sized runs.
//!
//! Run `r` occupies slots `r * LEAF_CAPACITY .. (r + 1) * LEAF_CAPACITY`.
//! A leaf owns exactly one run and keeps its elements packed at the front of
//! it. Runs given back by removed leaves go on a free list and are reused
//! before the buffer grows; when it does grow, its run capacity doubles.

use std::marker::PhantomData;

use super::error::CapacityError;
use super::slots::SlotBuffer;
use crate::tracing_helpers::debug_log;

#[derive(Clone)]
pub(crate) struct BackingStore<T, S, const LEAF_CAPACITY: usize> {
    slots: S,
    /// Runs handed out so far. Runs at or above this mark are untouched.
    runs_issued: usize,
    free_runs: Vec<usize>,
    marker: PhantomData<T>,
}

impl<T, S: SlotBuffer<T>, const LEAF_CAPACITY: usize> BackingStore<T, S, LEAF_CAPACITY> {
    pub(crate) fn new() -> Self {
        Self {
            slots: S::default(),
            runs_issued: 0,
            free_runs: Vec::new(),
            marker: PhantomData,
        }
    }

    #[inline]
    const fn base(run: usize) -> usize {
        run * LEAF_CAPACITY
    }

    /// Number of runs the current allocation can hold.
    #[inline]
    pub(crate) fn run_capacity(&self) -> usize {
        self.slots.len() / LEAF_CAPACITY
    }

    #[inline]
    pub(crate) const fn runs_issued(&self) -> usize {
        self.runs_issued
    }

    #[inline]
    pub(crate) fn free_runs(&self) -> &[usize] {
        &self.free_runs
    }

    /// Grows the buffer so that it holds at least `runs` runs.
    pub(crate) fn reserve_runs(&mut self, runs: usize) -> Result<(), CapacityError> {
        let capacity = self.run_capacity();
        if runs <= capacity {
            return Ok(());
        }
        let length = runs
            .checked_mul(LEAF_CAPACITY)
            .ok_or(CapacityError { requested: usize::MAX })?;
        self.slots.try_grow(length)?;
        debug_log!(from_runs = capacity, to_runs = runs, "backing store grown");
        Ok(())
    }

    /// Makes room for `runs` more issued runs, counting recycled ones first.
    pub(crate) fn reserve_additional_runs(&mut self, runs: usize) -> Result<(), CapacityError> {
        let fresh = runs.saturating_sub(self.free_runs.len());
        self.reserve_runs(self.runs_issued.saturating_add(fresh))
    }

    /// Guarantees that the next [`issue_run`](Self::issue_run) needs no allocation.
    ///
    /// Capacity doubles whenever a fresh run is needed and none is left.
    pub(crate) fn ensure_spare_run(&mut self) -> Result<(), CapacityError> {
        if !self.free_runs.is_empty() || self.runs_issued < self.run_capacity() {
            return Ok(());
        }
        let doubled = self.run_capacity().saturating_mul(2).max(1);
        self.reserve_runs(doubled)
    }

    /// Hands out a run, preferring recycled ones.
    ///
    /// A spare run must have been guaranteed by
    /// [`ensure_spare_run`](Self::ensure_spare_run).
    pub(crate) fn issue_run(&mut self) -> usize {
        if let Some(run) = self.free_runs.pop() {
            return run;
        }
        debug_assert!(self.runs_issued < self.run_capacity(), "no spare run reserved");
        let run = self.runs_issued;
        self.runs_issued += 1;
        run
    }

    /// Returns an emptied run to the free list.
    #[inline]
    pub(crate) fn release_run(&mut self, run: usize) {
        self.free_runs.push(run);
    }

    /// Vacates every slot and forgets all runs, keeping the allocation.
    pub(crate) fn reset(&mut self) {
        self.slots.clear();
        self.runs_issued = 0;
        self.free_runs.clear();
    }

    #[inline]
    pub(crate) fn get(&self, run: usize, offset: usize) -> &T {
        self.slots.get(Self::base(run) + offset)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, run: usize, offset: usize) -> &mut T {
        self.slots.get_mut(Self::base(run) + offset)
    }

    #[inline]
    pub(crate) fn take(&mut self, run: usize, offset: usize) -> T {
        self.slots.take(Self::base(run) + offset)
    }

    /// Places `value` at `offset` of a run holding `length` elements.
    pub(crate) fn insert(&mut self, run: usize, length: usize, offset: usize, value: T) {
        debug_assert!(length < LEAF_CAPACITY && offset <= length);
        let slot = Self::base(run) + offset;
        self.slots.move_right(slot, slot + 1, length - offset);
        self.slots.put(slot, value);
    }

    /// Removes the element at `offset` of a run holding `length` elements.
    pub(crate) fn remove(&mut self, run: usize, length: usize, offset: usize) -> T {
        debug_assert!(offset < length);
        let slot = Self::base(run) + offset;
        let value = self.slots.take(slot);
        self.slots.move_left(slot + 1, slot, length - offset - 1);
        value
    }

    /// Drops `count` elements starting at `offset` of a run holding `length` elements.
    pub(crate) fn remove_span(&mut self, run: usize, length: usize, offset: usize, count: usize) {
        debug_assert!(offset + count <= length);
        let slot = Self::base(run) + offset;
        for dropped in slot..slot + count {
            drop(self.slots.take(dropped));
        }
        self.slots
            .move_left(slot + count, slot, length - offset - count);
    }

    /// Moves `count` elements from `offset` of `source` to the front of `target`.
    pub(crate) fn transfer(&mut self, source: usize, offset: usize, target: usize, count: usize) {
        self.slots
            .relocate(Self::base(source) + offset, Self::base(target), count);
    }

    /// Clones `destination.len()` elements starting at `offset` of `run`.
    pub(crate) fn clone_into_slice(&self, run: usize, offset: usize, destination: &mut [T])
    where
        T: Clone,
    {
        self.slots
            .clone_into_slice(Self::base(run) + offset, destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::slots::{CopySlots, SafeSlots};
    use rstest::rstest;

    type Store = BackingStore<String, SafeSlots<String>, 4>;

    #[rstest]
    fn test_capacity_doubles_when_runs_run_out() {
        let mut store: Store = BackingStore::new();
        let mut capacities = Vec::new();
        for _ in 0..5 {
            store.ensure_spare_run().unwrap();
            store.issue_run();
            capacities.push(store.run_capacity());
        }
        assert_eq!(capacities, [1, 2, 4, 4, 8]);
    }

    #[rstest]
    fn test_released_runs_are_recycled_first() {
        let mut store: Store = BackingStore::new();
        for _ in 0..3 {
            store.ensure_spare_run().unwrap();
            store.issue_run();
        }
        store.release_run(1);
        store.ensure_spare_run().unwrap();

        assert_eq!(store.issue_run(), 1);
        assert_eq!(store.runs_issued(), 3);
    }

    #[rstest]
    fn test_insert_and_remove_shift_within_run() {
        let mut store: Store = BackingStore::new();
        store.ensure_spare_run().unwrap();
        let run = store.issue_run();

        store.insert(run, 0, 0, "b".to_string());
        store.insert(run, 1, 0, "a".to_string());
        store.insert(run, 2, 2, "c".to_string());
        assert_eq!(store.remove(run, 3, 1), "b");
        assert_eq!(store.get(run, 0), "a");
        assert_eq!(store.get(run, 1), "c");
    }

    #[rstest]
    fn test_transfer_moves_upper_half_to_new_run() {
        let mut store: BackingStore<u8, CopySlots<u8>, 4> = BackingStore::new();
        store.ensure_spare_run().unwrap();
        let left = store.issue_run();
        for (offset, value) in [10, 11, 12, 13].into_iter().enumerate() {
            store.insert(left, offset, offset, value);
        }
        store.ensure_spare_run().unwrap();
        let right = store.issue_run();

        store.transfer(left, 2, right, 2);

        assert_eq!(*store.get(right, 0), 12);
        assert_eq!(*store.get(right, 1), 13);
        assert_eq!(*store.get(left, 1), 11);
    }

    #[rstest]
    fn test_remove_span_keeps_tail() {
        let mut store: Store = BackingStore::new();
        store.ensure_spare_run().unwrap();
        let run = store.issue_run();
        for offset in 0..4 {
            store.insert(run, offset, offset, offset.to_string());
        }
        store.remove_span(run, 4, 1, 2);
        assert_eq!(store.get(run, 0), "0");
        assert_eq!(store.get(run, 1), "3");
    }
}
