//! The public bucket list collection.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, FusedIterator};
use std::ops::{Index, IndexMut};

use super::error::{BucketListError, CapacityError, IndexError, InvariantViolation};
use super::node::{NodeIndex, ROOT};
use super::slots::{CopySlots, SafeSlots, SlotBuffer};
use super::tree::{BucketTree, infallible};
use super::{DEFAULT_BRANCHING_FACTOR, DEFAULT_LEAF_CAPACITY};

// =============================================================================
// BucketList Definition
// =============================================================================

/// An indexable ordered collection with logarithmic insertion and removal.
///
/// Elements live in fixed-capacity leaf runs of one flat buffer; a tree of
/// node records on top of the runs tracks how many elements each subtree
/// holds, so positional lookup, insertion and removal all descend the tree
/// instead of shifting the whole sequence.
///
/// `LEAF_CAPACITY` is the number of elements one leaf holds before it splits
/// and `BRANCHING_FACTOR` scales that limit per internal level. `S` selects
/// the storage mode; see [`CopyBucketList`] for the block-copy variant.
///
/// # Time Complexity
///
/// | Operation      | Complexity                  |
/// |----------------|-----------------------------|
/// | `new`          | O(1)                        |
/// | `get` / `set`  | O(log N)                    |
/// | `add`          | O(log N), amortized O(1) leaf work |
/// | `insert`       | O(log N + LEAF_CAPACITY)    |
/// | `remove_at`    | O(log N + LEAF_CAPACITY)    |
/// | `remove_range` | O((k / LEAF_CAPACITY + 1) log N + k) |
/// | `index_of`     | O(N)                        |
/// | `iter`         | O(1) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use bucketlist::bucket::BucketList;
///
/// let mut list: BucketList<i32> = BucketList::new();
/// list.add(10);
/// list.add(20);
/// list.add(30);
/// list.insert(1, 15).unwrap();
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [10, 15, 20, 30]);
///
/// list.remove_at(0).unwrap();
/// list.remove_range(0, 2).unwrap();
/// assert_eq!(list.len(), 1);
/// assert_eq!(list.get(0), Some(&30));
/// ```
pub struct BucketList<
    T,
    const LEAF_CAPACITY: usize = { DEFAULT_LEAF_CAPACITY },
    const BRANCHING_FACTOR: usize = { DEFAULT_BRANCHING_FACTOR },
    S = SafeSlots<T>,
> {
    tree: BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>,
}

/// A bucket list that moves elements with block copies.
///
/// Only available for plain `Copy` values. Removed slots are not cleared,
/// which is fine because nothing they hold needs dropping.
///
/// # Examples
///
/// ```rust
/// use bucketlist::bucket::CopyBucketList;
///
/// let mut list: CopyBucketList<u64> = CopyBucketList::default();
/// list.extend(0..1000);
/// list.remove_range(100, 800).unwrap();
/// assert_eq!(list.len(), 200);
/// assert_eq!(list[100], 900);
/// ```
pub type CopyBucketList<
    T,
    const LEAF_CAPACITY: usize = { DEFAULT_LEAF_CAPACITY },
    const BRANCHING_FACTOR: usize = { DEFAULT_BRANCHING_FACTOR },
> = BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, CopySlots<T>>;

static_assertions::assert_type_eq_all!(
    BucketList<u8>,
    BucketList<u8, DEFAULT_LEAF_CAPACITY, DEFAULT_BRANCHING_FACTOR, SafeSlots<u8>>
);
static_assertions::assert_type_eq_all!(
    CopyBucketList<u8>,
    BucketList<u8, DEFAULT_LEAF_CAPACITY, DEFAULT_BRANCHING_FACTOR, CopySlots<u8>>
);
static_assertions::assert_impl_all!(BucketList<i32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(CopyBucketList<u8>: Send, Sync, Clone);
static_assertions::assert_not_impl_any!(BucketList<std::rc::Rc<i32>>: Send, Sync);

impl<T> BucketList<T> {
    /// Creates an empty list with the default tuning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<i32> = BucketList::new();
    /// assert!(list.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for at least `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<u32> = BucketList::with_capacity(10_000);
    /// list.extend(0..10_000);
    /// assert_eq!(list.len(), 10_000);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut list = Self::new();
        infallible(list.reserve(capacity));
        list
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    /// Returns the number of elements in the list.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the list contains no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of internal levels above the leaves.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<i32, 4, 2> = BucketList::default();
    /// assert_eq!(list.height(), 0);
    /// list.extend(0..5);
    /// assert_eq!(list.height(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.tree.height
    }

    /// Returns the number of node records in use.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tree.table.len()
    }

    /// Returns how many elements the backing store holds without growing.
    ///
    /// Leaves split by middle insertions stay half full, so the list may grow
    /// before `len()` reaches this number.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tree.store.run_capacity() * LEAF_CAPACITY
    }

    /// Makes sure `additional` more elements can be appended without growing
    /// the backing store.
    ///
    /// Only appends are covered: an insertion into a full leaf in the middle
    /// splits it into two half-full leaves and may still grow the store.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<u32> = (0..10).collect();
    /// list.reserve(500).unwrap();
    /// let capacity = list.capacity();
    /// list.extend(0..500);
    /// assert_eq!(list.capacity(), capacity);
    /// ```
    pub fn reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        self.tree.reserve_appends(additional)
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Returns a reference to the element at `index`, or `None` if out of bounds.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<i32> = (1..=5).collect();
    /// assert_eq!(list.get(0), Some(&1));
    /// assert_eq!(list.get(4), Some(&5));
    /// assert_eq!(list.get(10), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let (leaf, offset) = self.tree.locate(index);
        Some(self.tree.element(leaf, offset))
    }

    /// Returns a mutable reference to the element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        let (leaf, offset) = self.tree.locate(index);
        Some(self.tree.element_mut(leaf, offset))
    }

    /// Like [`get`](Self::get), but reports the failure as an [`IndexError`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()`.
    pub fn try_get(&self, index: usize) -> Result<&T, IndexError> {
        self.get(index)
            .ok_or_else(|| IndexError::new(index, 1, self.len()))
    }

    /// Returns the first element, or `None` if the list is empty.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element, or `None` if the list is empty.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        let leaf = self.tree.rightmost;
        let count = self.tree.table[leaf].count;
        (count > 0).then(|| self.tree.element(leaf, count - 1))
    }

    /// Replaces the element at `index` and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()`; the list is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<&str> = ["a", "b"].into();
    /// assert_eq!(list.set(1, "z"), Ok("b"));
    /// assert!(list.set(2, "x").is_err());
    /// assert_eq!(list[1], "z");
    /// ```
    pub fn set(&mut self, index: usize, value: T) -> Result<T, IndexError> {
        let length = self.len();
        let slot = self
            .get_mut(index)
            .ok_or(IndexError::new(index, 1, length))?;
        Ok(std::mem::replace(slot, value))
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Appends `value` to the end of the list.
    ///
    /// # Complexity
    ///
    /// O(log N) for the count update; the leaf work is amortized O(1).
    ///
    /// # Panics
    ///
    /// Panics if the backing store cannot grow, like `Vec::push`.
    pub fn add(&mut self, value: T) {
        let index = self.len();
        infallible(self.tree.reserve_for_insert(index));
        self.tree.insert(index, value);
        self.check();
    }

    /// Appends `value`, reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if the backing store or the node table cannot
    /// grow; the list is left unchanged.
    pub fn try_add(&mut self, value: T) -> Result<(), CapacityError> {
        let index = self.len();
        self.tree.reserve_for_insert(index)?;
        self.tree.insert(index, value);
        self.check();
        Ok(())
    }

    /// Inserts `value` at `index`, shifting later elements right.
    ///
    /// `index == len()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index > len()`; the list is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the backing store cannot grow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<char> = ['a', 'c'].into();
    /// list.insert(1, 'b').unwrap();
    /// list.insert(3, 'd').unwrap();
    /// assert_eq!(list.to_string(), "[a, b, c, d]");
    /// assert!(list.insert(9, 'x').is_err());
    /// ```
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), IndexError> {
        self.check_insert_index(index)?;
        infallible(self.tree.reserve_for_insert(index));
        self.tree.insert(index, value);
        self.check();
        Ok(())
    }

    /// Inserts `value` at `index`, reporting every failure as an error.
    ///
    /// # Errors
    ///
    /// Returns [`BucketListError::Index`] if `index > len()` and
    /// [`BucketListError::Capacity`] if the storage cannot grow. Either way
    /// the list is left unchanged.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), BucketListError> {
        self.check_insert_index(index)?;
        self.tree.reserve_for_insert(index)?;
        self.tree.insert(index, value);
        self.check();
        Ok(())
    }

    #[inline]
    fn check_insert_index(&self, index: usize) -> Result<(), IndexError> {
        let length = self.len();
        if index > length {
            return Err(IndexError::new(index, 0, length));
        }
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes and returns the element at `index`, shifting later elements left.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()`; the list is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<i32> = (0..5).collect();
    /// assert_eq!(list.remove_at(1), Ok(1));
    /// assert_eq!(list.len(), 4);
    /// assert!(list.remove_at(4).is_err());
    /// ```
    pub fn remove_at(&mut self, index: usize) -> Result<T, IndexError> {
        let length = self.len();
        if index >= length {
            return Err(IndexError::new(index, 1, length));
        }
        let value = self.tree.remove(index);
        self.check();
        Ok(value)
    }

    /// Removes `count` elements starting at `index`.
    ///
    /// `index` must address an element and the range must end within the
    /// list. A `count` of zero with a valid `index` does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()` or `index + count > len()`;
    /// the list is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let mut list: BucketList<i32, 4, 2> = (0..20).collect();
    /// list.remove_range(2, 15).unwrap();
    /// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [0, 1, 17, 18, 19]);
    /// assert!(list.remove_range(3, 3).is_err());
    /// ```
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<(), IndexError> {
        let length = self.len();
        if index >= length || count > length - index {
            return Err(IndexError::new(index, count, length));
        }
        if count == 0 {
            return Ok(());
        }
        self.tree.remove_range(index, count);
        self.check();
        Ok(())
    }

    /// Removes and returns the last element, or `None` if the list is empty.
    pub fn pop(&mut self) -> Option<T> {
        let length = self.len();
        if length == 0 {
            return None;
        }
        let value = self.tree.remove(length - 1);
        self.check();
        Some(value)
    }

    /// Removes every element, keeping the allocated backing store.
    pub fn clear(&mut self) {
        self.tree.reset();
        self.check();
    }

    // =========================================================================
    // Search and bulk copy
    // =========================================================================

    /// Returns the position of the first element equal to `value`.
    ///
    /// # Complexity
    ///
    /// O(N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<i32> = (0..1000).collect();
    /// assert_eq!(list.index_of(&500), Some(500));
    /// assert_eq!(list.index_of(&1000), None);
    /// ```
    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|element| element == value)
    }

    /// Returns `true` if some element equals `value`.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(value).is_some()
    }

    /// Clones `count` elements starting at `source_index` into
    /// `destination[destination_offset..]`.
    ///
    /// Copies run-by-run, one bulk copy per leaf touched.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the source range leaves the list or the
    /// target range leaves `destination` (reported against the destination
    /// length). Nothing is written in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<u8, 4, 2> = (0..10).collect();
    /// let mut buffer = [0u8; 6];
    /// list.copy_range(&mut buffer, 1, 3, 5).unwrap();
    /// assert_eq!(buffer, [0, 3, 4, 5, 6, 7]);
    /// ```
    pub fn copy_range(
        &self,
        destination: &mut [T],
        destination_offset: usize,
        source_index: usize,
        count: usize,
    ) -> Result<(), IndexError>
    where
        T: Clone,
    {
        let length = self.len();
        if source_index > length || count > length - source_index {
            return Err(IndexError::new(source_index, count, length));
        }
        if destination_offset > destination.len()
            || count > destination.len() - destination_offset
        {
            return Err(IndexError::new(
                destination_offset,
                count,
                destination.len(),
            ));
        }
        if count == 0 {
            return Ok(());
        }

        let target = &mut destination[destination_offset..destination_offset + count];
        let (mut leaf, mut offset) = self.tree.locate(source_index);
        let mut written = 0;
        while written < count {
            let batch = (self.tree.table[leaf].count - offset).min(count - written);
            let run = self.tree.leaf_run(leaf);
            self.tree
                .store
                .clone_into_slice(run, offset, &mut target[written..written + batch]);
            written += batch;
            if written < count {
                leaf = match self.tree.table.next_leaf(leaf) {
                    Some(next) => next,
                    None => unreachable!("copy ran past the last leaf"),
                };
                offset = 0;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Returns an iterator over the elements in positional order.
    ///
    /// The iterator borrows the list, so the list cannot change while it is
    /// alive; calling `iter` again starts a fresh pass.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<i32> = (0..1000).collect();
    /// assert!(list.iter().copied().eq(0..1000));
    /// ```
    #[must_use]
    pub fn iter(&self) -> BucketListIterator<'_, T, LEAF_CAPACITY, BRANCHING_FACTOR, S> {
        self.iter_from(0)
    }

    /// Returns an iterator starting at `index`.
    ///
    /// Starting at or past the end yields nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketlist::bucket::BucketList;
    ///
    /// let list: BucketList<i32, 4, 2> = (0..10).collect();
    /// assert_eq!(list.iter_from(7).copied().collect::<Vec<_>>(), [7, 8, 9]);
    /// assert_eq!(list.iter_from(10).count(), 0);
    /// ```
    #[must_use]
    pub fn iter_from(
        &self,
        index: usize,
    ) -> BucketListIterator<'_, T, LEAF_CAPACITY, BRANCHING_FACTOR, S> {
        let length = self.len();
        if index >= length {
            return BucketListIterator {
                tree: &self.tree,
                leaf: ROOT,
                offset: 0,
                remaining: 0,
            };
        }
        let (leaf, offset) = self.tree.locate(index);
        BucketListIterator {
            tree: &self.tree,
            leaf,
            offset,
            remaining: length - index,
        }
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Checks every structural invariant of the underlying tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found. A correct build never
    /// returns an error.
    #[doc(hidden)]
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.tree.verify()
    }

    /// Runs the consistency check after a mutation when the `verify` feature is on.
    #[inline]
    fn check(&self) {
        #[cfg(feature = "verify")]
        if let Err(violation) = self.tree.verify() {
            panic!("{violation}");
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to the elements of a [`BucketList`].
///
/// Walks the leaf runs left to right, moving to the next leaf through the
/// sibling chains.
pub struct BucketListIterator<'a, T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S>
{
    tree: &'a BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>,
    leaf: NodeIndex,
    offset: usize,
    remaining: usize,
}

impl<'a, T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Iterator
    for BucketListIterator<'a, T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.offset == self.tree.table[self.leaf].count {
            self.leaf = self.tree.table.next_leaf(self.leaf)?;
            self.offset = 0;
        }
        let tree = self.tree;
        let element = tree.element(self.leaf, self.offset);
        self.offset += 1;
        self.remaining -= 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    ExactSizeIterator for BucketListIterator<'_, T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> FusedIterator
    for BucketListIterator<'_, T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> Clone
    for BucketListIterator<'_, T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            leaf: self.leaf,
            offset: self.offset,
            remaining: self.remaining,
        }
    }
}

/// An owning iterator that moves the elements out of a [`BucketList`].
pub struct BucketListIntoIterator<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> {
    tree: BucketTree<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>,
    leaf: NodeIndex,
    offset: usize,
    remaining: usize,
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Iterator
    for BucketListIntoIterator<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.offset == self.tree.table[self.leaf].count {
            self.leaf = self.tree.table.next_leaf(self.leaf)?;
            self.offset = 0;
        }
        let run = self.tree.leaf_run(self.leaf);
        let element = self.tree.store.take(run, self.offset);
        self.offset += 1;
        self.remaining -= 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    ExactSizeIterator for BucketListIntoIterator<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> FusedIterator
    for BucketListIntoIterator<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Default
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    #[inline]
    fn default() -> Self {
        Self {
            tree: BucketTree::new(),
        }
    }
}

impl<T: Clone, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: Clone> Clone
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Extend<T>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        infallible(self.reserve(lower));
        for element in iter {
            self.add(element);
        }
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> FromIterator<T>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::default();
        list.extend(iter);
        list
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> From<Vec<T>>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn from(elements: Vec<T>) -> Self {
        elements.into_iter().collect()
    }
}

impl<
    T,
    const N: usize,
    const LEAF_CAPACITY: usize,
    const BRANCHING_FACTOR: usize,
    S: SlotBuffer<T>,
> From<[T; N]> for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn from(elements: [T; N]) -> Self {
        elements.into_iter().collect()
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> IntoIterator
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    type Item = T;
    type IntoIter = BucketListIntoIterator<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>;

    fn into_iter(self) -> Self::IntoIter {
        let remaining = self.len();
        let leaf = self.tree.table.first_leaf(ROOT);
        BucketListIntoIterator {
            tree: self.tree,
            leaf,
            offset: 0,
            remaining,
        }
    }
}

impl<'a, T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> IntoIterator
    for &'a BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    type Item = &'a T;
    type IntoIter = BucketListIterator<'a, T, LEAF_CAPACITY, BRANCHING_FACTOR, S>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Index<usize>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(element) => element,
            None => panic!("{}", IndexError::new(index, 1, self.len())),
        }
    }
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> IndexMut<usize>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn index_mut(&mut self, index: usize) -> &mut T {
        let length = self.len();
        match self.get_mut(index) {
            Some(element) => element,
            None => panic!("{}", IndexError::new(index, 1, length)),
        }
    }
}

impl<T: PartialEq, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    PartialEq for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Eq
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
}

/// Hashes the length first, then every element in order, so equal lists
/// hash equally regardless of how their trees are shaped.
impl<T: Hash, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Hash
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    fmt::Debug for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>>
    fmt::Display for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> serde::Serialize
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
where
    T: serde::Serialize,
    S: SlotBuffer<T>,
{
    fn serialize<Z>(&self, serializer: Z) -> Result<Z::Ok, Z::Error>
    where
        Z: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct BucketListVisitor<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> {
    marker: std::marker::PhantomData<(T, S)>,
}

#[cfg(feature = "serde")]
impl<'de, T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> serde::de::Visitor<'de>
    for BucketListVisitor<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
where
    T: serde::Deserialize<'de>,
    S: SlotBuffer<T>,
{
    type Value = BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let mut list = BucketList::default();
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        list.reserve(capacity)
            .map_err(<A::Error as serde::de::Error>::custom)?;
        while let Some(element) = seq.next_element()? {
            list.try_add(element)
                .map_err(<A::Error as serde::de::Error>::custom)?;
        }
        Ok(list)
    }
}

#[cfg(feature = "serde")]
impl<'de, T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S> serde::Deserialize<'de>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
where
    T: serde::Deserialize<'de>,
    S: SlotBuffer<T>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(BucketListVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    type Small = BucketList<i32, 4, 2>;

    // =========================================================================
    // Display Tests
    // =========================================================================

    #[rstest]
    fn test_display_empty_list() {
        let list: BucketList<i32> = BucketList::new();
        assert_eq!(format!("{list}"), "[]");
    }

    #[rstest]
    fn test_display_and_debug_multiple_elements() {
        let list: Small = (1..=3).collect();
        assert_eq!(format!("{list}"), "[1, 2, 3]");
        assert_eq!(format!("{list:?}"), "[1, 2, 3]");
    }

    // =========================================================================
    // Access Tests
    // =========================================================================

    #[rstest]
    fn test_first_and_last_follow_edits() {
        let mut list: Small = (0..9).collect();
        assert_eq!(list.first(), Some(&0));
        assert_eq!(list.last(), Some(&8));

        list.remove_at(8).unwrap();
        assert_eq!(list.last(), Some(&7));
        list.insert(0, -1).unwrap();
        assert_eq!(list.first(), Some(&-1));
    }

    #[rstest]
    fn test_last_on_empty_list() {
        let list: Small = Small::default();
        assert_eq!(list.last(), None);
        assert_eq!(list.first(), None);
    }

    #[rstest]
    fn test_try_get_reports_index_error() {
        let list: Small = (0..3).collect();
        assert_eq!(list.try_get(2), Ok(&2));
        assert_eq!(list.try_get(3), Err(IndexError::new(3, 1, 3)));
    }

    #[rstest]
    #[should_panic(expected = "index 3 out of range for length 3")]
    fn test_index_out_of_range_panics() {
        let list: Small = (0..3).collect();
        let _ = list[3];
    }

    #[rstest]
    fn test_index_mut_updates_in_place() {
        let mut list: Small = (0..10).collect();
        list[7] *= 10;
        assert_eq!(list[7], 70);
    }

    // =========================================================================
    // Mutation Tests
    // =========================================================================

    #[rstest]
    fn test_rejected_calls_leave_list_unchanged() {
        let mut list: Small = (0..10).collect();
        let before = list.clone();

        assert!(list.insert(11, 0).is_err());
        assert!(list.remove_at(10).is_err());
        assert!(list.remove_range(5, 6).is_err());
        assert!(list.remove_range(10, 0).is_err());
        assert!(list.set(10, 0).is_err());

        assert_eq!(list, before);
        list.verify().unwrap();
    }

    #[rstest]
    fn test_remove_range_zero_count_is_noop() {
        let mut list: Small = (0..10).collect();
        list.remove_range(4, 0).unwrap();
        assert_eq!(list.len(), 10);
    }

    #[rstest]
    fn test_pop_drains_from_the_back() {
        let mut list: Small = (0..6).collect();
        let mut popped = Vec::new();
        while let Some(value) = list.pop() {
            popped.push(value);
            list.verify().unwrap();
        }
        assert_eq!(popped, [5, 4, 3, 2, 1, 0]);
        assert_eq!(list.node_count(), 1);
    }

    #[rstest]
    fn test_clear_keeps_list_usable() {
        let mut list: Small = (0..50).collect();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.height(), 0);
        list.verify().unwrap();

        list.extend([7, 8]);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [7, 8]);
    }

    #[rstest]
    fn test_try_insert_and_try_add_succeed_in_bounds() {
        let mut list: Small = Small::default();
        list.try_add(2).unwrap();
        list.try_insert(0, 1).unwrap();
        assert_eq!(
            list.try_insert(5, 0),
            Err(BucketListError::Index(IndexError::new(5, 0, 2)))
        );
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [1, 2]);
    }

    // =========================================================================
    // Capacity Tests
    // =========================================================================

    #[rstest]
    #[case(1)]
    #[case(128)]
    #[case(129)]
    #[case(130)]
    #[case(256)]
    #[case(1000)]
    fn test_with_capacity_covers_that_many_adds(#[case] count: u32) {
        let mut list: BucketList<u32> = BucketList::with_capacity(count as usize);
        let runs = list.tree.store.run_capacity();
        for value in 0..count {
            list.add(value);
        }
        assert_eq!(list.tree.store.run_capacity(), runs);
        assert!(list.capacity() >= count as usize);
    }

    #[rstest]
    fn test_new_list_uses_default_leaf_capacity() {
        let list: BucketList<u8> = BucketList::new();
        assert_eq!(list.capacity(), DEFAULT_LEAF_CAPACITY);
    }

    #[rstest]
    #[case(130)]
    #[case(200)]
    #[case(256)]
    fn test_collect_sizes_buffer_exactly(#[case] count: u32) {
        let list: BucketList<u32> = (0..count).collect();
        assert_eq!(list.capacity(), 256);
    }

    #[rstest]
    fn test_reserve_counts_room_in_partial_leaf() {
        let mut list: Small = (0..6).collect();
        list.reserve(10).unwrap();
        let capacity = list.capacity();
        list.extend(100..110);

        assert_eq!(list.capacity(), capacity);
        list.verify().unwrap();
    }

    #[rstest]
    fn test_insert_into_leaf_with_room_does_not_grow() {
        let mut list: Small = (0..3).collect();
        let capacity = list.capacity();
        list.insert(1, 9).unwrap();

        assert_eq!(list.capacity(), capacity);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [0, 9, 1, 2]);
    }

    // =========================================================================
    // Copy Tests
    // =========================================================================

    #[rstest]
    fn test_copy_range_rejects_short_destination() {
        let list: Small = (0..10).collect();
        let mut buffer = [0; 4];
        assert_eq!(
            list.copy_range(&mut buffer, 2, 0, 3),
            Err(IndexError::new(2, 3, 4))
        );
        assert_eq!(buffer, [0; 4]);
    }

    #[rstest]
    fn test_copy_range_rejects_source_overrun() {
        let list: Small = (0..10).collect();
        let mut buffer = [0; 10];
        assert_eq!(
            list.copy_range(&mut buffer, 0, 8, 3),
            Err(IndexError::new(8, 3, 10))
        );
    }

    #[rstest]
    fn test_copy_range_across_many_leaves() {
        let list: Small = (0..100).collect();
        let mut buffer = vec![0; 60];
        list.copy_range(&mut buffer, 0, 20, 60).unwrap();
        assert_eq!(buffer, (20..80).collect::<Vec<_>>());
    }

    // =========================================================================
    // Iterator Tests
    // =========================================================================

    #[rstest]
    fn test_iterator_is_exact_size_and_restartable() {
        let list: Small = (0..37).collect();
        let mut iterator = list.iter();
        assert_eq!(iterator.len(), 37);
        iterator.nth(10);
        assert_eq!(iterator.len(), 26);

        assert!(list.iter().copied().eq(0..37));
        assert!(list.iter().copied().eq(0..37));
    }

    #[rstest]
    fn test_into_iterator_moves_owned_values() {
        let list: BucketList<String, 4, 2> = (0..20).map(|value| value.to_string()).collect();
        let collected: Vec<String> = list.into_iter().collect();
        assert_eq!(collected.len(), 20);
        assert_eq!(collected[19], "19");
    }

    #[rstest]
    fn test_partially_consumed_into_iterator_drops_rest() {
        let list: BucketList<String, 4, 2> = (0..20).map(|value| value.to_string()).collect();
        let mut iterator = list.into_iter();
        assert_eq!(iterator.next().as_deref(), Some("0"));
        drop(iterator);
    }

    // =========================================================================
    // Equality and Hash Tests
    // =========================================================================

    #[rstest]
    fn test_equal_contents_with_different_shapes_are_equal() {
        use std::collections::hash_map::DefaultHasher;

        let appended: Small = (0..30).collect();
        let mut prepended: Small = Small::default();
        for value in (0..30).rev() {
            prepended.insert(0, value).unwrap();
        }
        assert_eq!(appended, prepended);

        let mut left = DefaultHasher::new();
        let mut right = DefaultHasher::new();
        appended.hash(&mut left);
        prepended.hash(&mut right);
        assert_eq!(left.finish(), right.finish());
    }

    #[rstest]
    fn test_clone_is_independent() {
        let original: Small = (0..20).collect();
        let mut copy = original.clone();
        copy.remove_range(0, 10).unwrap();

        assert_eq!(original.len(), 20);
        assert_eq!(copy.len(), 10);
        original.verify().unwrap();
        copy.verify().unwrap();
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_as_sequence() {
        let list: BucketList<i32, 4, 2> = (1..=6).collect();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2,3,4,5,6]");
    }

    #[rstest]
    fn test_deserialize_builds_consistent_tree() {
        let list: BucketList<i32, 4, 2> = serde_json::from_str("[5,4,3,2,1,0,9,8,7]").unwrap();
        assert_eq!(list.len(), 9);
        assert_eq!(list[6], 9);
        list.verify().unwrap();
    }
}
