//! A positional sequence abstraction.
//!
//! [`Sequence`] captures the indexed operations a bucket list offers, so code
//! can be written once and run against either a [`BucketList`] or a plain
//! `Vec`. The `Vec` implementation doubles as the reference model the
//! property tests compare against.
//!
//! # Examples
//!
//! ```rust
//! use bucketlist::bucket::BucketList;
//! use bucketlist::sequence::Sequence;
//!
//! fn rotate_left<S: Sequence<i32>>(sequence: &mut S) {
//!     if let Ok(front) = sequence.remove_at(0) {
//!         sequence.add(front);
//!     }
//! }
//!
//! let mut list: BucketList<i32> = (1..=3).collect();
//! let mut vector = vec![1, 2, 3];
//! rotate_left(&mut list);
//! rotate_left(&mut vector);
//! assert!(list.iter().eq(vector.iter()));
//! ```

use crate::bucket::{BucketList, IndexError, SlotBuffer};

/// Indexed access, insertion and removal over an ordered sequence.
///
/// # Laws
///
/// For every implementation:
///
/// - `insert(i, x)` followed by `get(i)` yields `x`, and `len` grows by one.
/// - `remove_at(i)` returns what `get(i)` returned, and `len` shrinks by one.
/// - `remove_range(i, k)` leaves the same contents as `k` calls to
///   `remove_at(i)`.
/// - A call that returns `Err` leaves the sequence unchanged.
pub trait Sequence<T> {
    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, or `None` if out of bounds.
    fn get(&self, index: usize) -> Option<&T>;

    /// Replaces the element at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()`.
    fn set(&mut self, index: usize, value: T) -> Result<T, IndexError>;

    /// Appends `value`.
    fn add(&mut self, value: T);

    /// Inserts `value` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index > len()`.
    fn insert(&mut self, index: usize, value: T) -> Result<(), IndexError>;

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()`.
    fn remove_at(&mut self, index: usize) -> Result<T, IndexError>;

    /// Removes `count` elements starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `index >= len()` or `index + count > len()`.
    fn remove_range(&mut self, index: usize, count: usize) -> Result<(), IndexError>;
}

impl<T, const LEAF_CAPACITY: usize, const BRANCHING_FACTOR: usize, S: SlotBuffer<T>> Sequence<T>
    for BucketList<T, LEAF_CAPACITY, BRANCHING_FACTOR, S>
{
    #[inline]
    fn len(&self) -> usize {
        Self::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&T> {
        Self::get(self, index)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) -> Result<T, IndexError> {
        Self::set(self, index, value)
    }

    #[inline]
    fn add(&mut self, value: T) {
        Self::add(self, value);
    }

    #[inline]
    fn insert(&mut self, index: usize, value: T) -> Result<(), IndexError> {
        Self::insert(self, index, value)
    }

    #[inline]
    fn remove_at(&mut self, index: usize) -> Result<T, IndexError> {
        Self::remove_at(self, index)
    }

    #[inline]
    fn remove_range(&mut self, index: usize, count: usize) -> Result<(), IndexError> {
        Self::remove_range(self, index, count)
    }
}

impl<T> Sequence<T> for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    fn set(&mut self, index: usize, value: T) -> Result<T, IndexError> {
        let length = self.as_slice().len();
        let slot = self
            .as_mut_slice()
            .get_mut(index)
            .ok_or(IndexError::new(index, 1, length))?;
        Ok(std::mem::replace(slot, value))
    }

    #[inline]
    fn add(&mut self, value: T) {
        self.push(value);
    }

    fn insert(&mut self, index: usize, value: T) -> Result<(), IndexError> {
        let length = self.as_slice().len();
        if index > length {
            return Err(IndexError::new(index, 0, length));
        }
        Vec::insert(self, index, value);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Result<T, IndexError> {
        let length = self.as_slice().len();
        if index >= length {
            return Err(IndexError::new(index, 1, length));
        }
        Ok(self.remove(index))
    }

    fn remove_range(&mut self, index: usize, count: usize) -> Result<(), IndexError> {
        let length = self.as_slice().len();
        if index >= length || count > length - index {
            return Err(IndexError::new(index, count, length));
        }
        self.drain(index..index + count);
        Ok(())
    }
}
