//! Flat element buffers underneath the backing store.
//!
//! A [`SlotBuffer`] is a growable array of element slots with the handful of
//! data-movement primitives the tree needs. Two storage modes exist:
//!
//! - [`SafeSlots`]: works for any `T`. Every slot is an `Option<T>`, so moving
//!   an element out of a slot leaves `None` behind and a removed logical slot
//!   never keeps a live value (and whatever it owns) alive.
//! - [`CopySlots`]: for plain `Copy` values. Runs are moved with
//!   `copy_within` (memmove semantics) and vacated slots are left as they are,
//!   since the tree never reads a slot beyond a leaf's element count.
//!
//! The mode is chosen by type when the list is declared; see
//! [`CopyBucketList`](super::CopyBucketList).

use super::error::CapacityError;

/// A growable buffer of element slots.
///
/// Slot indices are absolute. Callers only read slots they previously wrote
/// and have not vacated; reading a vacant slot is a logic error.
pub trait SlotBuffer<T>: Default {
    /// Returns the number of allocated slots.
    fn len(&self) -> usize;

    /// Returns `true` if no slots are allocated.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows the buffer to exactly `length` slots.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if the allocation fails.
    fn try_grow(&mut self, length: usize) -> Result<(), CapacityError>;

    /// Returns a reference to the element in `slot`.
    fn get(&self, slot: usize) -> &T;

    /// Returns a mutable reference to the element in `slot`.
    fn get_mut(&mut self, slot: usize) -> &mut T;

    /// Writes `value` into the vacant `slot`.
    fn put(&mut self, slot: usize, value: T);

    /// Moves the element out of `slot`, leaving it vacant.
    fn take(&mut self, slot: usize) -> T;

    /// Moves `count` elements from `source` to a higher `destination`.
    ///
    /// Ranges may overlap; elements are moved back to front.
    fn move_right(&mut self, source: usize, destination: usize, count: usize);

    /// Moves `count` elements from `source` to a lower `destination`.
    ///
    /// Ranges may overlap; elements are moved front to back.
    fn move_left(&mut self, source: usize, destination: usize, count: usize);

    /// Clones `destination.len()` elements starting at `start` into `destination`.
    fn clone_into_slice(&self, start: usize, destination: &mut [T])
    where
        T: Clone;

    /// Vacates every slot while keeping the allocation.
    fn clear(&mut self);

    /// Moves `count` elements between arbitrary positions.
    #[inline]
    fn relocate(&mut self, source: usize, destination: usize, count: usize) {
        if destination > source {
            self.move_right(source, destination, count);
        } else if destination < source {
            self.move_left(source, destination, count);
        }
    }
}

// =============================================================================
// SafeSlots
// =============================================================================

/// Element-wise slot buffer that clears every vacated slot.
#[derive(Clone)]
pub struct SafeSlots<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for SafeSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SlotBuffer<T> for SafeSlots<T> {
    #[inline]
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn try_grow(&mut self, length: usize) -> Result<(), CapacityError> {
        let additional = length.saturating_sub(self.slots.len());
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| CapacityError { requested: length })?;
        self.slots.resize_with(length, || None);
        Ok(())
    }

    #[inline]
    fn get(&self, slot: usize) -> &T {
        match &self.slots[slot] {
            Some(element) => element,
            None => unreachable!("read of vacant slot {slot}"),
        }
    }

    #[inline]
    fn get_mut(&mut self, slot: usize) -> &mut T {
        match &mut self.slots[slot] {
            Some(element) => element,
            None => unreachable!("write through vacant slot {slot}"),
        }
    }

    #[inline]
    fn put(&mut self, slot: usize, value: T) {
        debug_assert!(self.slots[slot].is_none(), "slot {slot} is occupied");
        self.slots[slot] = Some(value);
    }

    #[inline]
    fn take(&mut self, slot: usize) -> T {
        match self.slots[slot].take() {
            Some(element) => element,
            None => unreachable!("take from vacant slot {slot}"),
        }
    }

    fn move_right(&mut self, source: usize, destination: usize, count: usize) {
        debug_assert!(destination >= source);
        for offset in (0..count).rev() {
            self.slots[destination + offset] = self.slots[source + offset].take();
        }
    }

    fn move_left(&mut self, source: usize, destination: usize, count: usize) {
        debug_assert!(destination <= source);
        for offset in 0..count {
            self.slots[destination + offset] = self.slots[source + offset].take();
        }
    }

    fn clone_into_slice(&self, start: usize, destination: &mut [T])
    where
        T: Clone,
    {
        let source = &self.slots[start..start + destination.len()];
        for (target, slot) in destination.iter_mut().zip(source) {
            match slot {
                Some(element) => target.clone_from(element),
                None => unreachable!("copy from vacant slot"),
            }
        }
    }

    fn clear(&mut self) {
        self.slots.fill_with(|| None);
    }
}

// =============================================================================
// CopySlots
// =============================================================================

/// Block-copy slot buffer for plain values.
///
/// Vacated slots keep stale bit patterns; they are overwritten before being
/// read again.
#[derive(Clone)]
pub struct CopySlots<T> {
    slots: Vec<T>,
}

impl<T> Default for CopySlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Copy + Default> SlotBuffer<T> for CopySlots<T> {
    #[inline]
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn try_grow(&mut self, length: usize) -> Result<(), CapacityError> {
        let additional = length.saturating_sub(self.slots.len());
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| CapacityError { requested: length })?;
        self.slots.resize(length, T::default());
        Ok(())
    }

    #[inline]
    fn get(&self, slot: usize) -> &T {
        &self.slots[slot]
    }

    #[inline]
    fn get_mut(&mut self, slot: usize) -> &mut T {
        &mut self.slots[slot]
    }

    #[inline]
    fn put(&mut self, slot: usize, value: T) {
        self.slots[slot] = value;
    }

    #[inline]
    fn take(&mut self, slot: usize) -> T {
        self.slots[slot]
    }

    #[inline]
    fn move_right(&mut self, source: usize, destination: usize, count: usize) {
        self.slots.copy_within(source..source + count, destination);
    }

    #[inline]
    fn move_left(&mut self, source: usize, destination: usize, count: usize) {
        self.slots.copy_within(source..source + count, destination);
    }

    fn clone_into_slice(&self, start: usize, destination: &mut [T])
    where
        T: Clone,
    {
        destination.copy_from_slice(&self.slots[start..start + destination.len()]);
    }

    fn clear(&mut self) {}
}
