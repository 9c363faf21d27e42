//! The bucket list and the machinery underneath it.
//!
//! A [`BucketList`] stores its elements in leaf runs of at most
//! `LEAF_CAPACITY` elements, all carved out of one flat slot buffer. A tree of
//! node records sits on top:
//!
//! - every node knows how many elements its subtree holds,
//! - siblings under one parent form a doubly linked chain,
//! - every non-root node points back at its parent.
//!
//! Positional operations descend from the root by subtracting child counts,
//! touch one leaf run, and walk back up adjusting counts. Full leaves split,
//! overfull internal nodes split at a child boundary, and the root gains a
//! level when it splits. Emptied leaves are unlinked together with any
//! ancestor they leave empty, and the root drops a level when it is left with
//! a single child.
//!
//! # Storage modes
//!
//! The slot buffer is a type parameter implementing [`SlotBuffer`]:
//!
//! - [`SafeSlots`] (the default) moves elements one by one and clears every
//!   vacated slot, so removed values are dropped immediately.
//! - [`CopySlots`] moves whole runs with `copy_within` and is available for
//!   `Copy + Default` values through [`CopyBucketList`].
//!
//! # Examples
//!
//! ```rust
//! use bucketlist::bucket::{BucketList, CopyBucketList};
//!
//! let mut names: BucketList<String> = BucketList::new();
//! names.add("b".to_string());
//! names.insert(0, "a".to_string()).unwrap();
//! assert_eq!(names.index_of(&"b".to_string()), Some(1));
//!
//! let numbers: CopyBucketList<u32> = (0..10).collect();
//! assert_eq!(numbers.iter().sum::<u32>(), 45);
//! ```

mod error;
mod list;
mod node;
mod slots;
mod store;
mod tree;
mod verify;

pub use error::{BucketListError, CapacityError, IndexError, InvariantViolation};
pub use list::{BucketList, BucketListIntoIterator, BucketListIterator, CopyBucketList};
pub use slots::{CopySlots, SafeSlots, SlotBuffer};

/// Leaf capacity used by [`BucketList::new`].
pub const DEFAULT_LEAF_CAPACITY: usize = 128;

/// Branching factor used by [`BucketList::new`].
pub const DEFAULT_BRANCHING_FACTOR: usize = 8;

static_assertions::const_assert!(DEFAULT_LEAF_CAPACITY >= 2);
static_assertions::const_assert!(DEFAULT_BRANCHING_FACTOR >= 2);
