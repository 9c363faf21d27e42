//! # bucketlist
//!
//! An indexable ordered collection with logarithmic positional insertion and
//! removal.
//!
//! ## Overview
//!
//! A [`BucketList`](bucket::BucketList) behaves like a `Vec` that does not
//! shift its whole tail on every insert or remove. Elements are kept in
//! fixed-capacity leaf runs of one flat buffer, and a multi-level count tree
//! over the runs turns every positional operation into a short descent.
//!
//! - **Bucket list**: get, set, add, insert, remove, range removal, search,
//!   bulk copy and iteration
//! - **Storage modes**: element-wise safe slots or block-copy slots
//! - **Sequence**: a positional trait shared with `Vec`
//!
//! ## Feature Flags
//!
//! - `sequence`: the [`Sequence`](sequence::Sequence) trait (enabled by default)
//! - `serde`: `Serialize` / `Deserialize` for bucket lists
//! - `tracing`: structural events (splits, level changes, collapses) through `tracing`
//! - `verify`: run the full consistency check after every mutation
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use bucketlist::prelude::*;
//!
//! let mut list: BucketList<i32> = BucketList::new();
//! list.extend([10, 20, 30]);
//! list.insert(1, 15).unwrap();
//! assert_eq!(list.to_string(), "[10, 15, 20, 30]");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use bucketlist::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bucket::*;

    #[cfg(feature = "sequence")]
    pub use crate::sequence::*;
}

mod tracing_helpers;

pub mod bucket;

#[cfg(feature = "sequence")]
pub mod sequence;
