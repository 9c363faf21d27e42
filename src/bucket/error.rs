//! Error types for bucket list operations.
//!
//! Every positional check runs before the list is touched, so an `Err` from
//! any operation means the list is exactly as it was before the call.

use std::fmt;

/// An index or range fell outside the valid bounds of the list.
///
/// `count` is the length of the requested range; single-element operations
/// report a count of `1`, insertion reports `0`.
///
/// # Examples
///
/// ```rust
/// use bucketlist::bucket::{BucketList, IndexError};
///
/// let mut list: BucketList<i32> = BucketList::new();
/// list.add(1);
/// assert_eq!(
///     list.remove_at(5),
///     Err(IndexError { index: 5, count: 1, length: 1 })
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexError {
    /// The first position of the rejected access.
    pub index: usize,
    /// The number of elements the access covered.
    pub count: usize,
    /// The length of the sequence the access was checked against.
    pub length: usize,
}

impl IndexError {
    #[inline]
    pub(crate) const fn new(index: usize, count: usize, length: usize) -> Self {
        Self {
            index,
            count,
            length,
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count <= 1 {
            write!(
                formatter,
                "index {} out of range for length {}",
                self.index, self.length
            )
        } else {
            write!(
                formatter,
                "range {}..{} out of range for length {}",
                self.index,
                self.index.saturating_add(self.count),
                self.length
            )
        }
    }
}

impl std::error::Error for IndexError {}

/// The backing store or the node table could not grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// The number of slots the failed reservation asked for.
    pub requested: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "failed to reserve {} slots for the bucket list",
            self.requested
        )
    }
}

impl std::error::Error for CapacityError {}

/// The internal consistency check found a broken invariant.
///
/// This never happens in a correct build; it exists so tests and the
/// `verify` feature can report what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Human readable description of the broken invariant.
    pub detail: String,
}

impl InvariantViolation {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "bucket list invariant violated: {}", self.detail)
    }
}

impl std::error::Error for InvariantViolation {}

/// Unified error for all bucket list operations.
///
/// # Examples
///
/// ```rust
/// use bucketlist::bucket::{BucketListError, IndexError};
///
/// let error = BucketListError::from(IndexError { index: 3, count: 1, length: 2 });
/// assert_eq!(format!("{error}"), "index 3 out of range for length 2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketListError {
    /// A position or range was out of bounds.
    Index(IndexError),
    /// Growing the storage failed.
    Capacity(CapacityError),
    /// The consistency check failed.
    Invariant(InvariantViolation),
}

impl fmt::Display for BucketListError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(error) => write!(formatter, "{error}"),
            Self::Capacity(error) => write!(formatter, "{error}"),
            Self::Invariant(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for BucketListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Index(error) => Some(error),
            Self::Capacity(error) => Some(error),
            Self::Invariant(error) => Some(error),
        }
    }
}

impl From<IndexError> for BucketListError {
    fn from(error: IndexError) -> Self {
        Self::Index(error)
    }
}

impl From<CapacityError> for BucketListError {
    fn from(error: CapacityError) -> Self {
        Self::Capacity(error)
    }
}

impl From<InvariantViolation> for BucketListError {
    fn from(error: InvariantViolation) -> Self {
        Self::Invariant(error)
    }
}
