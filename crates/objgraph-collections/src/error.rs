//! Error types for collection operations.

use thiserror::Error;

use crate::observer::UpdateError;

/// Errors that can occur during collection operations.
///
/// `NotMutable` and `UnbalancedEndMutation` report contract violations in the
/// caller's mutation discipline. They are not recoverable by retrying — they
/// indicate a broken invariant elsewhere — and must be propagated, never
/// masked.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A structural mutation was attempted while the collection is immutable
    /// (not permanently mutable and no mutation bracket open).
    #[error("collection is immutable outside a mutation bracket")]
    NotMutable,

    /// `end_mutation` was called with no open bracket (begin/end mismatch).
    #[error("end_mutation called with no open mutation bracket")]
    UnbalancedEndMutation,

    /// An external (visible) index was out of bounds.
    #[error("external index {index} out of bounds (visible length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A backing index was out of bounds.
    #[error("backing index {index} out of bounds (backing length {len})")]
    BackingIndexOutOfBounds { index: usize, len: usize },

    /// The owning object rejected the did-update notification.
    #[error(transparent)]
    Observer(#[from] UpdateError),
}

/// Convenience type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;
