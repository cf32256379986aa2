//! Error types for session and ledger operations.

use thiserror::Error;
use objgraph_types::ObjectId;

/// Errors that can occur during ledger and session operations.
///
/// `NotLoaded` reports a contract violation — updates can only be recorded
/// for loaded objects — and must be propagated, never masked.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An update was recorded for an object the session has not loaded.
    #[error("object {id} is not loaded in this session")]
    NotLoaded { id: ObjectId },

    /// An object with this identifier is already materialized in the
    /// session's object table.
    #[error("object {id} is already loaded in this session")]
    AlreadyLoaded { id: ObjectId },

    /// A lock guarding session state was poisoned by a panicking thread.
    #[error("session lock poisoned: {0}")]
    Poisoned(String),
}

/// Convenience type alias for ledger and session operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
