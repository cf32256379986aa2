//! Error types for the foundation crate.

use thiserror::Error;

/// Errors that can occur constructing or parsing foundation types.
#[derive(Debug, Error)]
pub enum TypeError {
    /// The string is not a valid object identifier.
    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// The string is not a valid reference path.
    #[error("invalid reference path: {0}")]
    InvalidPath(String),
}
