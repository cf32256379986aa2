//! Working-session state for the object graph core.
//!
//! A working session is the in-memory scope that owns a coherent view of
//! loaded graph objects and their pending changes prior to commit. This
//! crate provides the two halves of that scope:
//!
//! - [`ChangeLedger`] — classifies every object known to the session into
//!   loaded / inserted / updated / unchanged, derives the changed and
//!   root-object views, and resets correctly across commit boundaries.
//! - [`WorkingContext`] — the session itself: the object table that holds
//!   exclusive ownership of materialized objects, fault resolution, commit
//!   hand-off to the external store writer, and the did-update receiver that
//!   turns collection mutations into ledger updates.
//!
//! # Modules
//!
//! - [`error`] — [`LedgerError`] and the crate [`Result`] alias
//! - [`ledger`] — The [`ChangeLedger`]
//! - [`session`] — [`WorkingContext`] and [`ChangeSet`]

pub mod error;
pub mod ledger;
pub mod session;

pub use error::{LedgerError, Result};
pub use ledger::ChangeLedger;
pub use session::{ChangeSet, WorkingContext};
