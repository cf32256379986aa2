//! Primitive reference collections for the object graph core.
//!
//! These are the containers behind multi-valued relationship properties of
//! graph objects. Every stored slot is either a live (weak) reference to a
//! materialized object or a [`ReferencePath`] tombstone standing in for a
//! target that is unloaded or deleted. Tombstones are hidden from the
//! application-facing element APIs but preserved in the backing so the
//! persistence layer can round-trip them and revive them when a fault
//! resolves.
//!
//! # Architecture
//!
//! - **Mutation gating**: a collection is either permanently mutable or
//!   mutable only inside a nestable `begin_mutation`/`end_mutation` bracket.
//!   Structural mutation outside a bracket is a contract violation surfaced
//!   as an error, never swallowed. Prefer [`ReferenceCollection::scoped_mutation`],
//!   which closes the bracket on every exit path.
//! - **Live vs. dead slots**: collection algorithms branch explicitly on the
//!   [`Slot`] tag. Dead entries are excluded from counts, enumeration, and
//!   indexing, and exposed separately for diagnostics and reconciliation.
//! - **Weak references**: collections never own their elements. A
//!   [`WeakCell`] whose referent has been torn down reads as empty; expiry is
//!   observed lazily and never fabricates a tombstone record.
//! - **Owner notification**: every successful structural mutation makes one
//!   direct [`UpdateObserver::collection_did_update`] call so the owning
//!   object can register itself with the session's change ledger.
//!
//! # Modules
//!
//! - [`error`] — [`CollectionError`] and the crate [`Result`] alias
//! - [`protocol`] — The [`ReferenceCollection`] contract and [`MutationScope`]
//! - [`weak`] — [`WeakCell`], the non-owning element handle
//! - [`slot`] — [`Slot`], the live/dead tagged backing slot
//! - [`observer`] — The [`UpdateObserver`] owner-notification seam
//! - [`set`] — [`MutableSet`]
//! - [`array`] — [`MutableArray`]
//! - [`dict`] — [`MutableDictionary`]
//!
//! [`ReferencePath`]: objgraph_types::ReferencePath

pub mod array;
pub mod dict;
pub mod error;
pub mod observer;
pub mod protocol;
pub mod set;
pub mod slot;
pub mod weak;

pub use array::MutableArray;
pub use dict::MutableDictionary;
pub use error::{CollectionError, Result};
pub use observer::{UpdateError, UpdateObserver};
pub use protocol::{MutationScope, ReferenceCollection};
pub use set::MutableSet;
pub use slot::Slot;
pub use weak::WeakCell;
