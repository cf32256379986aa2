//! Foundation types for the object graph core.
//!
//! This crate provides the identity and wire types shared by the primitive
//! reference collections and the context change ledger. Every other objgraph
//! crate depends on `objgraph-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Stable UUID v7 identifier for a graph object
//! - [`ReferencePath`] — Tombstone payload naming a target that is not
//!   presently resolvable (unloaded or deleted)
//! - [`PersistedReference`] — Tagged wire form of one collection slot,
//!   either a live identifier or a tombstone path
//! - [`GraphNode`] — The core's view of a host graph object

pub mod error;
pub mod id;
pub mod node;
pub mod path;
pub mod reference;

pub use error::TypeError;
pub use id::ObjectId;
pub use node::GraphNode;
pub use path::ReferencePath;
pub use reference::PersistedReference;
