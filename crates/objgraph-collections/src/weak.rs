//! Non-owning element handles.

use std::fmt;
use std::sync::{Arc, Weak};

use objgraph_types::{GraphNode, ObjectId};

/// A non-owning handle to a graph object.
///
/// Ownership of graph objects is held exclusively by the session's object
/// table; collections store `WeakCell`s so relationship properties never
/// force retention cycles across the graph. The referent's [`ObjectId`] is
/// captured at creation, so a cell whose referent has been torn down still
/// serializes as a live reference id — expiry is observed lazily, at the
/// next access, and never fabricates a tombstone record.
pub struct WeakCell<T: GraphNode> {
    id: ObjectId,
    handle: Weak<T>,
}

impl<T: GraphNode> WeakCell<T> {
    /// Create a cell referencing `object` without taking ownership.
    pub fn new(object: &Arc<T>) -> Self {
        Self {
            id: object.id(),
            handle: Arc::downgrade(object),
        }
    }

    /// The referent's identifier, valid even after the referent is gone.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Resolve to a strong handle, or `None` if the referent was torn down.
    pub fn get(&self) -> Option<Arc<T>> {
        self.handle.upgrade()
    }

    /// `true` once the referent has been deallocated.
    pub fn is_expired(&self) -> bool {
        self.handle.strong_count() == 0
    }

    /// Referential identity: does this cell point at exactly `object`?
    pub fn refers_to(&self, object: &Arc<T>) -> bool {
        self.handle.as_ptr() == Arc::as_ptr(object)
    }
}

impl<T: GraphNode> Clone for WeakCell<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handle: self.handle.clone(),
        }
    }
}

impl<T: GraphNode> fmt::Debug for WeakCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeakCell({}{})",
            self.id.short_id(),
            if self.is_expired() { ", expired" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        id: ObjectId,
    }

    impl GraphNode for Node {
        fn id(&self) -> ObjectId {
            self.id
        }
    }

    fn node() -> Arc<Node> {
        Arc::new(Node {
            id: ObjectId::new(),
        })
    }

    #[test]
    fn resolves_while_referent_lives() {
        let object = node();
        let cell = WeakCell::new(&object);
        assert!(!cell.is_expired());
        assert!(cell.refers_to(&object));
        assert_eq!(cell.get().unwrap().id(), object.id());
    }

    #[test]
    fn expires_to_none_without_failing() {
        let object = node();
        let id = object.id();
        let cell = WeakCell::new(&object);
        drop(object);
        assert!(cell.is_expired());
        assert!(cell.get().is_none());
        // The identifier survives expiry.
        assert_eq!(cell.id(), id);
    }

    #[test]
    fn identity_not_value_equality() {
        let a = node();
        let b = node();
        let cell = WeakCell::new(&a);
        assert!(cell.refers_to(&a));
        assert!(!cell.refers_to(&b));
    }
}
