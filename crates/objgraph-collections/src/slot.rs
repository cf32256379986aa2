//! The tagged backing slot shared by all collections.

use std::sync::Arc;

use objgraph_types::{GraphNode, ObjectId, PersistedReference, ReferencePath};

use crate::weak::WeakCell;

/// One backing slot: a live reference or a tombstone.
///
/// Collection algorithms branch on this tag explicitly. Tombstones are
/// created only by explicit deletion or path recording — a live slot whose
/// weak cell has expired is skipped from live views like a tombstone, but is
/// never converted into one.
#[derive(Clone, Debug)]
pub enum Slot<T: GraphNode> {
    /// Live reference to a materialized object.
    Live(WeakCell<T>),
    /// Tombstone for an unloaded or deleted target.
    Dead(ReferencePath),
}

impl<T: GraphNode> Slot<T> {
    /// A live slot referencing `object`.
    pub fn live(object: &Arc<T>) -> Self {
        Self::Live(WeakCell::new(object))
    }

    /// A tombstone slot for `path`.
    pub fn dead(path: ReferencePath) -> Self {
        Self::Dead(path)
    }

    /// `true` for a live slot (even one whose weak cell has since expired).
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// `true` for a tombstone slot.
    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Dead(_))
    }

    /// Resolve a live slot to a strong handle. `None` for tombstones and for
    /// live slots whose referent was torn down.
    pub fn resolve(&self) -> Option<Arc<T>> {
        match self {
            Self::Live(cell) => cell.get(),
            Self::Dead(_) => None,
        }
    }

    /// The tombstone path, if this slot is dead.
    pub fn dead_path(&self) -> Option<&ReferencePath> {
        match self {
            Self::Live(_) => None,
            Self::Dead(path) => Some(path),
        }
    }

    /// The wire form of this slot. An expired live slot still encodes as a
    /// live reference id.
    pub fn to_persisted(&self) -> PersistedReference {
        match self {
            Self::Live(cell) => PersistedReference::live(cell.id()),
            Self::Dead(path) => PersistedReference::dead(*path),
        }
    }

    /// Rebuild a slot from its wire form during a bulk reload.
    ///
    /// `resolve` is the reload layer's lookup into the session object table.
    /// A live reference whose target is absent from the snapshot becomes a
    /// permanent tombstone rather than failing the load.
    pub fn from_persisted<F>(reference: &PersistedReference, resolve: F) -> Self
    where
        F: FnOnce(&ObjectId) -> Option<Arc<T>>,
    {
        match reference {
            PersistedReference::Live { id } => match resolve(id) {
                Some(object) => Self::live(&object),
                None => Self::Dead(ReferencePath::to(*id)),
            },
            PersistedReference::Dead { path } => Self::Dead(*path),
        }
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
    fn live_slot_resolves() {
        let object = node();
        let slot = Slot::live(&object);
        assert!(slot.is_live());
        assert_eq!(slot.resolve().unwrap().id(), object.id());
        assert_eq!(slot.to_persisted(), PersistedReference::live(object.id()));
    }

    #[test]
    fn dead_slot_never_resolves() {
        let path = ReferencePath::to(ObjectId::new());
        let slot: Slot<Node> = Slot::dead(path);
        assert!(slot.is_dead());
        assert!(slot.resolve().is_none());
        assert_eq!(slot.dead_path(), Some(&path));
        assert_eq!(slot.to_persisted(), PersistedReference::dead(path));
    }

    #[test]
    fn expired_live_slot_still_encodes_as_live() {
        let object = node();
        let id = object.id();
        let slot = Slot::live(&object);
        drop(object);
        assert!(slot.is_live());
        assert!(slot.resolve().is_none());
        // Expiry must not fabricate a tombstone.
        assert_eq!(slot.to_persisted(), PersistedReference::live(id));
    }

    #[test]
    fn reload_resolves_live_references() {
        let object = node();
        let reference = PersistedReference::live(object.id());
        let slot = Slot::from_persisted(&reference, |id| {
            assert_eq!(*id, object.id());
            Some(object.clone())
        });
        assert_eq!(slot.resolve().unwrap().id(), object.id());
    }

    #[test]
    fn reload_tombstones_unresolvable_live_references() {
        let id = ObjectId::new();
        let slot: Slot<Node> = Slot::from_persisted(&PersistedReference::live(id), |_| None);
        assert_eq!(slot.dead_path(), Some(&ReferencePath::to(id)));
    }

    #[test]
    fn reload_preserves_tombstones() {
        let path = ReferencePath::to_branch(ObjectId::new(), ObjectId::new());
        let slot: Slot<Node> =
            Slot::from_persisted(&PersistedReference::dead(path), |_| unreachable!());
        assert_eq!(slot.dead_path(), Some(&path));
    }
}
