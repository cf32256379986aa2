//! Unordered reference set.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use objgraph_types::{GraphNode, ObjectId, PersistedReference, ReferencePath};

use crate::error::Result;
use crate::observer::{OwnerBinding, UpdateObserver};
use crate::protocol::{MutationGate, ReferenceCollection};
use crate::slot::Slot;
use crate::weak::WeakCell;

/// Unordered container of unique references.
///
/// Live entries are unique by referential identity; tombstone paths are
/// unique by value. The live view (`len`, `contains`, `iter`) hides dead
/// entries and lazily skips expired weak cells; the raw reference API
/// (`add_reference`, `remove_reference`, `contains_reference`) operates on
/// the backing storage and is what the tombstone conversion paths use.
pub struct MutableSet<T: GraphNode> {
    gate: MutationGate,
    backing: Vec<WeakCell<T>>,
    dead: BTreeSet<ReferencePath>,
    binding: OwnerBinding,
}

impl<T: GraphNode> MutableSet<T> {
    /// An empty set, immutable outside mutation brackets.
    pub fn new() -> Self {
        Self::with_gate(MutationGate::gated())
    }

    /// An empty, permanently mutable set.
    pub fn permanently_mutable() -> Self {
        Self::with_gate(MutationGate::permanent())
    }

    fn with_gate(gate: MutationGate) -> Self {
        Self {
            gate,
            backing: Vec::new(),
            dead: BTreeSet::new(),
            binding: OwnerBinding::default(),
        }
    }

    /// Rebuild a set from a reloaded slot sequence in one pass, bypassing
    /// per-element gating (bulk load happens at construction time).
    pub fn from_slots(slots: impl IntoIterator<Item = Slot<T>>) -> Self {
        let mut set = Self::new();
        for slot in slots {
            match slot {
                Slot::Live(cell) => {
                    if !set.backing.iter().any(|c| c.id() == cell.id()) {
                        set.backing.push(cell);
                    }
                }
                Slot::Dead(path) => {
                    set.dead.insert(path);
                }
            }
        }
        set
    }

    /// Bind this collection to its owning object for did-update delivery.
    pub fn bind_owner(&mut self, owner: ObjectId, observer: std::sync::Weak<dyn UpdateObserver>) {
        self.binding.bind(owner, observer);
    }

    /// Number of live, still-resolvable elements.
    pub fn len(&self) -> usize {
        self.backing.iter().filter(|c| !c.is_expired()).count()
    }

    /// `true` if the live view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live membership by referential identity.
    pub fn contains(&self, object: &Arc<T>) -> bool {
        self.backing.iter().any(|c| c.refers_to(object))
    }

    /// Iterate the live elements. Expired cells are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.backing.iter().filter_map(WeakCell::get)
    }

    /// Insert a live element. Returns `false` (and notifies no one) when the
    /// element is already present.
    pub fn insert(&mut self, object: &Arc<T>) -> Result<bool> {
        self.gate.check()?;
        self.prune_expired();
        if self.contains(object) {
            return Ok(false);
        }
        self.backing.push(WeakCell::new(object));
        self.binding.notify()?;
        Ok(true)
    }

    /// Remove a live element. Returns `false` when it was not present.
    pub fn remove(&mut self, object: &Arc<T>) -> Result<bool> {
        self.gate.check()?;
        self.prune_expired();
        let before = self.backing.len();
        self.backing.retain(|c| !c.refers_to(object));
        if self.backing.len() == before {
            return Ok(false);
        }
        self.binding.notify()?;
        Ok(true)
    }

    /// Raw insert of a backing slot, live or dead.
    pub fn add_reference(&mut self, slot: Slot<T>) -> Result<()> {
        self.gate.check()?;
        let changed = match slot {
            Slot::Live(cell) => {
                if self.backing.iter().any(|c| c.id() == cell.id()) {
                    false
                } else {
                    self.backing.push(cell);
                    true
                }
            }
            Slot::Dead(path) => self.dead.insert(path),
        };
        if changed {
            self.binding.notify()?;
        }
        Ok(())
    }

    /// Raw removal by wire form: a live id removes the matching cell, a dead
    /// path removes the matching tombstone.
    pub fn remove_reference(&mut self, reference: &PersistedReference) -> Result<bool> {
        self.gate.check()?;
        let changed = match reference {
            PersistedReference::Live { id } => {
                let before = self.backing.len();
                self.backing.retain(|c| c.id() != *id);
                self.backing.len() != before
            }
            PersistedReference::Dead { path } => self.dead.remove(path),
        };
        if changed {
            self.binding.notify()?;
        }
        Ok(changed)
    }

    /// Raw membership: a live id matches a still-resolvable cell, a dead
    /// path matches a recorded tombstone. Callers use the dead form to detect
    /// "already recorded as dead" before recording a new tombstone.
    pub fn contains_reference(&self, reference: &PersistedReference) -> bool {
        match reference {
            PersistedReference::Live { id } => {
                self.backing.iter().any(|c| !c.is_expired() && c.id() == *id)
            }
            PersistedReference::Dead { path } => self.dead.contains(path),
        }
    }

    /// Convert the live entry for `id` into a tombstone for `path` (the
    /// referenced object was deleted or unloaded).
    pub fn tombstone(&mut self, id: &ObjectId, path: ReferencePath) -> Result<bool> {
        self.gate.check()?;
        let before = self.backing.len();
        self.backing.retain(|c| c.id() != *id);
        let removed = self.backing.len() != before;
        let recorded = self.dead.insert(path);
        if removed || recorded {
            debug!(path = %path, "set entry tombstoned");
            self.binding.notify()?;
        }
        Ok(removed || recorded)
    }

    /// Revive the tombstone for `path` into a live reference to `object`
    /// (a fault resolved). Returns `false` if no such tombstone was
    /// recorded; the live entry is added either way.
    pub fn resolve(&mut self, path: &ReferencePath, object: &Arc<T>) -> Result<bool> {
        self.gate.check()?;
        let revived = self.dead.remove(path);
        let added = if self.contains(object) {
            false
        } else {
            self.backing.push(WeakCell::new(object));
            true
        };
        if revived || added {
            debug!(path = %path, "set tombstone revived");
            self.binding.notify()?;
        }
        Ok(revived)
    }

    /// The tombstoned entries, ordered by path value, for diagnostics and
    /// store reconciliation.
    pub fn dead_references(&self) -> impl Iterator<Item = &ReferencePath> + '_ {
        self.dead.iter()
    }

    /// Drop cells whose referent is gone. Expiry is observed lazily during
    /// mutation; no tombstone is recorded for an expired cell.
    fn prune_expired(&mut self) {
        self.backing.retain(|c| !c.is_expired());
    }
}

impl<T: GraphNode> Default for MutableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GraphNode> std::fmt::Debug for MutableSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableSet")
            .field("live", &self.len())
            .field("dead", &self.dead.len())
            .field("mutable", &self.gate.is_mutable())
            .finish()
    }
}

impl<T: GraphNode> ReferenceCollection for MutableSet<T> {
    fn begin_mutation(&mut self) {
        self.gate.begin();
    }

    fn end_mutation(&mut self) -> Result<()> {
        self.gate.end()
    }

    fn is_mutable(&self) -> bool {
        self.gate.is_mutable()
    }

    fn persisted_references(&self) -> Box<dyn Iterator<Item = PersistedReference> + '_> {
        Box::new(
            self.backing
                .iter()
                .map(|c| PersistedReference::live(c.id()))
                .chain(self.dead.iter().map(|p| PersistedReference::dead(*p))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectionError;

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

    fn mutable_set() -> MutableSet<Node> {
        MutableSet::permanently_mutable()
    }

    #[test]
    fn gated_set_rejects_mutation_outside_bracket() {
        let mut set = MutableSet::new();
        let object = node();
        assert!(matches!(
            set.insert(&object),
            Err(CollectionError::NotMutable)
        ));

        let mut scope = set.scoped_mutation();
        scope.insert(&object).unwrap();
        drop(scope);

        assert_eq!(set.len(), 1);
        assert!(matches!(
            set.remove(&object),
            Err(CollectionError::NotMutable)
        ));
    }

    #[test]
    fn insert_is_unique_by_identity() {
        let mut set = mutable_set();
        let object = node();
        assert!(set.insert(&object).unwrap());
        assert!(!set.insert(&object).unwrap());
        assert_eq!(set.len(), 1);
        assert!(set.contains(&object));
    }

    #[test]
    fn remove_missing_returns_false() {
        let mut set = mutable_set();
        let object = node();
        assert!(!set.remove(&object).unwrap());
        set.insert(&object).unwrap();
        assert!(set.remove(&object).unwrap());
        assert!(set.is_empty());
    }

    #[test]
    fn tombstone_paths_compare_by_value() {
        let mut set = mutable_set();
        let path = ReferencePath::to(ObjectId::new());
        set.add_reference(Slot::dead(path)).unwrap();
        // Same path again is a no-op.
        set.add_reference(Slot::dead(path)).unwrap();
        assert_eq!(set.dead_references().count(), 1);
        assert!(set.contains_reference(&PersistedReference::dead(path)));
    }

    #[test]
    fn tombstone_then_resolve_roundtrip() {
        let mut set = mutable_set();
        let object = node();
        set.insert(&object).unwrap();

        let path = object.reference_path();
        assert!(set.tombstone(&object.id(), path).unwrap());
        assert_eq!(set.len(), 0);
        assert_eq!(set.dead_references().count(), 1);

        assert!(set.resolve(&path, &object).unwrap());
        assert_eq!(set.len(), 1);
        assert_eq!(set.dead_references().count(), 0);
        assert!(set.contains(&object));
    }

    #[test]
    fn resolve_without_tombstone_still_adds() {
        let mut set = mutable_set();
        let object = node();
        let revived = set.resolve(&object.reference_path(), &object).unwrap();
        assert!(!revived);
        assert!(set.contains(&object));
    }

    #[test]
    fn expired_cells_leave_live_view_lazily() {
        let mut set = mutable_set();
        let object = node();
        let id = object.id();
        set.insert(&object).unwrap();
        drop(object);

        assert_eq!(set.len(), 0);
        assert_eq!(set.iter().count(), 0);
        // But expiry fabricates no tombstone.
        assert_eq!(set.dead_references().count(), 0);
        // Until pruned by a mutation, the backing still enumerates the id.
        assert_eq!(
            set.persisted_references().collect::<Vec<_>>(),
            vec![PersistedReference::live(id)]
        );
    }

    #[test]
    fn persisted_references_cover_live_and_dead() {
        let mut set = mutable_set();
        let object = node();
        let path = ReferencePath::to(ObjectId::new());
        set.insert(&object).unwrap();
        set.add_reference(Slot::dead(path)).unwrap();

        let refs: Vec<_> = set.persisted_references().collect();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&PersistedReference::live(object.id())));
        assert!(refs.contains(&PersistedReference::dead(path)));
    }

    #[test]
    fn bulk_reload_reproduces_live_and_dead_sets() {
        let mut set = mutable_set();
        let object = node();
        let path = ReferencePath::to(ObjectId::new());
        set.insert(&object).unwrap();
        set.add_reference(Slot::dead(path)).unwrap();

        let slots: Vec<Slot<Node>> = set
            .persisted_references()
            .map(|r| Slot::from_persisted(&r, |_| Some(object.clone())))
            .collect();
        let reloaded = MutableSet::from_slots(slots);

        assert_eq!(reloaded.len(), set.len());
        assert_eq!(
            reloaded.dead_references().collect::<Vec<_>>(),
            set.dead_references().collect::<Vec<_>>()
        );
    }

    #[test]
    fn remove_reference_by_wire_form() {
        let mut set = mutable_set();
        let object = node();
        let path = ReferencePath::to(ObjectId::new());
        set.insert(&object).unwrap();
        set.add_reference(Slot::dead(path)).unwrap();

        assert!(set
            .remove_reference(&PersistedReference::live(object.id()))
            .unwrap());
        assert!(set
            .remove_reference(&PersistedReference::dead(path))
            .unwrap());
        assert!(!set
            .remove_reference(&PersistedReference::dead(path))
            .unwrap());
        assert!(set.is_empty());
        assert_eq!(set.dead_references().count(), 0);
    }
}
