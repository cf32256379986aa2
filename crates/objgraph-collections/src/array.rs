//! Ordered reference array.

use std::sync::Arc;

use tracing::debug;
use objgraph_types::{GraphNode, ObjectId, PersistedReference, ReferencePath};

use crate::error::{CollectionError, Result};
use crate::observer::{OwnerBinding, UpdateObserver};
use crate::protocol::{MutationGate, ReferenceCollection};
use crate::slot::Slot;

/// Ordered container preserving insertion order of *visible* elements.
///
/// The backing is a sequence of [`Slot`]s, live and tombstoned; the external
/// index map translates application-visible positions to backing positions
/// and never exposes a tombstone slot. Deleting a live element converts its
/// slot to a tombstone and shrinks the visible length by one while the
/// backing retains the tombstone for diagnostics and later revival.
///
/// After every structural operation the map satisfies: its length equals the
/// count of live slots, and walking it in order yields backing indices whose
/// payload order matches observable array order. The map is a plain
/// `Vec<usize>` rebuilt in O(n) when a slot flips between live and dead;
/// relationship arrays are small enough that an order-statistics structure
/// is not warranted.
pub struct MutableArray<T: GraphNode> {
    gate: MutationGate,
    backing: Vec<Slot<T>>,
    /// The ith entry gives the backing index for external index i.
    external: Vec<usize>,
    binding: OwnerBinding,
}

impl<T: GraphNode> MutableArray<T> {
    /// An empty array, immutable outside mutation brackets.
    pub fn new() -> Self {
        Self::with_gate(MutationGate::gated())
    }

    /// An empty, permanently mutable array.
    pub fn permanently_mutable() -> Self {
        Self::with_gate(MutationGate::permanent())
    }

    fn with_gate(gate: MutationGate) -> Self {
        Self {
            gate,
            backing: Vec::new(),
            external: Vec::new(),
            binding: OwnerBinding::default(),
        }
    }

    /// Rebuild an array from a reloaded slot sequence in one pass, bypassing
    /// per-element gating (bulk load happens at construction time).
    pub fn from_slots(slots: impl IntoIterator<Item = Slot<T>>) -> Self {
        let mut array = Self::new();
        array.backing = slots.into_iter().collect();
        array.rebuild_external();
        array
    }

    /// Bind this collection to its owning object for did-update delivery.
    pub fn bind_owner(&mut self, owner: ObjectId, observer: std::sync::Weak<dyn UpdateObserver>) {
        self.binding.bind(owner, observer);
    }

    /// Visible length: the number of live backing slots.
    pub fn len(&self) -> usize {
        self.external.len()
    }

    /// `true` if no element is visible.
    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }

    /// The element at external index `index`. `None` past the visible end,
    /// and `None` for a slot whose referent has expired — never a tombstone.
    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        let backing_index = *self.external.get(index)?;
        self.backing[backing_index].resolve()
    }

    /// Iterate the visible elements in order. Expired cells are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.external
            .iter()
            .filter_map(|&backing_index| self.backing[backing_index].resolve())
    }

    /// Number of backing slots, tombstones included.
    pub fn backing_len(&self) -> usize {
        self.backing.len()
    }

    /// The slot at a *backing* index, live or tombstoned. Distinct from
    /// [`get`](Self::get), which operates on external indices.
    pub fn reference_at(&self, backing_index: usize) -> Option<&Slot<T>> {
        self.backing.get(backing_index)
    }

    /// Append a live element at the end of the visible sequence.
    pub fn push(&mut self, object: &Arc<T>) -> Result<()> {
        self.gate.check()?;
        self.backing.push(Slot::live(object));
        self.external.push(self.backing.len() - 1);
        self.binding.notify()?;
        Ok(())
    }

    /// Insert a live element at external index `index`, shifting later
    /// visible elements right.
    pub fn insert(&mut self, index: usize, object: &Arc<T>) -> Result<()> {
        self.gate.check()?;
        if index > self.external.len() {
            return Err(CollectionError::IndexOutOfBounds {
                index,
                len: self.external.len(),
            });
        }
        let backing_index = if index == self.external.len() {
            self.backing.len()
        } else {
            self.external[index]
        };
        self.backing.insert(backing_index, Slot::live(object));
        for entry in &mut self.external {
            if *entry >= backing_index {
                *entry += 1;
            }
        }
        self.external.insert(index, backing_index);
        self.binding.notify()?;
        Ok(())
    }

    /// Remove the element at external index `index`.
    ///
    /// A resolvable element's slot is converted to a tombstone for the
    /// element's path (the backing retains it); the visible length shrinks
    /// by one either way. A slot whose referent has already expired is
    /// dropped from the backing outright — expiry never fabricates a
    /// tombstone — and `None` is returned.
    pub fn remove(&mut self, index: usize) -> Result<Option<Arc<T>>> {
        self.gate.check()?;
        let backing_index =
            *self
                .external
                .get(index)
                .ok_or(CollectionError::IndexOutOfBounds {
                    index,
                    len: self.external.len(),
                })?;
        match self.backing[backing_index].resolve() {
            Some(object) => {
                let path = object.reference_path();
                self.backing[backing_index] = Slot::Dead(path);
                self.external.remove(index);
                debug!(path = %path, "array element tombstoned");
                self.binding.notify()?;
                Ok(Some(object))
            }
            None => {
                self.external.remove(index);
                self.backing.remove(backing_index);
                for entry in &mut self.external {
                    if *entry > backing_index {
                        *entry -= 1;
                    }
                }
                self.binding.notify()?;
                Ok(None)
            }
        }
    }

    /// Replace the visible element at external index `index` with `object`,
    /// in place (the external map is unaffected).
    pub fn replace(&mut self, index: usize, object: &Arc<T>) -> Result<()> {
        self.gate.check()?;
        let backing_index =
            *self
                .external
                .get(index)
                .ok_or(CollectionError::IndexOutOfBounds {
                    index,
                    len: self.external.len(),
                })?;
        self.backing[backing_index] = Slot::live(object);
        self.binding.notify()?;
        Ok(())
    }

    /// Raw append of a backing slot. A live slot extends the external map by
    /// one entry pointing at it; a tombstone slot is appended hidden.
    pub fn add_reference(&mut self, slot: Slot<T>) -> Result<()> {
        self.gate.check()?;
        let live = slot.is_live();
        self.backing.push(slot);
        if live {
            self.external.push(self.backing.len() - 1);
        }
        self.binding.notify()?;
        Ok(())
    }

    /// Replace the payload of the slot at `backing_index` in place.
    ///
    /// This is the primitive used when a fault resolves (tombstone → live)
    /// or a referenced object is deleted (live → tombstone). When the slot's
    /// liveness flips, the external map is rebuilt so a revived element
    /// appears at the position consistent with its backing order among the
    /// surviving slots.
    pub fn replace_reference_at(&mut self, backing_index: usize, slot: Slot<T>) -> Result<()> {
        self.gate.check()?;
        if backing_index >= self.backing.len() {
            return Err(CollectionError::BackingIndexOutOfBounds {
                index: backing_index,
                len: self.backing.len(),
            });
        }
        let was_live = self.backing[backing_index].is_live();
        let now_live = slot.is_live();
        self.backing[backing_index] = slot;
        if was_live != now_live {
            debug!(
                backing_index,
                revived = now_live,
                "array slot liveness changed"
            );
            self.rebuild_external();
        }
        self.binding.notify()?;
        Ok(())
    }

    /// Backing indices currently holding tombstones.
    pub fn dead_indexes(&self) -> Vec<usize> {
        self.backing
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_dead())
            .map(|(index, _)| index)
            .collect()
    }

    /// The tombstoned entries in backing order, for diagnostics and store
    /// reconciliation.
    pub fn dead_references(&self) -> impl Iterator<Item = &ReferencePath> + '_ {
        self.backing.iter().filter_map(Slot::dead_path)
    }

    fn rebuild_external(&mut self) {
        self.external = self
            .backing
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live())
            .map(|(index, _)| index)
            .collect();
    }
}

impl<T: GraphNode> Default for MutableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GraphNode> std::fmt::Debug for MutableArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableArray")
            .field("visible", &self.external.len())
            .field("backing", &self.backing.len())
            .field("mutable", &self.gate.is_mutable())
            .finish()
    }
}

impl<T: GraphNode> ReferenceCollection for MutableArray<T> {
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
        Box::new(self.backing.iter().map(Slot::to_persisted))
    }
}
