//! Reference-valued dictionary.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use tracing::debug;
use objgraph_types::{GraphNode, ObjectId, PersistedReference, ReferencePath};

use crate::error::Result;
use crate::observer::{OwnerBinding, UpdateObserver};
use crate::protocol::{MutationGate, ReferenceCollection};
use crate::slot::Slot;

/// Reference-valued mapping with ordered keys.
///
/// [`set_reference`](Self::set_reference) is the single required primitive:
/// a tombstone payload records a dead key (tracked in a dedicated dead-key
/// set) without removing the key from the backing, so the entry can later be
/// revived. Overwriting a live value with another live value leaves the
/// dead-key set untouched; overwriting a dead key's slot with a live value
/// removes the key from the dead-key set.
pub struct MutableDictionary<K, T>
where
    K: Ord + Clone + Debug,
    T: GraphNode,
{
    gate: MutationGate,
    backing: BTreeMap<K, Slot<T>>,
    dead_keys: BTreeSet<K>,
    binding: OwnerBinding,
}

impl<K, T> MutableDictionary<K, T>
where
    K: Ord + Clone + Debug,
    T: GraphNode,
{
    /// An empty dictionary, immutable outside mutation brackets.
    pub fn new() -> Self {
        Self::with_gate(MutationGate::gated())
    }

    /// An empty, permanently mutable dictionary.
    pub fn permanently_mutable() -> Self {
        Self::with_gate(MutationGate::permanent())
    }

    fn with_gate(gate: MutationGate) -> Self {
        Self {
            gate,
            backing: BTreeMap::new(),
            dead_keys: BTreeSet::new(),
            binding: OwnerBinding::default(),
        }
    }

    /// Rebuild a dictionary from reloaded entries in one pass, bypassing
    /// per-element gating (bulk load happens at construction time).
    pub fn from_entries(entries: impl IntoIterator<Item = (K, Slot<T>)>) -> Self {
        let mut dict = Self::new();
        for (key, slot) in entries {
            if slot.is_dead() {
                dict.dead_keys.insert(key.clone());
            }
            dict.backing.insert(key, slot);
        }
        dict
    }

    /// Bind this collection to its owning object for did-update delivery.
    pub fn bind_owner(&mut self, owner: ObjectId, observer: std::sync::Weak<dyn UpdateObserver>) {
        self.binding.bind(owner, observer);
    }

    /// Number of live, still-resolvable entries.
    pub fn len(&self) -> usize {
        self.backing
            .values()
            .filter(|slot| slot.resolve().is_some())
            .count()
    }

    /// `true` if the live view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live value for `key`. `None` for absent, dead, or expired entries.
    pub fn get(&self, key: &K) -> Option<Arc<T>> {
        self.backing.get(key).and_then(Slot::resolve)
    }

    /// `true` if `key` maps to a live, resolvable value.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Iterate the live entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, Arc<T>)> + '_ {
        self.backing
            .iter()
            .filter_map(|(key, slot)| slot.resolve().map(|object| (key, object)))
    }

    /// Iterate the live keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// The single mutation primitive: store `slot` under `key`.
    ///
    /// A dead payload records `key` in the dead-key set while keeping the
    /// backing entry; a live payload clears `key` from the dead-key set if
    /// it was recorded there.
    pub fn set_reference(&mut self, key: K, slot: Slot<T>) -> Result<()> {
        self.gate.check()?;
        match &slot {
            Slot::Live(_) => {
                if self.dead_keys.remove(&key) {
                    debug!(key = ?key, "dead dictionary key revived");
                }
            }
            Slot::Dead(path) => {
                debug!(key = ?key, path = %path, "dictionary key tombstoned");
                self.dead_keys.insert(key.clone());
            }
        }
        self.backing.insert(key, slot);
        self.binding.notify()?;
        Ok(())
    }

    /// Store a live reference under `key`.
    pub fn insert(&mut self, key: K, object: &Arc<T>) -> Result<()> {
        self.set_reference(key, Slot::live(object))
    }

    /// Remove `key` entirely, backing slot and dead-key record included.
    pub fn remove(&mut self, key: &K) -> Result<Option<Slot<T>>> {
        self.gate.check()?;
        self.dead_keys.remove(key);
        let removed = self.backing.remove(key);
        if removed.is_some() {
            self.binding.notify()?;
        }
        Ok(removed)
    }

    /// The dead keys, in key order, for diagnostics and store
    /// reconciliation.
    pub fn dead_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.dead_keys.iter()
    }

    /// The tombstone path recorded for `key`, if any.
    pub fn dead_path_for(&self, key: &K) -> Option<&ReferencePath> {
        self.backing.get(key).and_then(Slot::dead_path)
    }

    /// Every backing entry in wire form, keys included, for the store layer.
    pub fn persisted_entries(&self) -> impl Iterator<Item = (&K, PersistedReference)> + '_ {
        self.backing
            .iter()
            .map(|(key, slot)| (key, slot.to_persisted()))
    }
}

impl<K, T> Default for MutableDictionary<K, T>
where
    K: Ord + Clone + Debug,
    T: GraphNode,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Debug for MutableDictionary<K, T>
where
    K: Ord + Clone + Debug,
    T: GraphNode,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableDictionary")
            .field("live", &self.len())
            .field("dead_keys", &self.dead_keys.len())
            .field("mutable", &self.gate.is_mutable())
            .finish()
    }
}

impl<K, T> ReferenceCollection for MutableDictionary<K, T>
where
    K: Ord + Clone + Debug,
    T: GraphNode,
{
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
        Box::new(self.backing.values().map(Slot::to_persisted))
    }
}
