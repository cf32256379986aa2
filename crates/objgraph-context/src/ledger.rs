//! The context change ledger.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use objgraph_types::ObjectId;

use crate::error::{LedgerError, Result};

/// Per-session change bookkeeping.
///
/// Classifies every object known to one working session:
///
/// - *loaded* — every object presently materialized for this session,
///   superset of inserted;
/// - *loaded roots* — the subset of loaded that are root objects of their
///   persistence unit, independent of fault or insertion status;
/// - *inserted* — objects newly created and not yet committed;
/// - *updated* — objects whose properties changed since the last commit;
/// - *changed* — inserted ∪ updated, deduplicated.
///
/// Per object the states are `unloaded → loaded(clean) → loaded(dirty)`,
/// with `dirty → clean` on commit and any state `→ unloaded` on eviction;
/// re-entry from unloaded happens only through a fresh
/// [`record_loaded`](Self::record_loaded).
///
/// All state lives behind a `RwLock`, so recording goes through `&self`; a
/// session's objects are mutated by one logical thread at a time, and the
/// lock gives multi-session hosts the exclusive-access discipline they need.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    loaded: BTreeSet<ObjectId>,
    roots: BTreeSet<ObjectId>,
    inserted: BTreeSet<ObjectId>,
    updated: BTreeSet<ObjectId>,
}

impl ChangeLedger {
    /// A ledger with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as materialized in this session (by creation or by fault
    /// resolution). Idempotent.
    pub fn record_loaded(&self, id: ObjectId, is_root: bool) -> Result<()> {
        let mut state = self.write()?;
        if state.loaded.insert(id) {
            debug!(object = %id.short_id(), is_root, "object loaded");
        }
        if is_root {
            state.roots.insert(id);
        }
        Ok(())
    }

    /// Record `id` as newly created in this session and not yet committed.
    /// Also records it as loaded.
    pub fn record_inserted(&self, id: ObjectId, is_root: bool) -> Result<()> {
        let mut state = self.write()?;
        state.loaded.insert(id);
        if is_root {
            state.roots.insert(id);
        }
        if state.inserted.insert(id) {
            debug!(object = %id.short_id(), "object inserted");
        }
        Ok(())
    }

    /// Record a property change on `id`.
    ///
    /// Returns [`LedgerError::NotLoaded`] when `id` is not loaded — updates
    /// can only be recorded for loaded objects, and a violation means the
    /// caller's wiring is broken.
    pub fn record_updated(&self, id: ObjectId) -> Result<()> {
        let mut state = self.write()?;
        if !state.loaded.contains(&id) {
            return Err(LedgerError::NotLoaded { id });
        }
        if state.updated.insert(id) {
            debug!(object = %id.short_id(), "object updated");
        }
        Ok(())
    }

    /// `true` if `id` is materialized in this session.
    pub fn is_loaded(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.read()?.loaded.contains(id))
    }

    /// Every object presently materialized, in sorted order. Includes
    /// inserted objects and faults materialized on demand.
    pub fn loaded_objects(&self) -> Result<Vec<ObjectId>> {
        Ok(self.read()?.loaded.iter().copied().collect())
    }

    /// The loaded root objects, in sorted order. A subset of
    /// [`loaded_objects`](Self::loaded_objects).
    pub fn loaded_root_objects(&self) -> Result<Vec<ObjectId>> {
        Ok(self.read()?.roots.iter().copied().collect())
    }

    /// The objects inserted since the last commit, in sorted order.
    pub fn inserted_objects(&self) -> Result<Vec<ObjectId>> {
        Ok(self.read()?.inserted.iter().copied().collect())
    }

    /// The objects updated since the last commit, in sorted order.
    pub fn updated_objects(&self) -> Result<Vec<ObjectId>> {
        Ok(self.read()?.updated.iter().copied().collect())
    }

    /// Inserted ∪ updated, deduplicated, in sorted order.
    pub fn changed_objects(&self) -> Result<Vec<ObjectId>> {
        let state = self.read()?;
        Ok(state.inserted.union(&state.updated).copied().collect())
    }

    /// `true` if nothing is pending for the next commit.
    pub fn is_clean(&self) -> Result<bool> {
        let state = self.read()?;
        Ok(state.inserted.is_empty() && state.updated.is_empty())
    }

    /// Clear the pending inserted and updated sets after a successful
    /// commit. Loaded objects and roots are unaffected.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.write()?;
        debug!(
            inserted = state.inserted.len(),
            updated = state.updated.len(),
            "ledger commit"
        );
        state.inserted.clear();
        state.updated.clear();
        Ok(())
    }

    /// Evict `id` from every view simultaneously (session teardown or
    /// explicit unload).
    pub fn unload(&self, id: &ObjectId) -> Result<()> {
        let mut state = self.write()?;
        if state.loaded.remove(id) {
            debug!(object = %id.short_id(), "object unloaded");
        }
        state.roots.remove(id);
        state.inserted.remove(id);
        state.updated.remove(id);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.inner
            .write()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))
    }
}
