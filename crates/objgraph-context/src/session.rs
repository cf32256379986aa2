//! The working session: object table, fault resolution, and commit hand-off.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use objgraph_collections::{UpdateError, UpdateObserver};
use objgraph_types::{GraphNode, ObjectId};

use crate::error::{LedgerError, Result};
use crate::ledger::ChangeLedger;

/// The pending change lists handed to the external store writer at commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Objects created in the session since the last commit, sorted.
    pub inserted: Vec<ObjectId>,
    /// Objects whose properties changed since the last commit, sorted.
    pub updated: Vec<ObjectId>,
}

impl ChangeSet {
    /// `true` when there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty()
    }

    /// Total number of entries across both lists. An object can appear in
    /// both when it was inserted and then updated before the commit.
    pub fn total_entries(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }
}

/// One working session over the object graph.
///
/// The session's object table holds the only strong handles to materialized
/// graph objects — collections reference them weakly — and the embedded
/// [`ChangeLedger`] classifies them. The session is also the did-update
/// receiver for collections: bind a collection with the owner's id and
/// [`observer`](Self::observer), and every structural mutation lands in the
/// ledger as a direct [`ChangeLedger::record_updated`] call.
pub struct WorkingContext<T: GraphNode> {
    objects: RwLock<HashMap<ObjectId, Arc<T>>>,
    ledger: ChangeLedger,
}

impl<T: GraphNode> WorkingContext<T> {
    /// An empty session.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            ledger: ChangeLedger::new(),
        }
    }

    /// The session's change ledger.
    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// A weak observer handle for binding collections to this session.
    pub fn observer(self: &Arc<Self>) -> std::sync::Weak<dyn UpdateObserver> {
        Arc::downgrade(self) as std::sync::Weak<dyn UpdateObserver>
    }

    /// Attach a newly created object: recorded as inserted (and loaded).
    ///
    /// Returns [`LedgerError::AlreadyLoaded`] when an object with the same
    /// identifier is already materialized.
    pub fn insert_object(&self, object: Arc<T>) -> Result<()> {
        let id = object.id();
        let is_root = object.is_root();
        {
            let mut objects = self.write_objects()?;
            if objects.contains_key(&id) {
                return Err(LedgerError::AlreadyLoaded { id });
            }
            objects.insert(id, object);
        }
        self.ledger.record_inserted(id, is_root)?;
        debug!(object = %id.short_id(), "object created in session");
        Ok(())
    }

    /// Attach an object materialized from the store (a fault resolving):
    /// recorded as loaded, not inserted. Idempotent — materializing an
    /// already-loaded identifier keeps the existing instance.
    pub fn materialize(&self, object: Arc<T>) -> Result<Arc<T>> {
        let id = object.id();
        let is_root = object.is_root();
        let instance = {
            let mut objects = self.write_objects()?;
            objects.entry(id).or_insert(object).clone()
        };
        self.ledger.record_loaded(id, is_root)?;
        Ok(instance)
    }

    /// Look up a materialized object by identifier.
    pub fn object(&self, id: &ObjectId) -> Result<Option<Arc<T>>> {
        Ok(self.read_objects()?.get(id).cloned())
    }

    /// `true` if `id` is materialized in this session.
    pub fn contains(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.read_objects()?.contains_key(id))
    }

    /// Evict an object: the table drops its strong handle (weak cells in
    /// collections expire lazily) and the ledger forgets it entirely.
    pub fn unload(&self, id: &ObjectId) -> Result<Option<Arc<T>>> {
        let removed = self.write_objects()?.remove(id);
        self.ledger.unload(id)?;
        Ok(removed)
    }

    /// Commit: return the pending change lists for the external store
    /// writer, then clear them. Loaded objects are unaffected.
    pub fn commit(&self) -> Result<ChangeSet> {
        let changes = ChangeSet {
            inserted: self.ledger.inserted_objects()?,
            updated: self.ledger.updated_objects()?,
        };
        self.ledger.commit()?;
        debug!(
            inserted = changes.inserted.len(),
            updated = changes.updated.len(),
            "session committed"
        );
        Ok(changes)
    }

    fn read_objects(&self) -> Result<RwLockReadGuard<'_, HashMap<ObjectId, Arc<T>>>> {
        self.objects
            .read()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))
    }

    fn write_objects(&self) -> Result<RwLockWriteGuard<'_, HashMap<ObjectId, Arc<T>>>> {
        self.objects
            .write()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))
    }
}

impl<T: GraphNode> Default for WorkingContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GraphNode> std::fmt::Debug for WorkingContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = self.read_objects().map(|o| o.len()).unwrap_or(0);
        f.debug_struct("WorkingContext")
            .field("loaded", &loaded)
            .finish()
    }
}

impl<T: GraphNode> UpdateObserver for WorkingContext<T> {
    fn collection_did_update(&self, owner: ObjectId) -> std::result::Result<(), UpdateError> {
        self.ledger.record_updated(owner).map_err(|e| UpdateError {
            owner,
            reason: e.to_string(),
        })
    }
}
