use serde::{Deserialize, Serialize};

use crate::id::ObjectId;
use crate::path::ReferencePath;

/// Wire form of one collection slot.
///
/// This is the encoding the persistence layer sees when it snapshots a
/// collection's full backing (live and tombstoned slots alike) and the
/// encoding it hands back on reload. The tag lets a reload distinguish
/// "reference to an object not present in this snapshot" from "reference
/// successfully resolved".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistedReference {
    /// A reference that resolved to a materialized object when the snapshot
    /// was taken.
    Live {
        /// Identifier of the referenced object.
        id: ObjectId,
    },
    /// A tombstone: the referenced object was unloaded or deleted.
    Dead {
        /// Path naming the unresolvable target.
        path: ReferencePath,
    },
}

impl PersistedReference {
    /// Wrap a live object identifier.
    pub fn live(id: ObjectId) -> Self {
        Self::Live { id }
    }

    /// Wrap a tombstone path.
    pub fn dead(path: ReferencePath) -> Self {
        Self::Dead { path }
    }

    /// Returns `true` for a live reference.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Returns `true` for a tombstone.
    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Dead { .. })
    }

    /// The live identifier, if any.
    pub fn live_id(&self) -> Option<ObjectId> {
        match self {
            Self::Live { id } => Some(*id),
            Self::Dead { .. } => None,
        }
    }

    /// The tombstone path, if any.
    pub fn dead_path(&self) -> Option<&ReferencePath> {
        match self {
            Self::Live { .. } => None,
            Self::Dead { path } => Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_accessors() {
        let id = ObjectId::new();
        let reference = PersistedReference::live(id);
        assert!(reference.is_live());
        assert!(!reference.is_dead());
        assert_eq!(reference.live_id(), Some(id));
        assert!(reference.dead_path().is_none());
    }

    #[test]
    fn dead_accessors() {
        let path = ReferencePath::to(ObjectId::new());
        let reference = PersistedReference::dead(path);
        assert!(reference.is_dead());
        assert_eq!(reference.dead_path(), Some(&path));
        assert!(reference.live_id().is_none());
    }

    #[test]
    fn serde_roundtrip_both_variants() {
        for reference in [
            PersistedReference::live(ObjectId::new()),
            PersistedReference::dead(ReferencePath::to(ObjectId::new())),
        ] {
            let json = serde_json::to_string(&reference).unwrap();
            let parsed: PersistedReference = serde_json::from_str(&json).unwrap();
            assert_eq!(reference, parsed);
        }
    }

    #[test]
    fn wire_tag_distinguishes_live_from_dead() {
        let live = serde_json::to_string(&PersistedReference::live(ObjectId::nil())).unwrap();
        let dead = serde_json::to_string(&PersistedReference::dead(ReferencePath::to(
            ObjectId::nil(),
        )))
        .unwrap();
        assert!(live.contains("\"live\""));
        assert!(dead.contains("\"dead\""));
    }
}
