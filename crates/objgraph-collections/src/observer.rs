//! Owner notification for collection mutations.
//!
//! Every successful structural mutation of a collection makes exactly one
//! direct call on the owning object's observer, which the owner uses to
//! register itself as updated with the session's change ledger. This is a
//! plain method call, not an event bus: the observer is reached through a
//! weak handle so a collection never keeps its session alive.

use std::sync::Weak;

use thiserror::Error;
use objgraph_types::ObjectId;

/// The owning object rejected a did-update notification.
///
/// Raised by the session when a collection reports a mutation for an owner
/// the ledger does not consider loaded — a programmer error in the wiring,
/// propagated out of the mutating call rather than masked.
#[derive(Debug, Error)]
#[error("did-update rejected for owner {owner}: {reason}")]
pub struct UpdateError {
    /// The owner the notification was delivered for.
    pub owner: ObjectId,
    /// Why the observer rejected it.
    pub reason: String,
}

/// Receiver for collection did-update notifications.
///
/// Implemented by the working session; the call typically forwards straight
/// to the change ledger's `record_updated`.
pub trait UpdateObserver: Send + Sync {
    /// A collection owned by `owner` was structurally mutated.
    fn collection_did_update(&self, owner: ObjectId) -> std::result::Result<(), UpdateError>;
}

/// A collection's binding to its owning object.
///
/// Unbound collections (construction, bulk load, tests) notify no one.
#[derive(Clone, Default)]
pub(crate) struct OwnerBinding {
    owner: Option<ObjectId>,
    observer: Option<Weak<dyn UpdateObserver>>,
}

impl OwnerBinding {
    pub(crate) fn bind(&mut self, owner: ObjectId, observer: Weak<dyn UpdateObserver>) {
        self.owner = Some(owner);
        self.observer = Some(observer);
    }

    /// Deliver one did-update notification, if bound and the session is
    /// still alive.
    pub(crate) fn notify(&self) -> std::result::Result<(), UpdateError> {
        if let (Some(owner), Some(observer)) = (self.owner, &self.observer) {
            if let Some(observer) = observer.upgrade() {
                return observer.collection_did_update(owner);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for OwnerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerBinding")
            .field("owner", &self.owner)
            .field("bound", &self.observer.is_some())
            .finish()
    }
}
