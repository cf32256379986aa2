//! The mutation-gating contract shared by all primitive collections.
//!
//! A collection is either *permanently mutable* (freely mutable at any time)
//! or *temporarily mutable* (mutable only inside a matched
//! `begin_mutation`/`end_mutation` bracket). Brackets nest: the gate keeps a
//! counter, and only the `end_mutation` matching the outermost
//! `begin_mutation` restores immutability. An `end_mutation` at depth zero is
//! a begin/end mismatch and is reported as an error.

use std::ops::{Deref, DerefMut};

use objgraph_types::PersistedReference;

use crate::error::{CollectionError, Result};

/// Contract every primitive reference collection implements.
pub trait ReferenceCollection {
    /// Open (or nest) a mutation bracket.
    fn begin_mutation(&mut self);

    /// Close the innermost mutation bracket.
    ///
    /// Returns [`CollectionError::UnbalancedEndMutation`] when no bracket is
    /// open — a begin/end mismatch the caller must not swallow.
    fn end_mutation(&mut self) -> Result<()>;

    /// `true` if the collection is permanently mutable or a bracket is open.
    fn is_mutable(&self) -> bool;

    /// Lazy, finite sequence over *all* backing slots, live and tombstoned,
    /// for the persistence layer when serializing.
    ///
    /// Application code must use the element-type-specific API instead, which
    /// sees only live elements in the correct observable order.
    fn persisted_references(&self) -> Box<dyn Iterator<Item = PersistedReference> + '_>;

    /// Open a bracket and return a guard that closes it on every exit path,
    /// including early returns and error paths.
    fn scoped_mutation(&mut self) -> MutationScope<'_, Self>
    where
        Self: Sized,
    {
        self.begin_mutation();
        MutationScope { collection: self }
    }
}

/// RAII mutation bracket: dereferences to the collection and closes the
/// bracket it opened when dropped.
pub struct MutationScope<'a, C: ReferenceCollection> {
    collection: &'a mut C,
}

impl<C: ReferenceCollection> Deref for MutationScope<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.collection
    }
}

impl<C: ReferenceCollection> DerefMut for MutationScope<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.collection
    }
}

impl<C: ReferenceCollection> Drop for MutationScope<'_, C> {
    fn drop(&mut self) {
        // The scope opened this bracket, so the matching end cannot underflow.
        let _ = self.collection.end_mutation();
    }
}

/// Per-collection mutability state: the permanent flag plus the bracket
/// nesting counter.
#[derive(Clone, Debug)]
pub(crate) struct MutationGate {
    permanent: bool,
    depth: u32,
}

impl MutationGate {
    /// Gate for a collection that is immutable outside brackets.
    pub(crate) fn gated() -> Self {
        Self {
            permanent: false,
            depth: 0,
        }
    }

    /// Gate for a permanently mutable collection.
    pub(crate) fn permanent() -> Self {
        Self {
            permanent: true,
            depth: 0,
        }
    }

    pub(crate) fn begin(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(CollectionError::UnbalancedEndMutation);
        }
        self.depth -= 1;
        Ok(())
    }

    pub(crate) fn is_mutable(&self) -> bool {
        self.permanent || self.depth > 0
    }

    /// Gate check performed by every structural mutation.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_mutable() {
            Ok(())
        } else {
            Err(CollectionError::NotMutable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_starts_immutable() {
        let gate = MutationGate::gated();
        assert!(!gate.is_mutable());
        assert!(matches!(gate.check(), Err(CollectionError::NotMutable)));
    }

    #[test]
    fn permanent_is_always_mutable() {
        let mut gate = MutationGate::permanent();
        assert!(gate.is_mutable());
        gate.begin();
        gate.end().unwrap();
        assert!(gate.is_mutable());
    }

    #[test]
    fn brackets_nest() {
        let mut gate = MutationGate::gated();
        gate.begin();
        gate.begin();
        assert!(gate.is_mutable());
        gate.end().unwrap();
        // Still inside the outer bracket.
        assert!(gate.is_mutable());
        gate.end().unwrap();
        assert!(!gate.is_mutable());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// For any begin/end call sequence, mutability tracks the model
            /// depth exactly, and end at depth zero always fails.
            #[test]
            fn mutability_tracks_nesting_depth(
                permanent in proptest::bool::ANY,
                calls in proptest::collection::vec(proptest::bool::ANY, 0..64),
            ) {
                let mut gate = if permanent {
                    MutationGate::permanent()
                } else {
                    MutationGate::gated()
                };
                let mut depth: u32 = 0;
                for begin in calls {
                    if begin {
                        gate.begin();
                        depth += 1;
                    } else if depth == 0 {
                        prop_assert!(matches!(
                            gate.end(),
                            Err(CollectionError::UnbalancedEndMutation)
                        ));
                    } else {
                        gate.end().unwrap();
                        depth -= 1;
                    }
                    prop_assert_eq!(gate.is_mutable(), permanent || depth > 0);
                }
            }
        }
    }

    #[test]
    fn end_at_depth_zero_is_an_error() {
        let mut gate = MutationGate::gated();
        assert!(matches!(
            gate.end(),
            Err(CollectionError::UnbalancedEndMutation)
        ));
        // And also after a balanced pair.
        gate.begin();
        gate.end().unwrap();
        assert!(matches!(
            gate.end(),
            Err(CollectionError::UnbalancedEndMutation)
        ));
    }
}
