use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ObjectId;

/// Tombstone payload: names a target graph object that is not presently
/// resolvable to a live reference.
///
/// A path stands in for a reference whose target has not been loaded yet, or
/// no longer exists. Collections store it in place of the reference so the
/// relationship round-trips through persistence while the target is absent
/// from memory, and revive it into a live reference when the target
/// materializes.
///
/// The text encoding reuses the UUID format of live object identifiers
/// (`"<target>"` or `"<target>@<branch>"`), so persisted tombstones and live
/// identifiers share one namespace and a store reload can tell "unresolved in
/// this snapshot" apart from "resolved".
///
/// Paths compare by value; two paths naming the same target (and branch) are
/// equal regardless of where they were recorded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferencePath {
    /// The identifier of the unresolvable target.
    pub target: ObjectId,
    /// The branch the target lives on, when the reference crosses branches.
    pub branch: Option<ObjectId>,
}

impl ReferencePath {
    /// Path to a target on the current branch.
    pub fn to(target: ObjectId) -> Self {
        Self {
            target,
            branch: None,
        }
    }

    /// Path to a target on a specific branch.
    pub fn to_branch(target: ObjectId, branch: ObjectId) -> Self {
        Self {
            target,
            branch: Some(branch),
        }
    }

    /// Parse from the text encoding (`"<uuid>"` or `"<uuid>@<uuid>"`).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s.split_once('@') {
            None => {
                let target = s
                    .parse::<ObjectId>()
                    .map_err(|e| TypeError::InvalidPath(e.to_string()))?;
                Ok(Self::to(target))
            }
            Some((target, branch)) => {
                let target = target
                    .parse::<ObjectId>()
                    .map_err(|e| TypeError::InvalidPath(e.to_string()))?;
                let branch = branch
                    .parse::<ObjectId>()
                    .map_err(|e| TypeError::InvalidPath(e.to_string()))?;
                Ok(Self::to_branch(target, branch))
            }
        }
    }
}

impl fmt::Debug for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(branch) => write!(
                f,
                "ReferencePath({}@{})",
                self.target.short_id(),
                branch.short_id()
            ),
            None => write!(f, "ReferencePath({})", self.target.short_id()),
        }
    }
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(branch) => write!(f, "{}@{}", self.target, branch),
            None => write!(f, "{}", self.target),
        }
    }
}

impl FromStr for ReferencePath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_compare_by_value() {
        let target = ObjectId::new();
        assert_eq!(ReferencePath::to(target), ReferencePath::to(target));
        assert_ne!(
            ReferencePath::to(target),
            ReferencePath::to(ObjectId::new())
        );
    }

    #[test]
    fn branch_distinguishes_paths() {
        let target = ObjectId::new();
        let branch = ObjectId::new();
        assert_ne!(
            ReferencePath::to(target),
            ReferencePath::to_branch(target, branch)
        );
    }

    #[test]
    fn display_parse_roundtrip() {
        let plain = ReferencePath::to(ObjectId::new());
        assert_eq!(ReferencePath::parse(&plain.to_string()).unwrap(), plain);

        let branched = ReferencePath::to_branch(ObjectId::new(), ObjectId::new());
        assert_eq!(
            ReferencePath::parse(&branched.to_string()).unwrap(),
            branched
        );
    }

    #[test]
    fn path_text_is_a_valid_object_id_when_unbranched() {
        // Same namespace as live identifiers: an unbranched path parses as
        // a plain object id.
        let path = ReferencePath::to(ObjectId::new());
        let id: ObjectId = path.to_string().parse().unwrap();
        assert_eq!(id, path.target);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            ReferencePath::parse("nope").unwrap_err(),
            TypeError::InvalidPath(_)
        ));
        assert!(matches!(
            ReferencePath::parse("nope@nope").unwrap_err(),
            TypeError::InvalidPath(_)
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let path = ReferencePath::to_branch(ObjectId::new(), ObjectId::new());
        let json = serde_json::to_string(&path).unwrap();
        let parsed: ReferencePath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
    }
}
