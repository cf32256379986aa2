use crate::id::ObjectId;
use crate::path::ReferencePath;

/// The core's view of a host graph object.
///
/// Implemented by the application's object model. The core never validates
/// element types (the schema layer rejects invalid insertions before they
/// reach a collection) and never owns the objects it references — ownership
/// is held exclusively by the working session's object table, and collections
/// hold weak handles.
pub trait GraphNode: Send + Sync + 'static {
    /// The object's stable identifier.
    fn id(&self) -> ObjectId;

    /// The path recorded when a reference to this object must be tombstoned
    /// (the object is deleted, or a relationship to it is severed while it
    /// is unloaded).
    fn reference_path(&self) -> ReferencePath {
        ReferencePath::to(self.id())
    }

    /// Returns `true` if this object is a top-level root of its persistence
    /// unit, as opposed to an embedded sub-object.
    fn is_root(&self) -> bool {
        false
    }
}
