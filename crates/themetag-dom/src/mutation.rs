//! Mutation records and observer handles.

use crate::document::ElementId;

/// Identifies one observer registration on a [`Document`](crate::Document).
///
/// Whoever registered the observer owns the handle; passing it to
/// [`Document::disconnect`](crate::Document::disconnect) tears the
/// registration down. Merely dropping the handle leaves the observer running
/// for the document's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub(crate) u64);

/// A single delivered mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// An attribute on `target` was set or removed.
    Attributes {
        target: ElementId,
        /// Name of the attribute that changed.
        name: String,
    },
    /// The head's child list changed (element appended or removed).
    ChildList,
}
