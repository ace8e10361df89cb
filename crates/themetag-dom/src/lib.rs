//! Minimal document-head model with mutation observation.
//!
//! Models the slice of the DOM that theme-color watchers touch: a flat
//! `<head>` child list, elements with string attributes, and
//! MutationObserver-style subscriptions — an attribute watch on one element,
//! or a child-list watch on the head. Mutations made from inside an observer
//! callback are queued and delivered in order, never recursively, so a
//! guarded corrective write inside a callback cannot loop.

pub mod document;
pub mod mutation;

pub use document::{Document, ElementId};
pub use mutation::{MutationRecord, ObserverHandle};
