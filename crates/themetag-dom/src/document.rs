//! The document model: elements, the head child list, and observer delivery.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::mutation::{MutationRecord, ObserverHandle};

/// Identifies an element created on a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) u64);

/// Callback invoked once per delivered [`MutationRecord`].
///
/// Callbacks receive the document mutably so they can query and mutate it;
/// any mutation they perform is queued and delivered after the current
/// record, never re-entrantly.
pub type ObserverCallback = Box<dyn FnMut(&mut Document, &MutationRecord)>;

struct ElementData {
    tag: String,
    attributes: HashMap<String, String>,
}

/// What an observer registration watches.
enum ObserverTarget {
    /// Attribute mutations on one element, attached or not.
    Attributes(ElementId),
    /// Child-list mutations on the head.
    HeadChildren,
}

impl ObserverTarget {
    fn matches(&self, record: &MutationRecord) -> bool {
        match (self, record) {
            (Self::Attributes(id), MutationRecord::Attributes { target, .. }) => id == target,
            (Self::HeadChildren, MutationRecord::ChildList) => true,
            _ => false,
        }
    }
}

struct ObserverSlot {
    target: ObserverTarget,
    /// Taken out while the callback runs so the callback can borrow the
    /// document mutably; restored afterwards unless disconnected meanwhile.
    callback: Option<ObserverCallback>,
}

/// A single-threaded document head with mutation observation.
///
/// Elements live for the document's lifetime once created; attaching and
/// detaching only moves them in and out of the head child list. Every
/// mutation enqueues exactly one record — including writes that do not
/// change the stored value, matching `MutationObserver` semantics for
/// `setAttribute`.
pub struct Document {
    elements: HashMap<u64, ElementData>,
    head: Vec<ElementId>,
    observers: HashMap<u64, ObserverSlot>,
    pending: VecDeque<MutationRecord>,
    next_element_id: u64,
    next_observer_id: u64,
    delivering: bool,
}

impl Document {
    /// Create a document with an empty head.
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            head: Vec::new(),
            observers: HashMap::new(),
            pending: VecDeque::new(),
            next_element_id: 0,
            next_observer_id: 0,
            delivering: false,
        }
    }

    // -----------------------------------------------------------------
    // Elements
    // -----------------------------------------------------------------

    /// Create a detached element with no attributes.
    pub fn create_element(&mut self, tag: impl Into<String>) -> ElementId {
        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;
        self.elements.insert(
            id.0,
            ElementData {
                tag: tag.into(),
                attributes: HashMap::new(),
            },
        );
        id
    }

    /// Append an element to the end of the head child list.
    pub fn append_to_head(&mut self, id: ElementId) {
        if !self.elements.contains_key(&id.0) {
            warn!(element = id.0, "append ignored: unknown element");
            return;
        }
        if self.head.contains(&id) {
            warn!(element = id.0, "append ignored: already in head");
            return;
        }
        debug!(element = id.0, "element appended to head");
        self.head.push(id);
        self.enqueue(MutationRecord::ChildList);
    }

    /// Detach an element from the head. The element itself survives and can
    /// be re-appended.
    pub fn remove_from_head(&mut self, id: ElementId) {
        match self.head.iter().position(|&e| e == id) {
            Some(pos) => {
                debug!(element = id.0, "element removed from head");
                self.head.remove(pos);
                self.enqueue(MutationRecord::ChildList);
            }
            None => warn!(element = id.0, "remove ignored: not in head"),
        }
    }

    /// Whether the element is currently in the head child list.
    pub fn is_attached(&self, id: ElementId) -> bool {
        self.head.contains(&id)
    }

    /// Head children in document order.
    pub fn head_children(&self) -> &[ElementId] {
        &self.head
    }

    /// Tag name of an element.
    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id.0).map(|e| e.tag.as_str())
    }

    /// First in-head element with `tag` whose attribute `attr` equals
    /// `value` — the `querySelector('tag[attr="value"]')` lookup.
    pub fn query_head(&self, tag: &str, attr: &str, value: &str) -> Option<ElementId> {
        self.head.iter().copied().find(|id| {
            self.elements.get(&id.0).is_some_and(|e| {
                e.tag == tag && e.attributes.get(attr).map(String::as_str) == Some(value)
            })
        })
    }

    // -----------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------

    /// Set an attribute. Enqueues a record even when the value is unchanged.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        let Some(data) = self.elements.get_mut(&id.0) else {
            warn!(element = id.0, name, "set_attribute ignored: unknown element");
            return;
        };
        debug!(element = id.0, name, value, "attribute set");
        data.attributes.insert(name.to_string(), value.to_string());
        self.enqueue(MutationRecord::Attributes {
            target: id,
            name: name.to_string(),
        });
    }

    /// Remove an attribute. Enqueues a record only if the attribute existed.
    pub fn remove_attribute(&mut self, id: ElementId, name: &str) {
        let Some(data) = self.elements.get_mut(&id.0) else {
            warn!(element = id.0, name, "remove_attribute ignored: unknown element");
            return;
        };
        if data.attributes.remove(name).is_some() {
            debug!(element = id.0, name, "attribute removed");
            self.enqueue(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
    }

    /// Current value of an attribute, if present.
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.elements.get(&id.0)?.attributes.get(name).cloned()
    }

    // -----------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------

    /// Watch attribute mutations on one element.
    pub fn observe_attributes(
        &mut self,
        target: ElementId,
        callback: impl FnMut(&mut Document, &MutationRecord) + 'static,
    ) -> ObserverHandle {
        self.register(ObserverTarget::Attributes(target), Box::new(callback))
    }

    /// Watch child-list mutations on the head.
    pub fn observe_head_children(
        &mut self,
        callback: impl FnMut(&mut Document, &MutationRecord) + 'static,
    ) -> ObserverHandle {
        self.register(ObserverTarget::HeadChildren, Box::new(callback))
    }

    /// Tear down an observer registration. Disconnecting a handle that was
    /// already removed is a logged no-op.
    pub fn disconnect(&mut self, handle: ObserverHandle) {
        if self.observers.remove(&handle.0).is_some() {
            debug!(observer = handle.0, "observer disconnected");
        } else {
            warn!(observer = handle.0, "disconnect ignored: unknown observer");
        }
    }

    fn register(&mut self, target: ObserverTarget, callback: ObserverCallback) -> ObserverHandle {
        let handle = ObserverHandle(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.insert(
            handle.0,
            ObserverSlot {
                target,
                callback: Some(callback),
            },
        );
        debug!(observer = handle.0, "observer registered");
        handle
    }

    // -----------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------

    fn enqueue(&mut self, record: MutationRecord) {
        self.pending.push_back(record);
        self.deliver();
    }

    /// Drain the record queue, invoking matching observers in registration
    /// order. Re-entrant calls (mutations made inside a callback) only
    /// enqueue; the outermost call drains everything.
    fn deliver(&mut self) {
        if self.delivering {
            return;
        }
        self.delivering = true;
        while let Some(record) = self.pending.pop_front() {
            // Snapshot at delivery time: observers registered inside an
            // earlier callback of this turn do receive this record, ones
            // disconnected inside it do not.
            let mut matching: Vec<u64> = self
                .observers
                .iter()
                .filter(|(_, slot)| slot.target.matches(&record))
                .map(|(id, _)| *id)
                .collect();
            matching.sort_unstable();

            for id in matching {
                let Some(mut callback) = self
                    .observers
                    .get_mut(&id)
                    .and_then(|slot| slot.callback.take())
                else {
                    continue;
                };
                callback(self, &record);
                if let Some(slot) = self.observers.get_mut(&id) {
                    slot.callback = Some(callback);
                }
            }
        }
        self.delivering = false;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn meta_with_content(doc: &mut Document, content: &str) -> ElementId {
        let id = doc.create_element("meta");
        doc.set_attribute(id, "name", "theme-color");
        doc.set_attribute(id, "content", content);
        doc.append_to_head(id);
        id
    }

    // -- Elements and queries --

    #[test]
    fn create_and_append() {
        let mut doc = Document::new();
        let id = doc.create_element("meta");
        assert!(!doc.is_attached(id));

        doc.append_to_head(id);
        assert!(doc.is_attached(id));
        assert_eq!(doc.head_children(), &[id]);
        assert_eq!(doc.tag(id), Some("meta"));
    }

    #[test]
    fn query_head_matches_tag_and_attribute() {
        let mut doc = Document::new();
        let link = doc.create_element("link");
        doc.set_attribute(link, "name", "theme-color");
        doc.append_to_head(link);

        let meta = meta_with_content(&mut doc, "#112233");

        // Wrong tag does not match even with the right attribute
        assert_eq!(doc.query_head("meta", "name", "theme-color"), Some(meta));
        assert_eq!(doc.query_head("meta", "name", "viewport"), None);
    }

    #[test]
    fn query_head_returns_first_in_document_order() {
        let mut doc = Document::new();
        let first = meta_with_content(&mut doc, "#000001");
        let _second = meta_with_content(&mut doc, "#000002");
        assert_eq!(doc.query_head("meta", "name", "theme-color"), Some(first));
    }

    #[test]
    fn detached_elements_are_not_queryable() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#123456");
        doc.remove_from_head(id);
        assert_eq!(doc.query_head("meta", "name", "theme-color"), None);
        // Attributes survive detachment
        assert_eq!(doc.attribute(id, "content").as_deref(), Some("#123456"));
    }

    // -- Attributes --

    #[test]
    fn set_get_remove_attribute() {
        let mut doc = Document::new();
        let id = doc.create_element("meta");
        assert_eq!(doc.attribute(id, "content"), None);

        doc.set_attribute(id, "content", "#ff0000");
        assert_eq!(doc.attribute(id, "content").as_deref(), Some("#ff0000"));

        doc.remove_attribute(id, "content");
        assert_eq!(doc.attribute(id, "content"), None);
    }

    #[test]
    fn unknown_element_operations_are_noops() {
        let mut doc = Document::new();
        let id = doc.create_element("meta");
        let mut other = Document::new();

        // Ids from another document are unknown here
        other.set_attribute(id, "content", "#fff");
        other.append_to_head(id);
        other.remove_from_head(id);
        assert_eq!(other.attribute(id, "content"), None);
        assert!(other.head_children().is_empty());
    }

    // -- Observer delivery --

    #[test]
    fn attribute_observer_receives_record() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        doc.observe_attributes(id, move |_, record| {
            sink.borrow_mut().push(record.clone());
        });

        doc.set_attribute(id, "content", "#00ff00");
        assert_eq!(
            seen.borrow().as_slice(),
            &[MutationRecord::Attributes {
                target: id,
                name: "content".into(),
            }]
        );
    }

    #[test]
    fn attribute_observer_ignores_other_elements() {
        let mut doc = Document::new();
        let a = meta_with_content(&mut doc, "#ff0000");
        let b = doc.create_element("meta");
        doc.append_to_head(b);

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        doc.observe_attributes(a, move |_, _| *sink.borrow_mut() += 1);

        doc.set_attribute(b, "content", "#00ff00");
        assert_eq!(*count.borrow(), 0);
        doc.set_attribute(a, "content", "#00ff00");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn head_observer_fires_on_append_and_remove() {
        let mut doc = Document::new();
        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        doc.observe_head_children(move |_, _| *sink.borrow_mut() += 1);

        let id = doc.create_element("meta");
        doc.append_to_head(id);
        assert_eq!(*count.borrow(), 1);

        doc.remove_from_head(id);
        assert_eq!(*count.borrow(), 2);

        // Attribute mutations do not reach a child-list observer
        doc.set_attribute(id, "content", "#fff");
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn set_attribute_fires_even_when_value_unchanged() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        doc.observe_attributes(id, move |_, _| *sink.borrow_mut() += 1);

        doc.set_attribute(id, "content", "#ff0000");
        doc.set_attribute(id, "content", "#ff0000");
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn remove_attribute_fires_only_if_present() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        doc.observe_attributes(id, move |_, _| *sink.borrow_mut() += 1);

        doc.remove_attribute(id, "content");
        assert_eq!(*count.borrow(), 1);
        doc.remove_attribute(id, "content");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn disconnect_stops_delivery() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        let handle = doc.observe_attributes(id, move |_, _| *sink.borrow_mut() += 1);

        doc.set_attribute(id, "content", "#111111");
        assert_eq!(*count.borrow(), 1);

        doc.disconnect(handle);
        doc.set_attribute(id, "content", "#222222");
        assert_eq!(*count.borrow(), 1);

        // Double disconnect is a no-op
        doc.disconnect(handle);
    }

    #[test]
    fn mutation_inside_callback_is_queued_not_recursive() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        // Logger first, so it reads each value before the corrective
        // observer rewrites it.
        let order = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&order);
        doc.observe_attributes(id, move |doc, record| {
            let MutationRecord::Attributes { target, .. } = record else {
                return;
            };
            sink.borrow_mut().push(doc.attribute(*target, "content"));
        });

        // Corrective observer: rewrites anything that is not "#000000".
        doc.observe_attributes(id, move |doc, record| {
            let MutationRecord::Attributes { target, .. } = record else {
                return;
            };
            if doc.attribute(*target, "content").as_deref() != Some("#000000") {
                doc.set_attribute(*target, "content", "#000000");
            }
        });

        // One external write: the corrective write is delivered as a second,
        // separate record. Test completion proves the guard terminates.
        doc.set_attribute(id, "content", "#abcdef");
        assert_eq!(
            order.borrow().as_slice(),
            &[Some("#abcdef".to_string()), Some("#000000".to_string())]
        );
    }

    #[test]
    fn observer_registered_inside_callback_sees_later_records() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let late_count = Rc::new(RefCell::new(0u32));
        let late = Rc::clone(&late_count);
        let registered = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&registered);
        doc.observe_head_children(move |doc, _| {
            if !*flag.borrow() {
                *flag.borrow_mut() = true;
                let late = Rc::clone(&late);
                doc.observe_attributes(id, move |_, _| *late.borrow_mut() += 1);
            }
        });

        let other = doc.create_element("meta");
        doc.append_to_head(other);
        assert!(*registered.borrow());

        doc.set_attribute(id, "content", "#00ff00");
        assert_eq!(*late_count.borrow(), 1);
    }

    #[test]
    fn observer_disconnected_inside_callback_gets_no_further_records() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        let victim = doc.observe_attributes(id, move |_, _| *sink.borrow_mut() += 1);

        // Runs after the victim in the same turn and tears it down
        doc.observe_attributes(id, move |doc, _| doc.disconnect(victim));

        doc.set_attribute(id, "content", "#111111");
        // Victim ran once before being disconnected
        assert_eq!(*count.borrow(), 1);

        doc.set_attribute(id, "content", "#222222");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn delivery_is_in_registration_order() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            doc.observe_attributes(id, move |_, _| sink.borrow_mut().push(label));
        }

        doc.set_attribute(id, "content", "#00ff00");
        assert_eq!(order.borrow().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn detached_element_mutations_still_deliver() {
        let mut doc = Document::new();
        let id = meta_with_content(&mut doc, "#ff0000");

        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        doc.observe_attributes(id, move |_, _| *sink.borrow_mut() += 1);

        doc.remove_from_head(id);
        doc.set_attribute(id, "content", "#00ff00");
        assert_eq!(*count.borrow(), 1);
    }
}
