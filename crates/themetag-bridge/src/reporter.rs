//! Color Reporter: relays the page's theme color to the host.

use std::cell::RefCell;
use std::rc::Rc;

use themetag_dom::{Document, ElementId, MutationRecord, ObserverHandle};
use tracing::debug;

use crate::message::{HostChannel, ThemeColor};
use crate::{CONTENT_ATTR, NAME_ATTR, THEME_COLOR_META_NAME};

/// Relays the current `theme-color` value to the host, one message per
/// reporting event: the value at install time (or an explicit none), then
/// the element's content after every attribute mutation.
///
/// A child-list watch on the head re-runs discovery whenever the meta tag
/// is replaced; the stale attribute observer is disconnected before the
/// replacement is registered. Element absence is a valid, explicitly
/// signaled state, not a failure.
pub struct ColorReporter {
    state: Rc<RefCell<WatchState>>,
    _head_observer: ObserverHandle,
}

#[derive(Default)]
struct WatchState {
    /// The currently attached attribute observer, if any. Owned here so
    /// re-attachment replaces it explicitly instead of abandoning it.
    attr_observer: Option<ObserverHandle>,
}

impl ColorReporter {
    /// Install the reporter on a document. Reports the current state
    /// immediately, then keeps reporting for the document's lifetime.
    pub fn install(doc: &mut Document, channel: Rc<dyn HostChannel>) -> Self {
        let state = Rc::new(RefCell::new(WatchState::default()));

        let head_state = Rc::clone(&state);
        let head_channel = Rc::clone(&channel);
        let head_observer = doc.observe_head_children(move |doc, _| {
            debug!("head changed; re-running theme color discovery");
            find_and_report(doc, &head_state, &head_channel);
        });

        find_and_report(doc, &state, &channel);

        Self {
            state,
            _head_observer: head_observer,
        }
    }

    /// Whether an attribute observer is currently attached to a meta
    /// element.
    pub fn is_attached(&self) -> bool {
        self.state.borrow().attr_observer.is_some()
    }
}

/// Locate the theme-color meta element; report its content and attach an
/// attribute observer if present, report an explicit none otherwise.
fn find_and_report(
    doc: &mut Document,
    state: &Rc<RefCell<WatchState>>,
    channel: &Rc<dyn HostChannel>,
) {
    if let Some(stale) = state.borrow_mut().attr_observer.take() {
        doc.disconnect(stale);
    }

    match doc.query_head("meta", NAME_ATTR, THEME_COLOR_META_NAME) {
        Some(target) => {
            report(doc, target, channel);

            let channel = Rc::clone(channel);
            let handle = doc.observe_attributes(target, move |doc, record| {
                let MutationRecord::Attributes { target, .. } = record else {
                    return;
                };
                report(doc, *target, &channel);
            });
            state.borrow_mut().attr_observer = Some(handle);
        }
        None => {
            debug!("no theme color element; reporting none");
            channel.post(ThemeColor::None);
        }
    }
}

fn report(doc: &Document, target: ElementId, channel: &Rc<dyn HostChannel>) {
    let message = ThemeColor::from(doc.attribute(target, CONTENT_ATTR));
    channel.post(message);
}

// =============================================================================
// TESTS
// =============================================================================
