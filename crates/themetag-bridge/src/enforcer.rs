//! Color Enforcer: pins the page's theme color to a fixed value.

use std::cell::RefCell;
use std::rc::Rc;

use themetag_dom::{Document, MutationRecord, ObserverHandle};
use tracing::debug;

use crate::sanitize::validate_color;
use crate::{BridgeError, Result, CONTENT_ATTR, NAME_ATTR, THEME_COLOR_META_NAME};

/// The color enforced when none is supplied.
pub const DEFAULT_ENFORCED_COLOR: &str = "#000000";

/// Forces the page's theme color to a fixed value and keeps it fixed.
///
/// On install the meta element is located — or created with only its name
/// attribute and appended to the head — and its content is immediately set
/// to the fixed value. The attribute observer resets any divergent content,
/// with an equality guard so its own corrective write never re-triggers
/// enforcement. A child-list watch on the head re-runs the procedure when
/// the tag is replaced, disconnecting the stale attribute observer first.
pub struct ColorEnforcer {
    state: Rc<RefCell<WatchState>>,
    color: Rc<String>,
    _head_observer: ObserverHandle,
}

#[derive(Default)]
struct WatchState {
    /// The currently attached attribute observer, if any. Owned here so
    /// re-attachment replaces it explicitly instead of abandoning it.
    attr_observer: Option<ObserverHandle>,
}

impl ColorEnforcer {
    /// Install the enforcer with the default fixed color.
    pub fn install(doc: &mut Document) -> Self {
        Self::install_fixed(doc, DEFAULT_ENFORCED_COLOR.to_string())
    }

    /// Install the enforcer with a caller-supplied fixed color.
    ///
    /// The color is validated up front: enforcing an invalid value would
    /// rewrite garbage for the page's lifetime.
    pub fn with_color(doc: &mut Document, color: impl Into<String>) -> Result<Self> {
        let color = color.into();
        validate_color(&color).map_err(BridgeError::InvalidColor)?;
        Ok(Self::install_fixed(doc, color))
    }

    fn install_fixed(doc: &mut Document, color: String) -> Self {
        let color = Rc::new(color);
        let state = Rc::new(RefCell::new(WatchState::default()));

        // Head watch first, so the initial pass creating the element runs
        // discovery again via its own append and ends up attached.
        let head_state = Rc::clone(&state);
        let head_color = Rc::clone(&color);
        let head_observer = doc.observe_head_children(move |doc, _| {
            debug!("head changed; re-running theme color enforcement");
            find_and_enforce(doc, &head_state, &head_color);
        });

        find_and_enforce(doc, &state, &color);

        Self {
            state,
            color,
            _head_observer: head_observer,
        }
    }

    /// The fixed color being enforced.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Whether an attribute observer is currently attached to a meta
    /// element.
    pub fn is_attached(&self) -> bool {
        self.state.borrow().attr_observer.is_some()
    }
}

/// Locate the theme-color meta element, creating it if absent, attach the
/// guarded attribute observer, and pin the content to the fixed value.
fn find_and_enforce(doc: &mut Document, state: &Rc<RefCell<WatchState>>, color: &Rc<String>) {
    if let Some(stale) = state.borrow_mut().attr_observer.take() {
        doc.disconnect(stale);
    }

    match doc.query_head("meta", NAME_ATTR, THEME_COLOR_META_NAME) {
        Some(target) => {
            let guard = Rc::clone(color);
            let handle = doc.observe_attributes(target, move |doc, record| {
                let MutationRecord::Attributes { target, .. } = record else {
                    return;
                };
                if doc.attribute(*target, CONTENT_ATTR).as_deref() == Some(guard.as_str()) {
                    // Already pinned; writing again would loop
                    return;
                }
                debug!(color = %guard, "restoring enforced theme color");
                doc.set_attribute(*target, CONTENT_ATTR, &guard);
            });
            state.borrow_mut().attr_observer = Some(handle);

            doc.set_attribute(target, CONTENT_ATTR, color);
        }
        None => {
            debug!("theme color element missing; creating it");
            let elm = doc.create_element("meta");
            doc.set_attribute(elm, NAME_ATTR, THEME_COLOR_META_NAME);
            // Appending re-enters discovery through the head watch, which
            // attaches the observer to the new element.
            doc.append_to_head(elm);
            doc.set_attribute(elm, CONTENT_ATTR, color);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
