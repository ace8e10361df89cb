//! The one-way host message channel.
//!
//! The reporter posts one message per reporting event. On the wire this is
//! the body of a WebKit script message: a JSON string for a color, JSON
//! `null` for "no color". There is no acknowledgment, no response channel,
//! and no delivery guarantee — posting is the entire contract.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A theme-color report: the current color string, or an explicit "no
/// color" signal. Serializes to a JSON string or JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeColor {
    Color(String),
    None,
}

impl ThemeColor {
    /// Parse a report from a raw script-message body.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// The color string, if any.
    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Color(c) => Some(c),
            Self::None => None,
        }
    }
}

impl From<Option<String>> for ThemeColor {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(color) => Self::Color(color),
            None => Self::None,
        }
    }
}

/// One-way, fire-and-forget channel to the embedding host.
pub trait HostChannel {
    fn post(&self, message: ThemeColor);
}

/// In-memory channel that records every posted message.
///
/// The host event loop (or a test) drains it periodically; the watchers are
/// single-threaded, so a shared `Rc` is all the plumbing needed.
#[derive(Clone, Default)]
pub struct MessageLog {
    messages: Rc<RefCell<Vec<ThemeColor>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all messages posted since the last drain.
    pub fn drain(&self) -> Vec<ThemeColor> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    /// How many messages are waiting.
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl HostChannel for MessageLog {
    fn post(&self, message: ThemeColor) {
        debug!(?message, "theme color posted to host");
        self.messages.borrow_mut().push(message);
    }
}

// =============================================================================
// TESTS
// =============================================================================
