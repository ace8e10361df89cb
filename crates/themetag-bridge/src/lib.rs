//! Theme-color watchers for webview-embedded pages.
//!
//! Two independent watchers over a page's `meta[name="theme-color"]` tag:
//! - [`ColorReporter`] relays the current value to the native host through a
//!   one-way message channel.
//! - [`ColorEnforcer`] pins the value to a fixed color, recreating the tag
//!   if it is missing.
//!
//! Both pair an attribute observer on the current meta element with a
//! child-list observer on the document head, re-running discovery whenever
//! the head changes. The [`inject`] module renders the equivalent JavaScript
//! user scripts for injection into a real WebKit page.

pub mod enforcer;
pub mod inject;
pub mod message;
pub mod reporter;
pub mod sanitize;

pub use enforcer::{ColorEnforcer, DEFAULT_ENFORCED_COLOR};
pub use message::{HostChannel, MessageLog, ThemeColor};
pub use reporter::ColorReporter;

/// The `name` attribute value that identifies the theme-color meta tag.
pub const THEME_COLOR_META_NAME: &str = "theme-color";

/// Attribute holding the color value.
pub(crate) const CONTENT_ATTR: &str = "content";
/// Attribute identifying the meta tag.
pub(crate) const NAME_ATTR: &str = "name";

/// Errors surfaced by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid color value: {0}")]
    InvalidColor(String),

    #[error("invalid message handler name: {0}")]
    InvalidHandlerName(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
