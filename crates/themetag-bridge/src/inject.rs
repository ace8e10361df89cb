//! Injectable user scripts for a real WebKit page.
//!
//! The host shell registers these with its user content manager; the
//! reporter additionally needs a script message handler registered under
//! the name baked into its script. Parameters are validated before
//! interpolation so a hostile handler name or color string cannot escape
//! into the page.

use crate::sanitize::validate_color;
use crate::{BridgeError, Result};

/// Script message handler name the host registers for theme color reports.
pub const DEFAULT_HANDLER_NAME: &str = "themeColor";

const REPORTER_TEMPLATE: &str = r#"(function() {
  function send(value) {
    window.webkit.messageHandlers.__HANDLER__.postMessage(value);
  }
  function watch(elm) {
    var observer = new MutationObserver(function(mutations) {
      mutations.forEach(function(mutation) {
        if (mutation.type === "attributes") {
          send(mutation.target.content);
        }
      });
    });
    send(elm.content);
    observer.observe(elm, { attributes: true });
  }
  function discover() {
    var elm = document.querySelector('meta[name="theme-color"]');
    if (elm) watch(elm);
    else send(null);
  }
  new MutationObserver(discover).observe(document.head, {
    childList: true,
    subtree: true
  });
  discover();
})();
"#;

const ENFORCER_TEMPLATE: &str = r#"(function() {
  var FIXED = "__COLOR__";
  function pin() {
    document.querySelector('meta[name="theme-color"]').content = FIXED;
  }
  function watch(elm) {
    var observer = new MutationObserver(function(mutations) {
      mutations.forEach(function(mutation) {
        if (mutation.type === "attributes") {
          if (elm.content === FIXED) return;
          pin();
        }
      });
    });
    observer.observe(elm, { attributes: true });
  }
  function discover() {
    var elm = document.querySelector('meta[name="theme-color"]');
    if (elm) {
      watch(elm);
    } else {
      elm = document.createElement("meta");
      elm.name = "theme-color";
      document.head.appendChild(elm);
    }
    pin();
  }
  new MutationObserver(discover).observe(document.head, {
    childList: true,
    subtree: true
  });
  discover();
})();
"#;

/// Render the reporter user script, posting to the given script message
/// handler. The handler name must be non-empty ASCII alphanumeric.
pub fn reporter_script(handler: &str) -> Result<String> {
    if handler.is_empty() || !handler.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BridgeError::InvalidHandlerName(handler.to_string()));
    }
    Ok(REPORTER_TEMPLATE.replace("__HANDLER__", handler))
}

/// Render the enforcer user script with the fixed color baked in. The
/// color is validated before interpolation.
pub fn enforcer_script(color: &str) -> Result<String> {
    validate_color(color).map_err(BridgeError::InvalidColor)?;
    Ok(ENFORCER_TEMPLATE.replace("__COLOR__", color.trim()))
}

// =============================================================================
// TESTS
// =============================================================================
