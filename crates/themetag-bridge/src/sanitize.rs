//! Color value validation.
//!
//! Enforced colors end up interpolated into generated JavaScript, so only
//! known-safe formats are let through:
//! - Hex: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
//! - `rgb(r, g, b)` / `rgba(r, g, b, a)` with numeric arguments
//!
//! Named colors are rejected outright, as is anything carrying script or
//! CSS escape characters.

/// Validate a color value.
pub fn validate_color(value: &str) -> Result<(), String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err("empty color value".to_string());
    }

    check_injection_patterns(trimmed)?;

    if let Some(hex) = trimmed.strip_prefix('#') {
        return validate_hex(hex, trimmed);
    }

    if trimmed.starts_with("rgba(") || trimmed.starts_with("rgb(") {
        return validate_rgb_function(trimmed);
    }

    Err(format!(
        "unrecognized color format: only hex and rgb()/rgba() allowed, got '{trimmed}'"
    ))
}

/// Reject patterns that could escape a string or CSS context.
fn check_injection_patterns(value: &str) -> Result<(), String> {
    let lower = value.to_lowercase();

    for pattern in ["expression(", "url(", "javascript:", "eval(", "import"] {
        if lower.contains(pattern) {
            return Err(format!("color rejected: contains '{pattern}'"));
        }
    }

    for ch in [';', '{', '}', '<', '>', '\'', '"', '\\'] {
        if value.contains(ch) {
            return Err(format!("color rejected: contains '{ch}'"));
        }
    }

    Ok(())
}

fn validate_hex(hex: &str, original: &str) -> Result<(), String> {
    if !matches!(hex.len(), 3 | 4 | 6 | 8) {
        return Err(format!(
            "invalid hex color length: expected 3/4/6/8 digits, got {} in '{original}'",
            hex.len()
        ));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color: non-hex digit in '{original}'"));
    }
    Ok(())
}

fn validate_rgb_function(value: &str) -> Result<(), String> {
    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("malformed rgb/rgba: '{value}'"))?;

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let expected = if value.starts_with("rgba(") { 4 } else { 3 };
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} arguments in '{value}', got {}",
            parts.len()
        ));
    }

    for (i, part) in parts.iter().enumerate() {
        if part.parse::<f64>().is_err() {
            return Err(format!(
                "non-numeric argument at position {i} in '{value}': '{part}'"
            ));
        }
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
