//! Identifier canonicalization and validation.
//!
//! Identifiers are compared as strings, never as numbers: a 14-digit code
//! with leading zeros must survive every step untouched.

use serde::{Deserialize, Serialize};

/// Characters treated as visual formatting inside a code.
const FORMATTING_CHARS: [char; 3] = ['-', ' ', '.'];

/// Length/format bounds an identifier must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierBounds {
    pub min_digits: usize,
    pub max_digits: usize,
    pub allow_non_numeric: bool,
}

impl Default for IdentifierBounds {
    fn default() -> Self {
        Self {
            min_digits: 8,
            max_digits: 14,
            allow_non_numeric: false,
        }
    }
}

impl IdentifierBounds {
    pub fn new(min_digits: usize, max_digits: usize, allow_non_numeric: bool) -> Self {
        Self { min_digits, max_digits, allow_non_numeric }
    }
}

fn strip_formatting(s: &str) -> String {
    s.chars().filter(|c| !FORMATTING_CHARS.contains(c)).collect()
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Canonicalize a raw cell value.
///
/// Formatted numeric codes (`"4 012-345.678"`) collapse to their digits;
/// anything else keeps its internal punctuation and is only trimmed.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = strip_formatting(trimmed);
    if is_all_digits(&stripped) {
        stripped
    } else {
        trimmed.to_string()
    }
}

/// Render a floating-point cell value as plain integer-ish text.
///
/// No exponent notation, no trailing `.0`. Spreadsheet readers hand over
/// EANs as `f64`, so `4.0123456789012e12` must come back as `4012345678901`.
pub fn render_number(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    if n == 0.0 {
        return "0".into();
    }
    // f64's Display never switches to exponent form and drops a zero fraction.
    format!("{n}")
}

/// Whether `value` qualifies as an identifier under `bounds`.
///
/// Formatting characters are ignored for length measurement only.
/// `max_digits` does not apply to non-numeric codes.
pub fn is_valid(value: &str, bounds: &IdentifierBounds) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    let stripped = strip_formatting(trimmed);
    if stripped.is_empty() {
        return false;
    }
    let len = stripped.chars().count();

    if is_all_digits(&stripped) {
        bounds.min_digits <= len && len <= bounds.max_digits
    } else {
        bounds.allow_non_numeric && len >= bounds.min_digits
    }
}

/// Normalize, then keep the value only if it validates.
pub fn normalize_valid(raw: &str, bounds: &IdentifierBounds) -> Option<String> {
    let normalized = normalize(raw);
    is_valid(&normalized, bounds).then_some(normalized)
}

/// Key used for set membership: digit codes compare exactly,
/// alphanumeric codes case-insensitively.
pub fn match_key(identifier: &str) -> String {
    if is_all_digits(identifier) {
        identifier.to_string()
    } else {
        identifier.to_lowercase()
    }
}
