//! Hex color codes and RGB conversion.
//!
//! Dominant colors travel through the table as `#rrggbb` strings. Parsing is
//! strict: a malformed code is a hard error for the row, never silently
//! replaced by a default color.

use std::fmt;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors that can occur while parsing a `#rrggbb` color code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// The code does not have exactly six hex digits (after the optional `#`).
    BadLength(usize),
    /// A character outside `[0-9a-fA-F]`.
    BadDigit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(n) => write!(f, "expected 6 hex digits, got {}", n),
            Self::BadDigit(c) => write!(f, "invalid hex digit {:?}", c),
        }
    }
}

impl std::error::Error for ColorParseError {}

// ── Conversion ─────────────────────────────────────────────────────────────

/// Format an RGB triple as a lowercase `#rrggbb` code.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parse a 6-hex-digit color code, with or without a leading `#`.
pub fn hex_to_rgb(code: &str) -> Result<[u8; 3], ColorParseError> {
    let digits = code.strip_prefix('#').unwrap_or(code);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorParseError::BadDigit(bad));
    }
    if digits.len() != 6 {
        return Err(ColorParseError::BadLength(digits.len()));
    }
    let byte = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16).expect("validated hex digits")
    };
    Ok([byte(0), byte(2), byte(4)])
}

// ── Tests ──────────────────────────────────────────────────────────────────
