//! Color references from the style tables and their resolution to hex.

use quick_xml::events::BytesStart;

use crate::xml_helpers::{attr_bool, attr_string, attr_u32};

/// Theme colors are not resolved against the theme palette; they render with
/// this neutral placeholder.
pub const THEME_PLACEHOLDER: &str = "000000";

/// A `<color>`-like element: `rgb`, `theme`, `indexed` and `auto` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorRef {
    pub rgb: Option<String>,
    pub theme: Option<u32>,
    pub indexed: Option<u32>,
    pub auto: bool,
}

impl ColorRef {
    /// Read the color attributes of an element (`color`, `fgColor`, ...).
    pub fn from_element(e: &BytesStart) -> Self {
        Self {
            rgb: attr_string(e, b"rgb"),
            theme: attr_u32(e, b"theme"),
            indexed: attr_u32(e, b"indexed"),
            auto: attr_bool(e, b"auto").unwrap_or(false),
        }
    }

    /// Resolve to a bare `RRGGBB` hex string.
    ///
    /// Priority: rgb > theme. Indexed and auto colors resolve to `None`,
    /// as does an `rgb` value that is neither 6 nor 8 hex digits.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        if let Some(rgb) = &self.rgb {
            return normalize_hex(rgb);
        }
        if self.theme.is_some() {
            return Some(THEME_PLACEHOLDER.to_string());
        }
        None
    }
}

/// Normalize `AARRGGBB` or `RRGGBB` (optionally `#`-prefixed) to uppercase `RRGGBB`.
#[must_use]
pub fn normalize_hex(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = match hex.len() {
        8 => hex.get(2..)?,
        6 => hex,
        _ => return None,
    };
    Some(rgb.to_ascii_uppercase())
}
