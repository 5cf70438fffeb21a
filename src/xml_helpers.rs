//! Shared XML attribute parsing utilities.
//!
//! All functions handle UTF-8 conversion safely and never fail: a missing or
//! malformed attribute is `None`.

use quick_xml::events::BytesStart;

/// Extract a string attribute value by its qualified key (e.g. `b"rgb"`).
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return std::str::from_utf8(&attr.value).ok().map(ToString::to_string);
        }
    }
    None
}

/// Extract a string attribute by local name, ignoring its namespace prefix
/// (`r:embed`, `embed` and `foo:embed` all match `b"embed"`).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return std::str::from_utf8(&attr.value).ok().map(ToString::to_string);
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `i64` attribute value by key.
pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Recognizes `"1"`, `"true"` as true; anything else present is false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Extract the `val` attribute as a string. Very common in SpreadsheetML.
pub fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

/// Extract the `val` attribute as `f64`.
pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string() {
        let e = make_start(r#"<foo name="hello" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("hello".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_string_local_ignores_prefix() {
        let e = make_start(r#"<a:blip r:embed="rId3" />"#);
        assert_eq!(attr_string_local(&e, b"embed"), Some("rId3".to_string()));
        assert_eq!(attr_string(&e, b"embed"), None);
    }

    #[test]
    fn test_numeric_attrs() {
        let e = make_start(r#"<xdr:ext cx="95250" cy="-3" width="8.43" />"#);
        assert_eq!(attr_i64(&e, b"cx"), Some(95_250));
        assert_eq!(attr_i64(&e, b"cy"), Some(-3));
        assert_eq!(attr_u32(&e, b"cy"), None);
        let diff = attr_f64(&e, b"width").unwrap_or(0.0) - 8.43;
        assert!(diff.abs() < f64::EPSILON);
    }

    #[test]
    fn test_attr_bool() {
        let e = make_start(r#"<foo a="1" b="0" c="true" d="false" />"#);
        assert_eq!(attr_bool(&e, b"a"), Some(true));
        assert_eq!(attr_bool(&e, b"b"), Some(false));
        assert_eq!(attr_bool(&e, b"c"), Some(true));
        assert_eq!(attr_bool(&e, b"d"), Some(false));
        assert_eq!(attr_bool(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_val() {
        let e = make_start(r#"<sz val="12.5" />"#);
        assert_eq!(attr_val(&e), Some("12.5".to_string()));
        assert_eq!(attr_val_f64(&e), Some(12.5));
    }
}
