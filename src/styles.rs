//! Style resolution: joins a cell's format-record index with the font, fill
//! and border tables into one flat [`ResolvedCellStyle`].
//!
//! Resolution never fails. Every index that is absent or out of range falls
//! back to its documented default, and a resolver built without a style
//! table hands out the default style for every cell.

use std::collections::HashMap;

use crate::types::{
    BorderLine, BorderStyle, Borders, HAlign, RawBorderSide, ResolvedCellStyle, StyleRef,
    StyleTable, VAlign, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE,
};

/// Memoizing style joiner for one conversion run.
#[derive(Debug)]
pub struct StyleResolver {
    table: Option<StyleTable>,
    default_style: StyleRef,
    cache: HashMap<u32, StyleRef>,
    cache_hits: u64,
}

impl StyleResolver {
    #[must_use]
    pub fn new(table: StyleTable) -> Self {
        Self {
            table: Some(table),
            default_style: StyleRef::new(ResolvedCellStyle::default()),
            cache: HashMap::new(),
            cache_hits: 0,
        }
    }

    /// Degraded resolver used when the styles part is missing or malformed.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            table: None,
            default_style: StyleRef::new(ResolvedCellStyle::default()),
            cache: HashMap::new(),
            cache_hits: 0,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.table.is_none()
    }

    #[must_use]
    pub fn default_style(&self) -> StyleRef {
        self.default_style.clone()
    }

    /// Resolve a cell's style index, computing each distinct index once.
    pub fn resolve(&mut self, index: Option<u32>) -> StyleRef {
        let (Some(idx), Some(table)) = (index, self.table.as_ref()) else {
            return self.default_style.clone();
        };

        if let Some(style) = self.cache.get(&idx) {
            self.cache_hits = self.cache_hits.saturating_add(1);
            return style.clone();
        }

        let style = match resolve_style(table, idx) {
            Some(resolved) => StyleRef::new(resolved),
            None => self.default_style.clone(),
        };
        self.cache.insert(idx, style.clone());
        style
    }

    /// Number of distinct style indices resolved so far.
    #[must_use]
    pub fn cached_styles(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }
}

/// Resolve one format-record index against the tables.
///
/// Returns `None` when the index is out of range, so the caller can share the
/// default record instead of allocating a copy.
#[must_use]
pub fn resolve_style(table: &StyleTable, idx: u32) -> Option<ResolvedCellStyle> {
    let xf = table.cell_xfs.get(idx as usize)?;
    let mut style = ResolvedCellStyle::default();

    if let Some(font) = xf.font_id.and_then(|id| table.fonts.get(id as usize)) {
        style.bold = font.bold;
        style.italic = font.italic;
        style.underline = font.underline;
        style.size = font
            .size
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        style.color = font.color.as_ref().and_then(|c| c.resolve());
        style.font_family = font
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string());
    }

    if let Some(fill) = xf.fill_id.and_then(|id| table.fills.get(id as usize)) {
        let patterned = fill
            .pattern_type
            .as_deref()
            .is_some_and(|p| p != "none");
        if patterned {
            style.background_color = fill.fg_color.as_ref().and_then(|c| c.resolve());
        }
    }

    if let Some(border) = xf.border_id.and_then(|id| table.borders.get(id as usize)) {
        style.borders = Borders {
            top: resolve_border(border.top.as_ref()),
            right: resolve_border(border.right.as_ref()),
            bottom: resolve_border(border.bottom.as_ref()),
            left: resolve_border(border.left.as_ref()),
        };
    }

    if let Some(align) = xf.alignment.as_ref() {
        style.horizontal_align = align
            .horizontal
            .as_deref()
            .map_or(HAlign::General, HAlign::parse);
        style.vertical_align = align
            .vertical
            .as_deref()
            .map_or(VAlign::Bottom, VAlign::parse);
        style.wrap = align.wrap_text;
    }

    Some(style)
}

fn resolve_border(side: Option<&RawBorderSide>) -> Option<BorderLine> {
    let side = side?;
    Some(BorderLine {
        style: BorderStyle::parse(&side.style)?,
        color: side.color.as_ref().and_then(|c| c.resolve()),
    })
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
    use crate::color::ColorRef;
    use crate::types::{CellXf, RawAlignment, RawBorder, RawFill, RawFont};

    fn rgb(hex: &str) -> Option<ColorRef> {
        Some(ColorRef {
            rgb: Some(hex.to_string()),
            ..ColorRef::default()
        })
    }

    fn sample_table() -> StyleTable {
        StyleTable {
            fonts: vec![
                RawFont {
                    name: Some("Calibri".into()),
                    size: Some(11.0),
                    ..RawFont::default()
                },
                RawFont {
                    name: Some("Georgia".into()),
                    size: Some(16.0),
                    bold: true,
                    underline: true,
                    color: rgb("FF336699"),
                    ..RawFont::default()
                },
            ],
            fills: vec![
                RawFill {
                    pattern_type: Some("none".into()),
                    fg_color: rgb("FFFF0000"),
                },
                RawFill {
                    pattern_type: Some("solid".into()),
                    fg_color: rgb("FFFFFF00"),
                },
            ],
            borders: vec![
                RawBorder::default(),
                RawBorder {
                    left: Some(RawBorderSide {
                        style: "thin".into(),
                        color: rgb("FF00FF00"),
                    }),
                    bottom: Some(RawBorderSide {
                        style: "double".into(),
                        color: None,
                    }),
                    top: Some(RawBorderSide {
                        style: "bogus".into(),
                        color: None,
                    }),
                    ..RawBorder::default()
                },
            ],
            cell_xfs: vec![
                CellXf {
                    font_id: Some(0),
                    fill_id: Some(0),
                    border_id: Some(0),
                    alignment: None,
                },
                CellXf {
                    font_id: Some(1),
                    fill_id: Some(1),
                    border_id: Some(1),
                    alignment: Some(RawAlignment {
                        horizontal: Some("distributed".into()),
                        vertical: Some("center".into()),
                        wrap_text: true,
                    }),
                },
                CellXf {
                    font_id: Some(42),
                    fill_id: Some(42),
                    border_id: Some(42),
                    alignment: None,
                },
            ],
        }
    }

    #[test]
    fn joins_all_four_tables() {
        let style = resolve_style(&sample_table(), 1).unwrap();
        assert!(style.bold);
        assert!(!style.italic);
        assert!(style.underline);
        assert_eq!(style.size, 16.0);
        assert_eq!(style.font_family, "Georgia");
        assert_eq!(style.color.as_deref(), Some("336699"));
        assert_eq!(style.background_color.as_deref(), Some("FFFF00"));
        assert_eq!(style.horizontal_align, HAlign::Distributed);
        assert_eq!(style.vertical_align, VAlign::Center);
        assert!(style.wrap);

        let left = style.borders.left.as_ref().unwrap();
        assert_eq!(left.style, BorderStyle::Thin);
        assert_eq!(left.color.as_deref(), Some("00FF00"));
        let bottom = style.borders.bottom.as_ref().unwrap();
        assert_eq!(bottom.style, BorderStyle::Double);
        assert_eq!(bottom.color, None);
        assert!(style.borders.top.is_none());
        assert!(style.borders.right.is_none());
    }

    #[test]
    fn none_pattern_has_no_background() {
        let style = resolve_style(&sample_table(), 0).unwrap();
        assert_eq!(style.background_color, None);
        assert_eq!(style, ResolvedCellStyle::default());
    }

    #[test]
    fn dangling_table_indices_use_defaults() {
        let style = resolve_style(&sample_table(), 2).unwrap();
        assert_eq!(style, ResolvedCellStyle::default());
    }

    #[test]
    fn out_of_range_and_absent_index_give_default_style() {
        let mut resolver = StyleResolver::new(sample_table());
        let expected = ResolvedCellStyle::default();
        assert_eq!(*resolver.resolve(Some(99)), expected);
        assert_eq!(*resolver.resolve(None), expected);
        assert!(!expected.bold);
        assert_eq!(expected.size, 11.0);
        assert_eq!(expected.color, None);
        assert!(!expected.wrap);
        assert_eq!(expected.horizontal_align, HAlign::General);
        assert_eq!(expected.vertical_align, VAlign::Bottom);
        assert_eq!(expected.font_family, "Calibri");
    }

    #[test]
    fn resolution_is_memoized_per_index() {
        let mut resolver = StyleResolver::new(sample_table());
        let first = resolver.resolve(Some(1));
        let second = resolver.resolve(Some(1));
        assert!(first.ptr_eq(&second));
        assert_eq!(resolver.cached_styles(), 1);
        assert_eq!(resolver.cache_hits(), 1);
    }

    #[test]
    fn fallback_resolver_always_returns_default() {
        let mut resolver = StyleResolver::fallback();
        assert!(resolver.is_fallback());
        let style = resolver.resolve(Some(1));
        assert!(style.ptr_eq(&resolver.default_style()));
        assert_eq!(resolver.cached_styles(), 0);
    }
}
