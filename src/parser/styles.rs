//! Parsing of xl/styles.xml
//!
//! Only the four positional tables the renderer joins are kept: fonts, fills,
//! borders and cell formats (`cellXfs`). Document order is the index.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::color::ColorRef;
use crate::error::{Result, XlstaticError};
use crate::types::{CellXf, RawAlignment, RawBorder, RawBorderSide, RawFill, RawFont, StyleTable};
use crate::xml_helpers::{attr_bool, attr_string, attr_u32, attr_val, attr_val_f64};

/// Which side of the border record a `color` child belongs to.
#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"left" | b"start" => Some(Self::Left),
            b"right" | b"end" => Some(Self::Right),
            b"top" => Some(Self::Top),
            b"bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    fn slot(self, border: &mut RawBorder) -> &mut Option<RawBorderSide> {
        match self {
            Self::Left => &mut border.left,
            Self::Right => &mut border.right,
            Self::Top => &mut border.top,
            Self::Bottom => &mut border.bottom,
        }
    }
}

/// A toggle element like `<b/>` or `<b val="0"/>`.
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(attr_val(e).as_deref(), Some("0" | "false"))
}

/// Parse styles.xml content
///
/// # Errors
/// Returns an error if the XML is malformed or is not a stylesheet.
#[allow(clippy::too_many_lines)]
pub fn parse_styles(data: &[u8]) -> Result<StyleTable> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut table = StyleTable::default();
    let mut buf = Vec::new();
    let mut saw_root = false;

    // Section state
    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_cell_xfs = false;

    let mut current_font: Option<RawFont> = None;
    let mut current_fill: Option<RawFill> = None;
    let mut in_pattern_fill = false;
    let mut current_border: Option<RawBorder> = None;
    let mut current_side: Option<Side> = None;
    let mut current_xf: Option<CellXf> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            ref event @ (Event::Start(ref e) | Event::Empty(ref e)) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();

                match name.as_ref() {
                    b"styleSheet" => saw_root = true,
                    b"fonts" => in_fonts = !is_empty,
                    b"fills" => in_fills = !is_empty,
                    b"borders" => in_borders = !is_empty,
                    b"cellXfs" => in_cell_xfs = !is_empty,

                    b"font" if in_fonts => {
                        if is_empty {
                            table.fonts.push(RawFont::default());
                        } else {
                            current_font = Some(RawFont::default());
                        }
                    }
                    b"sz" => {
                        if let Some(font) = current_font.as_mut() {
                            font.size = attr_val_f64(e);
                        }
                    }
                    b"name" => {
                        if let Some(font) = current_font.as_mut() {
                            font.name = attr_val(e).filter(|n| !n.is_empty());
                        }
                    }
                    b"b" => {
                        if let Some(font) = current_font.as_mut() {
                            font.bold = toggle_on(e);
                        }
                    }
                    b"i" => {
                        if let Some(font) = current_font.as_mut() {
                            font.italic = toggle_on(e);
                        }
                    }
                    b"u" => {
                        if let Some(font) = current_font.as_mut() {
                            font.underline = attr_val(e).as_deref() != Some("none");
                        }
                    }

                    b"fill" if in_fills => {
                        if is_empty {
                            table.fills.push(RawFill::default());
                        } else {
                            current_fill = Some(RawFill::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern_type = attr_string(e, b"patternType");
                            in_pattern_fill = !is_empty;
                        }
                    }
                    b"fgColor" if in_pattern_fill => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg_color = Some(ColorRef::from_element(e));
                        }
                    }

                    b"border" if in_borders => {
                        if is_empty {
                            table.borders.push(RawBorder::default());
                        } else {
                            current_border = Some(RawBorder::default());
                        }
                    }
                    side_name if current_border.is_some() && Side::from_name(side_name).is_some() => {
                        if let (Some(border), Some(side)) =
                            (current_border.as_mut(), Side::from_name(side_name))
                        {
                            // A side without a style draws nothing
                            *side.slot(border) = attr_string(e, b"style")
                                .filter(|s| !s.is_empty() && s != "none")
                                .map(|style| RawBorderSide { style, color: None });
                            current_side = if is_empty { None } else { Some(side) };
                        }
                    }

                    b"color" => {
                        if let Some(font) = current_font.as_mut() {
                            font.color = Some(ColorRef::from_element(e));
                        } else if let (Some(border), Some(side)) =
                            (current_border.as_mut(), current_side)
                        {
                            if let Some(line) = side.slot(border).as_mut() {
                                line.color = Some(ColorRef::from_element(e));
                            }
                        }
                    }

                    b"xf" if in_cell_xfs => {
                        let xf = CellXf {
                            font_id: attr_u32(e, b"fontId"),
                            fill_id: attr_u32(e, b"fillId"),
                            border_id: attr_u32(e, b"borderId"),
                            alignment: None,
                        };
                        if is_empty {
                            table.cell_xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    b"alignment" => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.alignment = Some(RawAlignment {
                                horizontal: attr_string(e, b"horizontal"),
                                vertical: attr_string(e, b"vertical"),
                                wrap_text: attr_bool(e, b"wrapText").unwrap_or(false),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"fills" => in_fills = false,
                b"borders" => in_borders = false,
                b"cellXfs" => in_cell_xfs = false,
                b"font" => {
                    if let Some(font) = current_font.take() {
                        table.fonts.push(font);
                    }
                }
                b"patternFill" => in_pattern_fill = false,
                b"fill" => {
                    if let Some(fill) = current_fill.take() {
                        table.fills.push(fill);
                    }
                    in_pattern_fill = false;
                }
                b"border" => {
                    if let Some(border) = current_border.take() {
                        table.borders.push(border);
                    }
                    current_side = None;
                }
                b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end" => {
                    current_side = None;
                }
                b"xf" => {
                    if let Some(xf) = current_xf.take() {
                        table.cell_xfs.push(xf);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(XlstaticError::Style("no <styleSheet> root element".to_string()));
    }

    Ok(table)
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="3">
  <font><sz val="11"/><name val="Calibri"/></font>
  <font><b/><i/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  <font><b val="0"/><u val="none"/><color theme="1"/></font>
</fonts>
<fills count="3">
  <fill><patternFill patternType="none"/></fill>
  <fill><patternFill patternType="gray125"/></fill>
  <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
</fills>
<borders count="2">
  <border><left/><right/><top/><bottom/><diagonal/></border>
  <border><left style="thin"><color rgb="FF00FF00"/></left><right style="none"/><top style="medium"/><bottom style="thick"><color auto="1"/></bottom></border>
</borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="1" fillId="2" borderId="1"/></cellStyleXfs>
<cellXfs count="2">
  <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
  <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyAlignment="1"><alignment horizontal="center" vertical="top" wrapText="1"/></xf>
</cellXfs>
<dxfs count="1"><dxf><font><b/></font><fill><patternFill><bgColor rgb="FF000000"/></patternFill></fill></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn parses_tables_positionally() {
        let table = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(table.fonts.len(), 3);
        assert_eq!(table.fills.len(), 3);
        assert_eq!(table.borders.len(), 2);
        assert_eq!(table.cell_xfs.len(), 2);
    }

    #[test]
    fn parses_font_properties() {
        let table = parse_styles(STYLES.as_bytes()).unwrap();
        let font = &table.fonts[1];
        assert!(font.bold && font.italic && font.underline);
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.name.as_deref(), Some("Arial"));
        assert_eq!(font.color.as_ref().unwrap().rgb.as_deref(), Some("FFFF0000"));

        let off = &table.fonts[2];
        assert!(!off.bold);
        assert!(!off.underline);
        assert_eq!(off.size, None);
        assert_eq!(off.color.as_ref().unwrap().theme, Some(1));
    }

    #[test]
    fn parses_pattern_fill_foreground() {
        let table = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(table.fills[0].pattern_type.as_deref(), Some("none"));
        let solid = &table.fills[2];
        assert_eq!(solid.pattern_type.as_deref(), Some("solid"));
        assert_eq!(solid.fg_color.as_ref().unwrap().rgb.as_deref(), Some("FFFFFF00"));
    }

    #[test]
    fn parses_border_sides() {
        let table = parse_styles(STYLES.as_bytes()).unwrap();
        assert!(table.borders[0].left.is_none());
        let border = &table.borders[1];
        let left = border.left.as_ref().unwrap();
        assert_eq!(left.style, "thin");
        assert_eq!(left.color.as_ref().unwrap().rgb.as_deref(), Some("FF00FF00"));
        assert!(border.right.is_none());
        assert!(border.top.as_ref().unwrap().color.is_none());
        assert!(border.bottom.as_ref().unwrap().color.as_ref().unwrap().auto);
    }

    #[test]
    fn cell_style_xfs_and_dxfs_are_not_mixed_in() {
        let table = parse_styles(STYLES.as_bytes()).unwrap();
        let xf = &table.cell_xfs[1];
        assert_eq!(xf.font_id, Some(1));
        assert_eq!(xf.fill_id, Some(2));
        assert_eq!(xf.border_id, Some(1));
        let align = xf.alignment.as_ref().unwrap();
        assert_eq!(align.horizontal.as_deref(), Some("center"));
        assert_eq!(align.vertical.as_deref(), Some("top"));
        assert!(align.wrap_text);
        assert!(table.cell_xfs[0].alignment.is_none());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_styles(b"<styleSheet><fonts></styleSheet>").unwrap_err();
        assert!(matches!(err, XlstaticError::Xml(_)));
    }

    #[test]
    fn non_stylesheet_is_an_error() {
        let err = parse_styles(b"<worksheet/>").unwrap_err();
        assert!(matches!(err, XlstaticError::Style(_)));
    }
}
