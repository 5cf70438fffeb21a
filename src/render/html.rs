//! Serializes a [`SheetLayout`] into one self-contained HTML document.
//!
//! Every cell and picture is an absolutely positioned box inside a container
//! sized to the sheet. Cells come first, so pictures paint over them.

use quick_xml::escape::escape;

use crate::layout::{CellBox, ImageBox, SheetLayout};

const STYLESHEET: &str = r"
body { margin: 0; padding: 16px; background: #ffffff; }
.sheet { position: relative; overflow: visible; }
.cell { position: absolute; box-sizing: border-box; overflow: hidden; }
.cell .text { position: absolute; left: 0; right: 0; padding: 0 2px; }
.cell.nowrap .text { white-space: nowrap; overflow: hidden; }
.cell.wrap { overflow: visible; }
.cell.wrap .text { white-space: normal; overflow: visible; overflow-wrap: break-word; }
.image { position: absolute; }
.image img { display: block; width: 100%; height: 100%; object-fit: contain; }
";

/// Render the whole document.
#[must_use]
pub fn render_document(layout: &SheetLayout, title: &str) -> String {
    let mut out = String::with_capacity(4096 + layout.cells.len() * 256);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str("<style>");
    out.push_str(STYLESHEET);
    out.push_str("</style>\n</head>\n<body>\n");

    out.push_str(&format!(
        "<div class=\"sheet\" style=\"width:{}px;height:{}px\">\n",
        px(layout.width),
        px(layout.height)
    ));
    for cell in &layout.cells {
        render_cell(&mut out, cell);
    }
    for image in &layout.images {
        render_image(&mut out, image);
    }
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn render_cell(out: &mut String, cell: &CellBox) {
    let class = if cell.style.wrap { "cell wrap" } else { "cell nowrap" };
    out.push_str(&format!(
        "<div class=\"{class}\" data-row=\"{}\" data-col=\"{}\" style=\"{}\">",
        cell.row,
        cell.col,
        escape(&cell_css(cell))
    ));
    out.push_str(&format!(
        "<div class=\"text\" style=\"top:{}px\">",
        px(cell.text_offset)
    ));
    push_text(out, &cell.text);
    out.push_str("</div></div>\n");
}

fn render_image(out: &mut String, image: &ImageBox) {
    out.push_str(&format!(
        "<div class=\"image\" data-row=\"{}\" data-col=\"{}\" style=\"left:{}px;top:{}px;width:{}px;height:{}px\">",
        image.row,
        image.col,
        px(image.left),
        px(image.top),
        px(image.width),
        px(image.height)
    ));
    out.push_str(&format!(
        "<img src=\"{}\" alt=\"\"></div>\n",
        escape(&image.data_uri)
    ));
}

/// Inline declarations for one cell box.
#[must_use]
pub fn cell_css(cell: &CellBox) -> String {
    let style = &cell.style;
    let mut css = format!(
        "left:{}px;top:{}px;width:{}px;height:{}px;font-family:'{}';font-size:{}px;line-height:{}px;text-align:{}",
        px(cell.left),
        px(cell.top),
        px(cell.width),
        px(cell.height),
        css_ident(&style.font_family),
        px(cell.font_px),
        px(cell.line_height),
        style.horizontal_align.css()
    );

    if style.bold {
        css.push_str(";font-weight:bold");
    }
    if style.italic {
        css.push_str(";font-style:italic");
    }
    if style.underline {
        css.push_str(";text-decoration:underline");
    }
    if let Some(color) = &style.color {
        css.push_str(&format!(";color:#{color}"));
    }
    if let Some(background) = &style.background_color {
        css.push_str(&format!(";background-color:#{background}"));
    }
    for (edge, line) in style.borders.sides() {
        let color = line.color.as_deref().unwrap_or("000000");
        css.push_str(&format!(";border-{}:1px solid #{color}", edge.as_str()));
    }
    css
}

/// Escaped text with literal newlines as hard breaks.
fn push_text(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        out.push_str(&escape(line.trim_end_matches('\r')));
    }
}

/// Font family names may not break out of their quotes.
fn css_ident(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\'' | '"' | ';' | '\\' | '<' | '>'))
        .collect()
}

/// Pixel value with at most two decimals and no trailing zeros.
#[must_use]
pub fn px(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::{
        BorderLine, BorderStyle, Borders, HAlign, ResolvedCellStyle, StyleRef,
    };
    use test_case::test_case;

    fn cell_box(text: &str, style: ResolvedCellStyle) -> CellBox {
        CellBox {
            row: 1,
            col: 1,
            left: 0.0,
            top: 0.0,
            width: 64.0,
            height: 20.0,
            font_px: 15.0,
            line_height: 18.0,
            text_height: 18.0,
            text_offset: 2.0,
            text: text.to_string(),
            style: StyleRef::new(style),
        }
    }

    #[test_case(64.0, "64")]
    #[test_case(65.5, "65.5")]
    #[test_case(10.0 / 3.0, "3.33")]
    #[test_case(-0.001, "0")]
    #[test_case(f64::NAN, "0")]
    fn pixel_formatting(value: f64, expected: &str) {
        assert_eq!(px(value), expected);
    }

    #[test]
    fn default_cell_css() {
        let css = cell_css(&cell_box("x", ResolvedCellStyle::default()));
        assert_eq!(
            css,
            "left:0px;top:0px;width:64px;height:20px;font-family:'Calibri';font-size:15px;line-height:18px;text-align:left"
        );
    }

    #[test]
    fn styled_cell_css() {
        let style = ResolvedCellStyle {
            bold: true,
            italic: true,
            underline: true,
            color: Some("FF0000".into()),
            background_color: Some("FFFF00".into()),
            horizontal_align: HAlign::Distributed,
            borders: Borders {
                top: Some(BorderLine {
                    style: BorderStyle::Thick,
                    color: Some("00FF00".into()),
                }),
                left: Some(BorderLine {
                    style: BorderStyle::Thin,
                    color: None,
                }),
                ..Borders::default()
            },
            ..ResolvedCellStyle::default()
        };
        let css = cell_css(&cell_box("x", style));
        assert!(css.contains("text-align:justify"));
        assert!(css.contains(";font-weight:bold"));
        assert!(css.contains(";font-style:italic"));
        assert!(css.contains(";text-decoration:underline"));
        assert!(css.contains(";color:#FF0000"));
        assert!(css.contains(";background-color:#FFFF00"));
        assert!(css.ends_with(";border-top:1px solid #00FF00;border-left:1px solid #000000"));
    }

    #[test]
    fn text_is_escaped_with_hard_breaks() {
        let layout = SheetLayout {
            width: 64.0,
            height: 20.0,
            zoom: 100.0,
            cells: vec![cell_box("a < b & c\r\nnext", ResolvedCellStyle::default())],
            images: Vec::new(),
        };
        let html = render_document(&layout, "Q&A");
        assert!(html.contains("<title>Q&amp;A</title>"));
        assert!(html.contains(">a &lt; b &amp; c<br>next</div>"));
        assert!(html.contains("class=\"cell nowrap\""));
        assert!(html.contains("<div class=\"sheet\" style=\"width:64px;height:20px\">"));
    }

    #[test]
    fn images_follow_cells() {
        let layout = SheetLayout {
            width: 128.0,
            height: 40.0,
            zoom: 100.0,
            cells: vec![cell_box("x", ResolvedCellStyle::default())],
            images: vec![ImageBox {
                row: 1,
                col: 2,
                left: 64.0,
                top: 0.0,
                width: 10.0,
                height: 20.0,
                data_uri: "data:image/jpeg;base64,AAAA".into(),
            }],
        };
        let html = render_document(&layout, "sheet");
        let cell_at = html.find("class=\"cell").unwrap();
        let image_at = html.find("class=\"image\"").unwrap();
        assert!(cell_at < image_at);
        assert!(html.contains("style=\"left:64px;top:0px;width:10px;height:20px\""));
        assert!(html.contains("<img src=\"data:image/jpeg;base64,AAAA\""));
    }

    #[test]
    fn font_family_cannot_escape_quotes() {
        let style = ResolvedCellStyle {
            font_family: "Evil';color:red".into(),
            ..ResolvedCellStyle::default()
        };
        let css = cell_css(&cell_box("x", style));
        assert!(css.contains("font-family:'Evilcolor:red'"));
    }
}
