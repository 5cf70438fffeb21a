//! Worksheet parsing: shared strings, cell values with their style index,
//! column and row overrides, and the sheet-view zoom.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::cell_ref::parse_cell_ref;
use crate::config::UnitMetrics;
use crate::error::Result;
use crate::layout::{Axis, DimensionTable};
use crate::types::{Diagnostic, DiagnosticKind, RawCell};
use crate::xml_helpers::{attr_f64, attr_u32};

/// Zoom used when the sheet view carries none (percent).
pub const DEFAULT_ZOOM: f64 = 100.0;

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Number,
}

pub(crate) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Number,
    }
}

/// One parsed worksheet.
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Cells in document order
    pub cells: Vec<RawCell>,
    /// Column widths in characters
    pub columns: DimensionTable,
    /// Row heights in points
    pub rows: DimensionTable,
    /// Sheet-view zoom in percent
    pub zoom: f64,
    pub max_row: u32,
    pub max_col: u32,
    /// Recovered problems (rejected dimension entries)
    pub diagnostics: Vec<Diagnostic>,
}

impl Worksheet {
    /// A sheet with no cells and default dimensions.
    #[must_use]
    pub fn empty(metrics: &UnitMetrics) -> Self {
        Self {
            cells: Vec::new(),
            columns: DimensionTable::new(Axis::Column, metrics.default_column_width),
            rows: DimensionTable::new(Axis::Row, metrics.default_row_height),
            zoom: DEFAULT_ZOOM,
            max_row: 0,
            max_col: 0,
            diagnostics: Vec::new(),
        }
    }
}

/// Parse the shared-string table.
///
/// Each entry is the concatenation of its plain and rich-text runs; phonetic
/// runs (`rPh`) are left out.
///
/// # Errors
/// Returns an error if the part is not well-formed XML.
pub fn parse_shared_strings(data: &[u8]) -> Result<Vec<String>> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut phonetic_depth: u32 = 0;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => phonetic_depth += 1,
                b"t" if in_si && phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::Text(ref t) if in_t => {
                current.push_str(&t.unescape()?);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!(count = strings.len(), "shared strings parsed");
    Ok(strings)
}

#[derive(Debug)]
struct CellBuilder {
    row: u32,
    col: u32,
    kind: CellTypeTag,
    style_index: Option<u32>,
    value: Option<String>,
    inline: String,
}

impl CellBuilder {
    fn finish(self, shared_strings: &[String]) -> RawCell {
        let value = match self.kind {
            CellTypeTag::Shared => self
                .value
                .as_deref()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .and_then(|idx| shared_strings.get(idx).cloned())
                .unwrap_or_default(),
            CellTypeTag::Bool => match self.value.as_deref().map(str::trim) {
                Some("1" | "true") => "TRUE".to_string(),
                Some(_) => "FALSE".to_string(),
                None => String::new(),
            },
            CellTypeTag::Inline => self.inline,
            CellTypeTag::Str | CellTypeTag::Error | CellTypeTag::Number => {
                self.value.unwrap_or_default()
            }
        };
        RawCell {
            row: self.row,
            col: self.col,
            value,
            style_index: self.style_index,
        }
    }
}

/// Where text events inside a cell go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Inline,
}

/// Parse one worksheet part.
///
/// Cells without an `r` reference take the next position in their row, as
/// spreadsheet writers are allowed to omit it. Dimension entries that would
/// break the geometry are dropped and recorded as diagnostics.
///
/// # Errors
/// Returns an error if the part is not well-formed XML.
pub fn parse_worksheet(
    data: &[u8],
    part: &str,
    shared_strings: &[String],
    metrics: &UnitMetrics,
) -> Result<Worksheet> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(false);

    let mut sheet = Worksheet::empty(metrics);
    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 1;
    let mut cell: Option<CellBuilder> = None;
    let mut text_target = TextTarget::None;
    let mut phonetic_depth: u32 = 0;
    let mut seen_view = false;

    loop {
        let event = xml.read_event_into(&mut buf)?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"sheetView" if !seen_view => {
                    seen_view = true;
                    sheet.zoom = attr_f64(e, b"zoomScale")
                        .filter(|z| z.is_finite() && *z > 0.0)
                        .unwrap_or(DEFAULT_ZOOM);
                }
                b"col" => read_column(e, part, &mut sheet),
                b"row" => {
                    current_row = attr_u32(e, b"r").unwrap_or(current_row.saturating_add(1));
                    next_col = 1;
                    if let Some(ht) = attr_f64(e, b"ht") {
                        set_dimension(&mut sheet, part, Axis::Row, current_row, ht);
                    }
                    if current_row <= Axis::Row.max_index() {
                        sheet.max_row = sheet.max_row.max(current_row);
                    }
                }
                b"c" => {
                    let builder = read_cell_start(e, current_row, next_col);
                    next_col = builder.col.saturating_add(1);
                    if is_start {
                        cell = Some(builder);
                    } else {
                        push_cell(&mut sheet, builder.finish(shared_strings));
                    }
                }
                b"v" if is_start && cell.is_some() => text_target = TextTarget::Value,
                b"rPh" if is_start => phonetic_depth += 1,
                b"t" if is_start && cell.is_some() && phonetic_depth == 0 => {
                    text_target = TextTarget::Inline;
                }
                _ => {}
            },
            Event::Text(ref t) if text_target != TextTarget::None => {
                let text = t.unescape()?;
                if let Some(builder) = cell.as_mut() {
                    match text_target {
                        TextTarget::Value => {
                            builder.value.get_or_insert_with(String::new).push_str(&text);
                        }
                        TextTarget::Inline => builder.inline.push_str(&text),
                        TextTarget::None => {}
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => text_target = TextTarget::None,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"c" => {
                    if let Some(builder) = cell.take() {
                        push_cell(&mut sheet, builder.finish(shared_strings));
                    }
                    text_target = TextTarget::None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!(
        part,
        cells = sheet.cells.len(),
        max_row = sheet.max_row,
        max_col = sheet.max_col,
        zoom = sheet.zoom,
        "worksheet parsed"
    );
    Ok(sheet)
}

fn read_cell_start(e: &BytesStart, current_row: u32, next_col: u32) -> CellBuilder {
    let mut builder = CellBuilder {
        row: current_row.max(1),
        col: next_col.max(1),
        kind: CellTypeTag::Number,
        style_index: None,
        value: None,
        inline: String::new(),
    };
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                if let Some((col, row)) = parse_cell_ref(&attr.value) {
                    builder.col = col;
                    builder.row = row;
                }
            }
            b"t" => builder.kind = parse_cell_type_tag(&attr.value),
            b"s" => {
                builder.style_index = std::str::from_utf8(&attr.value)
                    .ok()
                    .and_then(|s| s.trim().parse().ok());
            }
            _ => {}
        }
    }
    builder
}

fn push_cell(sheet: &mut Worksheet, cell: RawCell) {
    sheet.max_row = sheet.max_row.max(cell.row);
    sheet.max_col = sheet.max_col.max(cell.col);
    sheet.cells.push(cell);
}

fn read_column(e: &BytesStart, part: &str, sheet: &mut Worksheet) {
    let (Some(min), Some(width)) = (attr_u32(e, b"min"), attr_f64(e, b"width")) else {
        return;
    };
    let limit = Axis::Column.max_index();
    if min > limit {
        set_dimension(sheet, part, Axis::Column, min, width);
        return;
    }
    let max = attr_u32(e, b"max").unwrap_or(min).min(limit);
    for col in min.max(1)..=max {
        if !set_dimension(sheet, part, Axis::Column, col, width) {
            // one diagnostic per <col> range
            break;
        }
    }
}

fn set_dimension(sheet: &mut Worksheet, part: &str, axis: Axis, index: u32, size: f64) -> bool {
    let table = match axis {
        Axis::Column => &mut sheet.columns,
        Axis::Row => &mut sheet.rows,
    };
    match table.set(index, size) {
        Ok(()) => true,
        Err(err) => {
            warn!(part, index, size, error = %err, "dimension entry rejected");
            sheet
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::Dimension, part, err));
            false
        }
    }
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

    fn parse(xml: &str, shared: &[String]) -> Worksheet {
        parse_worksheet(
            xml.as_bytes(),
            "xl/worksheets/sheet1.xml",
            shared,
            &UnitMetrics::default(),
        )
        .unwrap()
    }

    #[test]
    fn shared_strings_skip_phonetic_runs() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3">
            <si><t>Hello</t></si>
            <si><r><t>Rich </t></r><r><rPr><b/></rPr><t>text</t></r></si>
            <si><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>
            <si/>
            <si><t xml:space="preserve"> a &amp; b </t></si>
        </sst>"#;
        let strings = parse_shared_strings(xml.as_bytes()).unwrap();
        assert_eq!(strings, vec!["Hello", "Rich text", "漢字", "", " a & b "]);
    }

    #[test]
    fn reads_cell_values_by_type() {
        let shared = vec!["zero".to_string(), "one".to_string()];
        let sheet = parse(
            r#"<worksheet><sheetData>
                <row r="1">
                    <c r="A1" t="s" s="2"><v>1</v></c>
                    <c r="B1"><v>42.5</v></c>
                    <c r="C1" t="b"><v>1</v></c>
                    <c r="D1" t="b"><v>0</v></c>
                </row>
                <row r="3">
                    <c r="B3" t="inlineStr"><is><t>inline &lt;x&gt;</t></is></c>
                    <c r="C3" t="str"><f>A1&amp;"!"</f><v>one!</v></c>
                    <c r="D3" t="e"><v>#DIV/0!</v></c>
                    <c r="E3" s="4"/>
                    <c r="F3" t="s"><v>99</v></c>
                </row>
            </sheetData></worksheet>"#,
            &shared,
        );

        let values: Vec<(u32, u32, &str)> = sheet
            .cells
            .iter()
            .map(|c| (c.row, c.col, c.value.as_str()))
            .collect();
        assert_eq!(
            values,
            vec![
                (1, 1, "one"),
                (1, 2, "42.5"),
                (1, 3, "TRUE"),
                (1, 4, "FALSE"),
                (3, 2, "inline <x>"),
                (3, 3, "one!"),
                (3, 4, "#DIV/0!"),
                (3, 5, ""),
                (3, 6, ""),
            ]
        );
        assert_eq!(sheet.cells[0].style_index, Some(2));
        assert_eq!(sheet.cells[7].style_index, Some(4));
        assert_eq!(sheet.max_row, 3);
        assert_eq!(sheet.max_col, 6);
    }

    #[test]
    fn cells_without_reference_follow_their_neighbour() {
        let sheet = parse(
            r#"<worksheet><sheetData><row r="2"><c r="B2"><v>1</v></c><c><v>2</v></c></row></sheetData></worksheet>"#,
            &[],
        );
        assert_eq!(sheet.cells[1].row, 2);
        assert_eq!(sheet.cells[1].col, 3);
    }

    #[test]
    fn reads_dimensions_and_zoom() {
        let sheet = parse(
            r#"<worksheet>
                <sheetViews><sheetView zoomScale="150" workbookViewId="0"/></sheetViews>
                <cols><col min="2" max="3" width="20" customWidth="1"/></cols>
                <sheetData><row r="2" ht="30" customHeight="1"><c r="A2"><v>x</v></c></row></sheetData>
            </worksheet>"#,
            &[],
        );
        assert_eq!(sheet.zoom, 150.0);
        assert_eq!(sheet.columns.get(1), 8.43);
        assert_eq!(sheet.columns.get(2), 20.0);
        assert_eq!(sheet.columns.get(3), 20.0);
        assert_eq!(sheet.columns.get(4), 8.43);
        assert_eq!(sheet.rows.get(2), 30.0);
        assert_eq!(sheet.rows.get(1), 15.0);
        assert!(sheet.diagnostics.is_empty());
    }

    #[test]
    fn missing_zoom_defaults_to_100() {
        let sheet = parse(
            r#"<worksheet><sheetViews><sheetView zoomScale="abc"/></sheetViews><sheetData/></worksheet>"#,
            &[],
        );
        assert_eq!(sheet.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn negative_dimensions_are_dropped_with_a_diagnostic() {
        let sheet = parse(
            r#"<worksheet>
                <cols><col min="1" max="3" width="-4"/></cols>
                <sheetData><row r="1" ht="-2"/></sheetData>
            </worksheet>"#,
            &[],
        );
        assert_eq!(sheet.columns.get(1), 8.43);
        assert_eq!(sheet.rows.get(1), 15.0);
        assert_eq!(sheet.diagnostics.len(), 2);
        assert!(sheet
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::Dimension));
    }

    #[test]
    fn indices_past_the_sheet_edge_are_rejected() {
        let sheet = parse(
            r#"<worksheet>
                <cols><col min="20000" max="20001" width="4"/></cols>
                <sheetData>
                    <row r="2"><c r="A2"><v>1</v></c></row>
                    <row r="4294967295" ht="10" customHeight="1"/>
                    <row ht="12"/>
                </sheetData>
            </worksheet>"#,
            &[],
        );
        assert_eq!(sheet.max_row, 2);
        assert_eq!(sheet.rows.overrides().count(), 0);
        assert_eq!(sheet.columns.overrides().count(), 0);
        // the column range, the huge row and the row after it
        assert_eq!(sheet.diagnostics.len(), 3);
    }

    #[test]
    fn malformed_sheet_is_an_error() {
        let result = parse_worksheet(
            b"<worksheet><sheetData><row></sheetData>",
            "xl/worksheets/sheet1.xml",
            &[],
            &UnitMetrics::default(),
        );
        assert!(result.is_err());
    }
}
