//! Test fixtures for generating XLSX packages in memory.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Hello", Some(StyleBuilder::new().bold()))
//!             .col_width(1, 1, 20.0),
//!     )
//!     .build();
//!
//! let conversion = xlstatic::convert_bytes(&xlsx, &Default::default()).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, Luma, LumaA, Rgb, RgbImage, Rgba,
    RgbaImage,
};
use zip::write::FileOptions;
use zip::ZipWriter;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XDR_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

// ============================================================================
// Style Builder
// ============================================================================

/// A border side definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub style: String,
    pub color: Option<String>,
}

impl BorderSide {
    #[must_use]
    pub fn new(style: &str) -> Self {
        Self {
            style: style.to_string(),
            color: None,
        }
    }

    #[must_use]
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

/// Builder for creating cell styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,

    pub bg_color: Option<String>,
    pub pattern_type: Option<String>,

    pub border_top: Option<BorderSide>,
    pub border_right: Option<BorderSide>,
    pub border_bottom: Option<BorderSide>,
    pub border_left: Option<BorderSide>,

    pub align_horizontal: Option<String>,
    pub align_vertical: Option<String>,
    pub wrap_text: bool,
}

impl StyleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn font_name(mut self, name: &str) -> Self {
        self.font_name = Some(name.to_string());
        self
    }

    /// Font size in points.
    #[must_use]
    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Font color as ARGB (e.g. "FFFF0000").
    #[must_use]
    pub fn font_color(mut self, color: &str) -> Self {
        self.font_color = Some(color.to_string());
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Solid fill with the given ARGB color.
    #[must_use]
    pub fn bg_color(mut self, color: &str) -> Self {
        self.bg_color = Some(color.to_string());
        if self.pattern_type.is_none() {
            self.pattern_type = Some("solid".to_string());
        }
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern_type: &str) -> Self {
        self.pattern_type = Some(pattern_type.to_string());
        self
    }

    #[must_use]
    pub fn border_all(self, style: &str, color: Option<&str>) -> Self {
        let mut side = BorderSide::new(style);
        if let Some(c) = color {
            side = side.color(c);
        }
        self.border_top(side.clone())
            .border_right(side.clone())
            .border_bottom(side.clone())
            .border_left(side)
    }

    #[must_use]
    pub fn border_top(mut self, side: BorderSide) -> Self {
        self.border_top = Some(side);
        self
    }

    #[must_use]
    pub fn border_right(mut self, side: BorderSide) -> Self {
        self.border_right = Some(side);
        self
    }

    #[must_use]
    pub fn border_bottom(mut self, side: BorderSide) -> Self {
        self.border_bottom = Some(side);
        self
    }

    #[must_use]
    pub fn border_left(mut self, side: BorderSide) -> Self {
        self.border_left = Some(side);
        self
    }

    #[must_use]
    pub fn align_horizontal(mut self, align: &str) -> Self {
        self.align_horizontal = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn align_vertical(mut self, align: &str) -> Self {
        self.align_vertical = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn wrap_text(mut self) -> Self {
        self.wrap_text = true;
        self
    }

    fn has_font(&self) -> bool {
        self.font_name.is_some()
            || self.font_size.is_some()
            || self.font_color.is_some()
            || self.bold
            || self.italic
            || self.underline
    }

    fn has_border(&self) -> bool {
        self.border_top.is_some()
            || self.border_right.is_some()
            || self.border_bottom.is_some()
            || self.border_left.is_some()
    }

    fn has_alignment(&self) -> bool {
        self.align_horizontal.is_some() || self.align_vertical.is_some() || self.wrap_text
    }
}

// ============================================================================
// Cell Value
// ============================================================================

/// A cell value as it is stored in the worksheet.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Shared string.
    String(String),
    Number(f64),
    Boolean(bool),
    /// Error value (e.g. "#DIV/0!").
    Error(String),
    InlineString(String),
    /// Formula with a cached string result.
    FormulaString { formula: String, cached: String },
    /// Style only.
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Drawings
// ============================================================================

/// A 0-based cell marker as written in drawing parts, with EMU offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub col: u32,
    pub row: u32,
    pub col_off: i64,
    pub row_off: i64,
}

impl Marker {
    #[must_use]
    pub fn at(col: u32, row: u32) -> Self {
        Self {
            col,
            row,
            col_off: 0,
            row_off: 0,
        }
    }

    #[must_use]
    pub fn offset(mut self, col_off: i64, row_off: i64) -> Self {
        self.col_off = col_off;
        self.row_off = row_off;
        self
    }
}

/// Anchor geometry of a picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PictureAnchor {
    TwoCell { from: Marker, to: Marker },
    OneCell { from: Marker, cx: i64, cy: i64 },
    Absolute { x: i64, y: i64, cx: i64, cy: i64 },
}

/// A picture placed on a sheet, referring to a media file by name.
#[derive(Debug, Clone)]
pub struct Picture {
    pub anchor: PictureAnchor,
    /// File name under `xl/media/`
    pub media: String,
}

// ============================================================================
// Sheet Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
    pub style: Option<StyleBuilder>,
}

#[derive(Debug, Clone)]
pub struct ColumnWidth {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

#[derive(Debug, Clone)]
pub struct RowHeight {
    pub row: u32,
    pub height: f64,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub cells: Vec<CellEntry>,
    pub col_widths: Vec<ColumnWidth>,
    pub row_heights: Vec<RowHeight>,
    pub zoom: Option<u32>,
    pub pictures: Vec<Picture>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            style,
        });
        self
    }

    #[must_use]
    pub fn inline_cell(self, cell_ref: &str, text: &str) -> Self {
        self.cell(cell_ref, CellValue::InlineString(text.to_string()), None)
    }

    /// Width in character units for columns `min..=max` (1-based).
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push(ColumnWidth { min, max, width });
        self
    }

    /// Height in points for a 1-based row.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.push(RowHeight { row, height });
        self
    }

    /// Zoom percentage for the first sheet view.
    #[must_use]
    pub fn zoom(mut self, percent: u32) -> Self {
        self.zoom = Some(percent);
        self
    }

    #[must_use]
    pub fn picture(mut self, anchor: PictureAnchor, media: &str) -> Self {
        self.pictures.push(Picture {
            anchor,
            media: media.to_string(),
        });
        self
    }
}

// ============================================================================
// XLSX Builder
// ============================================================================

/// Which styles part to write.
#[derive(Debug, Clone, Default)]
enum StylesPart {
    #[default]
    Generated,
    Raw(String),
    Missing,
}

/// Builder for a complete package.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    media: Vec<(String, Vec<u8>)>,
    styles: StylesPart,
    /// Parts written verbatim, replacing generated parts of the same name
    overrides: Vec<(String, Vec<u8>)>,
    removed: Vec<String>,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Add a media file as `xl/media/{name}`.
    #[must_use]
    pub fn media(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.media.push((name.to_string(), bytes));
        self
    }

    /// Use a hand-written `xl/styles.xml`.
    #[must_use]
    pub fn styles_xml(mut self, xml: &str) -> Self {
        self.styles = StylesPart::Raw(xml.to_string());
        self
    }

    /// Leave `xl/styles.xml` out of the package.
    #[must_use]
    pub fn without_styles(mut self) -> Self {
        self.styles = StylesPart::Missing;
        self
    }

    /// Write `path` with `bytes`, replacing any generated part.
    #[must_use]
    pub fn part(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.overrides.push((path.to_string(), bytes.into()));
        self
    }

    /// Drop a generated part.
    #[must_use]
    pub fn without_part(mut self, path: &str) -> Self {
        self.removed.push(path.to_string());
        self
    }

    /// Build the package as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut styles = StylesCollector::new();
        let mut shared_strings: Vec<String> = Vec::new();

        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let Some(ref style) = cell.style {
                    styles.add_style(style);
                }
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut parts: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        parts.insert(
            "[Content_Types].xml".into(),
            generate_content_types(&self.sheets).into_bytes(),
        );
        parts.insert("_rels/.rels".into(), generate_rels().into_bytes());
        parts.insert(
            "xl/_rels/workbook.xml.rels".into(),
            generate_workbook_rels(self.sheets.len()).into_bytes(),
        );
        parts.insert(
            "xl/workbook.xml".into(),
            generate_workbook(&self.sheets).into_bytes(),
        );
        match self.styles {
            StylesPart::Generated => {
                parts.insert(
                    "xl/styles.xml".into(),
                    styles.generate_styles_xml().into_bytes(),
                );
            }
            StylesPart::Raw(ref xml) => {
                parts.insert("xl/styles.xml".into(), xml.clone().into_bytes());
            }
            StylesPart::Missing => {}
        }
        if !shared_strings.is_empty() {
            parts.insert(
                "xl/sharedStrings.xml".into(),
                generate_shared_strings(&shared_strings).into_bytes(),
            );
        }

        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            parts.insert(
                format!("xl/worksheets/sheet{n}.xml"),
                generate_sheet_xml(sheet, &shared_strings, &styles).into_bytes(),
            );
            if !sheet.pictures.is_empty() {
                parts.insert(
                    format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                    generate_sheet_rels(n).into_bytes(),
                );
                parts.insert(
                    format!("xl/drawings/drawing{n}.xml"),
                    generate_drawing(&sheet.pictures).into_bytes(),
                );
                parts.insert(
                    format!("xl/drawings/_rels/drawing{n}.xml.rels"),
                    generate_drawing_rels(&sheet.pictures).into_bytes(),
                );
            }
        }

        for (name, bytes) in self.media {
            parts.insert(format!("xl/media/{name}"), bytes);
        }
        for (path, bytes) in self.overrides {
            parts.insert(path, bytes);
        }
        for path in &self.removed {
            parts.remove(path);
        }

        write_zip(parts)
    }
}

/// Zip the given parts in order.
#[must_use]
pub fn write_zip(parts: BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (path, bytes) in parts {
        zip.start_file(path, options).expect("Failed to start entry");
        zip.write_all(&bytes).expect("Failed to write entry");
    }

    let cursor = zip.finish().expect("Failed to finish ZIP");
    cursor.into_inner()
}

// ============================================================================
// Styles Collector
// ============================================================================

/// Assigns each distinct style one font, fill, border and cell-format
/// record; record 0 of every table is the default.
#[derive(Debug, Default)]
struct StylesCollector {
    styles: Vec<StyleBuilder>,
}

impl StylesCollector {
    fn new() -> Self {
        Self::default()
    }

    fn add_style(&mut self, style: &StyleBuilder) {
        if !self.styles.contains(style) {
            self.styles.push(style.clone());
        }
    }

    /// Cell-format index for a style (0 is the default format).
    fn xf_index(&self, style: &StyleBuilder) -> u32 {
        self.styles
            .iter()
            .position(|s| s == style)
            .map_or(0, |i| i as u32 + 1)
    }

    fn generate_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(&format!(r#"<styleSheet xmlns="{MAIN_NS}">"#));

        // Fonts
        xml.push_str(&format!(r#"<fonts count="{}">"#, self.styles.len() + 1));
        xml.push_str(r#"<font><sz val="11"/><name val="Calibri"/></font>"#);
        for style in &self.styles {
            xml.push_str("<font>");
            if style.bold {
                xml.push_str("<b/>");
            }
            if style.italic {
                xml.push_str("<i/>");
            }
            if style.underline {
                xml.push_str("<u/>");
            }
            xml.push_str(&format!(r#"<sz val="{}"/>"#, style.font_size.unwrap_or(11.0)));
            if let Some(ref color) = style.font_color {
                xml.push_str(&format!(r#"<color rgb="{color}"/>"#));
            }
            xml.push_str(&format!(
                r#"<name val="{}"/>"#,
                escape_xml(style.font_name.as_deref().unwrap_or("Calibri"))
            ));
            xml.push_str("</font>");
        }
        xml.push_str("</fonts>");

        // Fills: 0 none, 1 gray125, then one per style
        xml.push_str(&format!(r#"<fills count="{}">"#, self.styles.len() + 2));
        xml.push_str(r#"<fill><patternFill patternType="none"/></fill>"#);
        xml.push_str(r#"<fill><patternFill patternType="gray125"/></fill>"#);
        for style in &self.styles {
            let pattern = style.pattern_type.as_deref().unwrap_or("none");
            xml.push_str(&format!(r#"<fill><patternFill patternType="{pattern}">"#));
            if let Some(ref color) = style.bg_color {
                xml.push_str(&format!(r#"<fgColor rgb="{color}"/>"#));
            }
            xml.push_str("</patternFill></fill>");
        }
        xml.push_str("</fills>");

        // Borders
        xml.push_str(&format!(r#"<borders count="{}">"#, self.styles.len() + 1));
        xml.push_str("<border><left/><right/><top/><bottom/><diagonal/></border>");
        for style in &self.styles {
            xml.push_str("<border>");
            push_border_side(&mut xml, "left", style.border_left.as_ref());
            push_border_side(&mut xml, "right", style.border_right.as_ref());
            push_border_side(&mut xml, "top", style.border_top.as_ref());
            push_border_side(&mut xml, "bottom", style.border_bottom.as_ref());
            xml.push_str("<diagonal/></border>");
        }
        xml.push_str("</borders>");

        // Cell formats
        xml.push_str(&format!(r#"<cellXfs count="{}">"#, self.styles.len() + 1));
        xml.push_str(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#);
        for (i, style) in self.styles.iter().enumerate() {
            let id = i + 1;
            let font_id = if style.has_font() { id } else { 0 };
            let fill_id = if style.pattern_type.is_some() { id + 1 } else { 0 };
            let border_id = if style.has_border() { id } else { 0 };
            xml.push_str(&format!(
                r#"<xf numFmtId="0" fontId="{font_id}" fillId="{fill_id}" borderId="{border_id}" xfId="0""#
            ));
            if style.has_alignment() {
                xml.push_str(r#" applyAlignment="1"><alignment"#);
                if let Some(ref h) = style.align_horizontal {
                    xml.push_str(&format!(r#" horizontal="{h}""#));
                }
                if let Some(ref v) = style.align_vertical {
                    xml.push_str(&format!(r#" vertical="{v}""#));
                }
                if style.wrap_text {
                    xml.push_str(r#" wrapText="1""#);
                }
                xml.push_str("/></xf>");
            } else {
                xml.push_str("/>");
            }
        }
        xml.push_str("</cellXfs>");

        xml.push_str("</styleSheet>");
        xml
    }
}

fn push_border_side(xml: &mut String, name: &str, side: Option<&BorderSide>) {
    match side {
        Some(side) => {
            xml.push_str(&format!(r#"<{name} style="{}">"#, side.style));
            if let Some(ref color) = side.color {
                xml.push_str(&format!(r#"<color rgb="{color}"/>"#));
            }
            xml.push_str(&format!("</{name}>"));
        }
        None => xml.push_str(&format!("<{name}/>")),
    }
}

// ============================================================================
// Part generators
// ============================================================================

fn generate_content_types(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);

    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        if !sheet.pictures.is_empty() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/drawings/drawing{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#
            ));
        }
    }

    xml.push_str("</Types>");
    xml
}

fn generate_rels() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<Relationships xmlns="{PKG_REL_NS}">"#));

    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{REL_NS}/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));

    xml.push_str("</Relationships>");
    xml
}

fn generate_workbook(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
    ));
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="{MAIN_NS}" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    ));
    for s in strings {
        xml.push_str(&format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(s)
        ));
    }
    xml.push_str("</sst>");
    xml
}

fn generate_sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &[String],
    styles: &StylesCollector,
) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">"#));

    if let Some(zoom) = sheet.zoom {
        xml.push_str(&format!(
            r#"<sheetViews><sheetView zoomScale="{zoom}" workbookViewId="0"/></sheetViews>"#
        ));
    }

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for col in &sheet.col_widths {
            xml.push_str(&format!(
                r#"<col min="{}" max="{}" width="{}" customWidth="1"/>"#,
                col.min, col.max, col.width
            ));
        }
        xml.push_str("</cols>");
    }

    // Rows: every row with a cell or a height override
    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = BTreeMap::new();
    for cell in &sheet.cells {
        rows.entry(row_of(&cell.cell_ref)).or_default().push(cell);
    }
    for height in &sheet.row_heights {
        rows.entry(height.row).or_default();
    }

    xml.push_str("<sheetData>");
    for (row, cells) in &rows {
        xml.push_str(&format!(r#"<row r="{row}""#));
        if let Some(h) = sheet.row_heights.iter().find(|h| h.row == *row) {
            xml.push_str(&format!(r#" ht="{}" customHeight="1""#, h.height));
        }
        xml.push('>');
        for cell in cells {
            push_cell(&mut xml, cell, shared_strings, styles);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.pictures.is_empty() {
        xml.push_str(r#"<drawing r:id="rId1"/>"#);
    }

    xml.push_str("</worksheet>");
    xml
}

fn push_cell(xml: &mut String, cell: &CellEntry, shared_strings: &[String], styles: &StylesCollector) {
    let style_attr = cell
        .style
        .as_ref()
        .map(|s| format!(r#" s="{}""#, styles.xf_index(s)))
        .unwrap_or_default();
    let r = &cell.cell_ref;

    match &cell.value {
        CellValue::String(s) => {
            let idx = shared_strings.iter().position(|x| x == s).unwrap_or(0);
            xml.push_str(&format!(r#"<c r="{r}"{style_attr} t="s"><v>{idx}</v></c>"#));
        }
        CellValue::Number(n) => {
            xml.push_str(&format!(r#"<c r="{r}"{style_attr}><v>{n}</v></c>"#));
        }
        CellValue::Boolean(b) => {
            let v = u8::from(*b);
            xml.push_str(&format!(r#"<c r="{r}"{style_attr} t="b"><v>{v}</v></c>"#));
        }
        CellValue::Error(e) => {
            xml.push_str(&format!(
                r#"<c r="{r}"{style_attr} t="e"><v>{}</v></c>"#,
                escape_xml(e)
            ));
        }
        CellValue::InlineString(s) => {
            xml.push_str(&format!(
                r#"<c r="{r}"{style_attr} t="inlineStr"><is><t>{}</t></is></c>"#,
                escape_xml(s)
            ));
        }
        CellValue::FormulaString { formula, cached } => {
            xml.push_str(&format!(
                r#"<c r="{r}"{style_attr} t="str"><f>{}</f><v>{}</v></c>"#,
                escape_xml(formula),
                escape_xml(cached)
            ));
        }
        CellValue::Empty => {
            xml.push_str(&format!(r#"<c r="{r}"{style_attr}/>"#));
        }
    }
}

fn generate_sheet_rels(n: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/drawing" Target="../drawings/drawing{n}.xml"/></Relationships>"#
    )
}

fn generate_drawing_rels(pictures: &[Picture]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<Relationships xmlns="{PKG_REL_NS}">"#));
    for (i, picture) in pictures.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_NS}/image" Target="../media/{}"/>"#,
            i + 1,
            picture.media
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Drawing part with one anchor per picture; picture `i` embeds `rId{i+1}`.
#[must_use]
pub fn generate_drawing(pictures: &[Picture]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<xdr:wsDr xmlns:xdr="{XDR_NS}" xmlns:a="{A_NS}" xmlns:r="{REL_NS}">"#
    ));
    for (i, picture) in pictures.iter().enumerate() {
        let pic = pic_xml(i + 1);
        match picture.anchor {
            PictureAnchor::TwoCell { from, to } => {
                xml.push_str(r#"<xdr:twoCellAnchor editAs="oneCell">"#);
                xml.push_str(&marker_xml("from", from));
                xml.push_str(&marker_xml("to", to));
                xml.push_str(&pic);
                xml.push_str("<xdr:clientData/></xdr:twoCellAnchor>");
            }
            PictureAnchor::OneCell { from, cx, cy } => {
                xml.push_str("<xdr:oneCellAnchor>");
                xml.push_str(&marker_xml("from", from));
                xml.push_str(&format!(r#"<xdr:ext cx="{cx}" cy="{cy}"/>"#));
                xml.push_str(&pic);
                xml.push_str("<xdr:clientData/></xdr:oneCellAnchor>");
            }
            PictureAnchor::Absolute { x, y, cx, cy } => {
                xml.push_str("<xdr:absoluteAnchor>");
                xml.push_str(&format!(r#"<xdr:pos x="{x}" y="{y}"/>"#));
                xml.push_str(&format!(r#"<xdr:ext cx="{cx}" cy="{cy}"/>"#));
                xml.push_str(&pic);
                xml.push_str("<xdr:clientData/></xdr:absoluteAnchor>");
            }
        }
    }
    xml.push_str("</xdr:wsDr>");
    xml
}

fn marker_xml(name: &str, m: Marker) -> String {
    format!(
        "<xdr:{name}><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:{name}>",
        m.col, m.col_off, m.row, m.row_off
    )
}

/// Picture element; its shape transform carries an `a:ext` that must not be
/// mistaken for the anchor extent.
fn pic_xml(rel: usize) -> String {
    format!(
        r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{rel}" name="Picture {rel}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId{rel}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:xfrm><a:off x="1" y="1"/><a:ext cx="999999" cy="999999"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic>"#
    )
}

// ============================================================================
// Helpers
// ============================================================================

fn row_of(cell_ref: &str) -> u32 {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .expect("cell reference must end in a row number")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Opaque PNG of the given size.
#[must_use]
pub fn png_rgb(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Half-transparent PNG of the given size.
#[must_use]
pub fn png_rgba(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 96]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Grayscale PNG with no alpha channel.
#[must_use]
pub fn png_gray(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, Luma([90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Grayscale PNG with a half-transparent alpha channel.
#[must_use]
pub fn png_gray_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = GrayAlphaImage::from_pixel(width, height, LumaA([90, 128]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLumaA8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Palette PNG whose second entry is fully transparent (a `tRNS` chunk).
#[must_use]
pub fn png_indexed_transparent(width: u32, height: u32) -> Vec<u8> {
    let indices: Vec<u8> = (0..width * height).map(|i| (i % 2) as u8).collect();
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(vec![255, 0, 0, 0, 0, 255]);
        encoder.set_trns(vec![255, 0]);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&indices).unwrap();
    }
    out
}

/// Package with a single inline cell.
#[must_use]
pub fn xlsx_with_text(text: &str) -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(SheetBuilder::new("Sheet1").cell("A1", text, None))
        .build()
}

/// Decode the payload of a base64 `data:` URI.
#[must_use]
pub fn decode_data_uri(uri: &str) -> (String, Vec<u8>) {
    use base64::{engine::general_purpose::STANDARD, Engine};
    let rest = uri.strip_prefix("data:").expect("data URI");
    let (mime, payload) = rest.split_once(";base64,").expect("base64 data URI");
    (mime.to_string(), STANDARD.decode(payload).expect("valid base64"))
}
