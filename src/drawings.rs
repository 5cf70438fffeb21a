//! Drawing parsing: picture anchors from `xl/drawings/drawingN.xml` and their
//! pixel-space placement.
//!
//! Drawings are positioned using anchors:
//! - `oneCellAnchor`: anchored at one cell, sized by the direct `ext` child
//! - `twoCellAnchor`: stretched between a `from` and a `to` cell
//!
//! `absoluteAnchor` carries neither geometry and is skipped, as is every
//! anchor without a resolvable picture.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::error::{Result, XlstaticError};
use crate::layout::{Axis, Geometry};
use crate::package::Package;
use crate::parser::relationships::{load_relationships, rels_path_for, Relationships};
use crate::types::{AnchorPoint, Bounds, DrawingAnchor, ImageAnchor};
use crate::xml_helpers::{attr_i64, attr_string_local};

/// Picture anchors found in one drawing part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawingScan {
    pub anchors: Vec<ImageAnchor>,
    /// Anchors that were not usable pictures
    pub skipped: usize,
}

/// Drawing parts that belong to a worksheet.
///
/// Every drawing the worksheet's manifest names is returned, present or not,
/// so a missing part is reported when it is loaded. When the worksheet has
/// no relationship manifest every `xl/drawings/*.xml` part in the package is
/// used.
///
/// # Errors
/// Returns an error if the worksheet's manifest exists but is malformed.
pub fn drawing_parts_for_sheet(package: &Package, sheet_path: &str) -> Result<Vec<String>> {
    match load_relationships(package, sheet_path)? {
        Some(rels) => Ok(rels
            .targets_of_kind("drawing")
            .map(ToString::to_string)
            .collect()),
        None => Ok(package
            .part_names()
            .filter(|name| is_drawing_part(name))
            .map(ToString::to_string)
            .collect()),
    }
}

fn is_drawing_part(name: &str) -> bool {
    name.strip_prefix("xl/drawings/")
        .is_some_and(|rest| !rest.contains('/') && rest.ends_with(".xml"))
}

/// Load a drawing part together with its relationship manifest and collect
/// its picture anchors.
///
/// # Errors
/// Returns [`XlstaticError::Drawing`] if the part or its manifest is missing,
/// or an XML error if either is malformed.
pub fn load_drawing(package: &Package, part: &str) -> Result<DrawingScan> {
    let data = package
        .part(part)
        .ok_or_else(|| XlstaticError::drawing(part, "part is missing"))?;
    let rels = load_relationships(package, part)?.ok_or_else(|| {
        XlstaticError::drawing(part, format!("{} is missing", rels_path_for(part)))
    })?;
    parse_drawing(data, part, &rels)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorKind {
    OneCell,
    TwoCell,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointField {
    Col,
    Row,
    ColOff,
    RowOff,
}

#[derive(Debug, Default)]
struct PointBuilder {
    col: Option<u32>,
    row: Option<u32>,
    col_off: Option<i64>,
    row_off: Option<i64>,
}

impl PointBuilder {
    fn set(&mut self, field: PointField, text: &str) {
        let text = text.trim();
        match field {
            PointField::Col => self.col = text.parse().ok(),
            PointField::Row => self.row = text.parse().ok(),
            PointField::ColOff => self.col_off = text.parse().ok(),
            PointField::RowOff => self.row_off = text.parse().ok(),
        }
    }

    /// Converts the document's 0-based cell to 1-based; offsets default to 0.
    fn build(&self) -> Option<AnchorPoint> {
        Some(AnchorPoint {
            col: self.col?.checked_add(1)?,
            row: self.row?.checked_add(1)?,
            col_off: self.col_off.unwrap_or(0),
            row_off: self.row_off.unwrap_or(0),
        })
    }
}

#[derive(Debug)]
struct AnchorBuilder {
    kind: AnchorKind,
    /// Element depth of the anchor itself
    depth: usize,
    from: Option<PointBuilder>,
    to: Option<PointBuilder>,
    extent: Option<(i64, i64)>,
    embed_id: Option<String>,
}

impl AnchorBuilder {
    fn new(kind: AnchorKind, depth: usize) -> Self {
        Self {
            kind,
            depth,
            from: None,
            to: None,
            extent: None,
            embed_id: None,
        }
    }

    fn build(self, rels: &Relationships) -> Option<ImageAnchor> {
        if self.kind == AnchorKind::Absolute {
            return None;
        }
        let from = self.from.as_ref()?.build()?;
        let anchor = match self.to.as_ref() {
            Some(to) => DrawingAnchor::CellSpan {
                from,
                to: to.build()?,
            },
            None => {
                let (cx, cy) = self.extent?;
                DrawingAnchor::FixedExtent { from, cx, cy }
            }
        };
        let embed_id = self.embed_id?;
        let media_path = rels.target(&embed_id)?.to_string();
        Some(ImageAnchor {
            anchor,
            embed_id,
            media_path,
        })
    }
}

/// Which point of the current anchor is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenPoint {
    From,
    To,
}

/// Parse one drawing part, resolving picture embeds through `rels`.
///
/// # Errors
/// Returns an error if the part is not well-formed XML.
pub fn parse_drawing(data: &[u8], part: &str, rels: &Relationships) -> Result<DrawingScan> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut scan = DrawingScan::default();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut current: Option<AnchorBuilder> = None;
    let mut open_point: Option<OpenPoint> = None;
    let mut open_field: Option<PointField> = None;

    loop {
        let event = xml.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                start_element(e, depth, &mut current, &mut open_point, &mut open_field);
            }
            Event::Empty(ref e) => {
                start_element(e, depth + 1, &mut current, &mut open_point, &mut open_field);
                open_field = None;
                // a self-closing anchor has nothing to place
                if current.as_ref().is_some_and(|a| a.depth == depth + 1) {
                    current = None;
                    scan.skipped += 1;
                }
                if matches!(e.local_name().as_ref(), b"from" | b"to") {
                    open_point = None;
                }
            }
            Event::Text(ref t) => {
                if let (Some(anchor), Some(point), Some(field)) =
                    (current.as_mut(), open_point, open_field)
                {
                    let slot = match point {
                        OpenPoint::From => anchor.from.as_mut(),
                        OpenPoint::To => anchor.to.as_mut(),
                    };
                    if let Some(builder) = slot {
                        builder.set(field, &t.unescape()?);
                    }
                }
            }
            Event::End(ref e) => {
                let closes_anchor = current.as_ref().is_some_and(|a| a.depth == depth);
                if closes_anchor {
                    if let Some(anchor) = current.take() {
                        match anchor.build(rels) {
                            Some(image) => {
                                trace!(part, media = %image.media_path, "picture anchor");
                                scan.anchors.push(image);
                            }
                            None => scan.skipped += 1,
                        }
                    }
                } else {
                    match e.local_name().as_ref() {
                        b"from" | b"to" => open_point = None,
                        b"col" | b"row" | b"colOff" | b"rowOff" => open_field = None,
                        _ => {}
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!(
        part,
        pictures = scan.anchors.len(),
        skipped = scan.skipped,
        "drawing parsed"
    );
    Ok(scan)
}

fn start_element(
    e: &BytesStart,
    depth: usize,
    current: &mut Option<AnchorBuilder>,
    open_point: &mut Option<OpenPoint>,
    open_field: &mut Option<PointField>,
) {
    let name = e.local_name();
    let name = name.as_ref();

    let Some(anchor) = current.as_mut() else {
        let kind = match name {
            b"oneCellAnchor" => AnchorKind::OneCell,
            b"twoCellAnchor" => AnchorKind::TwoCell,
            b"absoluteAnchor" => AnchorKind::Absolute,
            _ => return,
        };
        *current = Some(AnchorBuilder::new(kind, depth));
        return;
    };

    let child_depth = anchor.depth + 1;
    match name {
        b"from" if depth == child_depth => {
            anchor.from = Some(PointBuilder::default());
            *open_point = Some(OpenPoint::From);
        }
        b"to" if depth == child_depth => {
            anchor.to = Some(PointBuilder::default());
            *open_point = Some(OpenPoint::To);
        }
        b"ext" if depth == child_depth => {
            if let (Some(cx), Some(cy)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                anchor.extent = Some((cx, cy));
            }
        }
        b"col" if open_point.is_some() => *open_field = Some(PointField::Col),
        b"row" if open_point.is_some() => *open_field = Some(PointField::Row),
        b"colOff" if open_point.is_some() => *open_field = Some(PointField::ColOff),
        b"rowOff" if open_point.is_some() => *open_field = Some(PointField::RowOff),
        b"blip" => {
            if anchor.embed_id.is_none() {
                anchor.embed_id = attr_string_local(e, b"embed").filter(|id| !id.is_empty());
            }
        }
        _ => {}
    }
}

/// Pixel rectangle of an anchor on the sheet.
///
/// A cell span takes its size from the difference of the two corner
/// positions; a fixed extent converts `cx`/`cy` from EMUs. Sizes never go
/// negative.
#[must_use]
pub fn anchor_bounds(anchor: &DrawingAnchor, geometry: &Geometry) -> Bounds {
    let from = anchor.from_point();
    let left = geometry.position(from.col, from.col_off, Axis::Column);
    let top = geometry.position(from.row, from.row_off, Axis::Row);

    let (width, height) = match *anchor {
        DrawingAnchor::CellSpan { to, .. } => {
            let right = geometry.position(to.col, to.col_off, Axis::Column);
            let bottom = geometry.position(to.row, to.row_off, Axis::Row);
            (right - left, bottom - top)
        }
        DrawingAnchor::FixedExtent { cx, cy, .. } => {
            let metrics = geometry.metrics();
            (metrics.emu_to_px(cx), metrics.emu_to_px(cy))
        }
    };

    Bounds {
        left,
        top,
        width: width.max(0.0),
        height: height.max(0.0),
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
    use crate::config::UnitMetrics;
    use crate::parser::relationships::parse_relationships;

    const RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
        <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
        <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image2.jpeg"/>
    </Relationships>"#;

    fn rels() -> Relationships {
        parse_relationships(RELS.as_bytes(), "xl/drawings/drawing1.xml").unwrap()
    }

    fn wrap(body: &str) -> String {
        format!(
            r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{body}</xdr:wsDr>"#
        )
    }

    fn pic(embed: &str) -> String {
        format!(
            r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr>
            <xdr:blipFill><a:blip r:embed="{embed}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>
            <xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1" cy="1"/></a:xfrm></xdr:spPr></xdr:pic>"#
        )
    }

    fn point(tag: &str, col: u32, col_off: i64, row: u32, row_off: i64) -> String {
        format!(
            "<xdr:{tag}><xdr:col>{col}</xdr:col><xdr:colOff>{col_off}</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>{row_off}</xdr:rowOff></xdr:{tag}>"
        )
    }

    #[test]
    fn one_cell_anchor_uses_direct_ext() {
        let xml = wrap(&format!(
            r#"<xdr:oneCellAnchor>{}<xdr:ext cx="95250" cy="190500"/>{}<xdr:clientData/></xdr:oneCellAnchor>"#,
            point("from", 1, 9525, 2, 0),
            pic("rId1")
        ));
        let scan = parse_drawing(xml.as_bytes(), "xl/drawings/drawing1.xml", &rels()).unwrap();
        assert_eq!(scan.skipped, 0);
        assert_eq!(scan.anchors.len(), 1);
        let image = &scan.anchors[0];
        assert_eq!(image.media_path, "xl/media/image1.png");
        assert_eq!(image.embed_id, "rId1");
        assert_eq!(
            image.anchor,
            DrawingAnchor::FixedExtent {
                from: AnchorPoint {
                    col: 2,
                    row: 3,
                    col_off: 9525,
                    row_off: 0
                },
                cx: 95_250,
                cy: 190_500,
            }
        );

        let bounds = anchor_bounds(&image.anchor, &Geometry::with_defaults(UnitMetrics::default()));
        assert_eq!(bounds.left, 65.0);
        assert_eq!(bounds.top, 40.0);
        assert_eq!(bounds.width, 10.0);
        assert_eq!(bounds.height, 20.0);
    }

    #[test]
    fn two_cell_anchor_spans_cells() {
        let xml = wrap(&format!(
            r#"<xdr:twoCellAnchor editAs="oneCell">{}{}{}<xdr:clientData/></xdr:twoCellAnchor>"#,
            point("from", 0, 0, 0, 0),
            point("to", 2, 0, 1, 0),
            pic("rId2")
        ));
        let scan = parse_drawing(xml.as_bytes(), "xl/drawings/drawing1.xml", &rels()).unwrap();
        let image = &scan.anchors[0];
        assert!(matches!(image.anchor, DrawingAnchor::CellSpan { .. }));

        let geometry = Geometry::with_defaults(UnitMetrics::default());
        let bounds = anchor_bounds(&image.anchor, &geometry);
        assert_eq!(bounds.left, 0.0);
        assert_eq!(bounds.top, 0.0);
        assert_eq!(
            bounds.width,
            geometry.position(3, 0, Axis::Column) - geometry.position(1, 0, Axis::Column)
        );
        assert_eq!(
            bounds.height,
            geometry.position(2, 0, Axis::Row) - geometry.position(1, 0, Axis::Row)
        );
    }

    #[test]
    fn unusable_anchors_are_skipped() {
        let xml = wrap(&format!(
            r#"<xdr:oneCellAnchor>{from}{pic_missing}<xdr:clientData/></xdr:oneCellAnchor>
            <xdr:oneCellAnchor>{from}<xdr:ext cx="10" cy="10"/>{pic_missing}<xdr:clientData/></xdr:oneCellAnchor>
            <xdr:twoCellAnchor>{from}{to}<xdr:sp><xdr:nvSpPr><xdr:cNvPr id="3" name="Shape"/></xdr:nvSpPr></xdr:sp><xdr:clientData/></xdr:twoCellAnchor>
            <xdr:absoluteAnchor><xdr:pos x="0" y="0"/><xdr:ext cx="10" cy="10"/>{pic_ok}<xdr:clientData/></xdr:absoluteAnchor>
            <xdr:oneCellAnchor><xdr:ext cx="10" cy="10"/>{pic_ok}<xdr:clientData/></xdr:oneCellAnchor>"#,
            from = point("from", 0, 0, 0, 0),
            to = point("to", 1, 0, 1, 0),
            pic_missing = pic("rId9"),
            pic_ok = pic("rId1"),
        ));
        let scan = parse_drawing(xml.as_bytes(), "xl/drawings/drawing1.xml", &rels()).unwrap();
        assert!(scan.anchors.is_empty());
        assert_eq!(scan.skipped, 5);
    }

    #[test]
    fn nested_transform_ext_is_not_the_anchor_extent() {
        // only a:xfrm/a:ext is present, so there is no anchor extent
        let xml = wrap(&format!(
            r#"<xdr:oneCellAnchor>{}{}<xdr:clientData/></xdr:oneCellAnchor>"#,
            point("from", 0, 0, 0, 0),
            pic("rId1")
        ));
        let scan = parse_drawing(xml.as_bytes(), "xl/drawings/drawing1.xml", &rels()).unwrap();
        assert_eq!(scan.skipped, 1);
    }

    #[test]
    fn malformed_drawing_is_an_error() {
        let result = parse_drawing(
            b"<xdr:wsDr><xdr:oneCellAnchor></xdr:wsDr>",
            "xl/drawings/drawing1.xml",
            &rels(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn drawing_part_names() {
        assert!(is_drawing_part("xl/drawings/drawing1.xml"));
        assert!(!is_drawing_part("xl/drawings/_rels/drawing1.xml.rels"));
        assert!(!is_drawing_part("xl/drawings/vmlDrawing1.vml"));
        assert!(!is_drawing_part("xl/media/image1.png"));
    }

    #[test]
    fn reversed_span_has_zero_size() {
        let anchor = DrawingAnchor::CellSpan {
            from: AnchorPoint {
                col: 4,
                row: 4,
                col_off: 0,
                row_off: 0,
            },
            to: AnchorPoint {
                col: 2,
                row: 2,
                col_off: 0,
                row_off: 0,
            },
        };
        let bounds = anchor_bounds(&anchor, &Geometry::with_defaults(UnitMetrics::default()));
        assert_eq!(bounds.width, 0.0);
        assert_eq!(bounds.height, 0.0);
    }
}
