//! Pixel layout for one sheet: where every non-empty cell and every picture
//! goes, computed once before serialization.

use serde::Serialize;

use crate::config::UnitMetrics;
use crate::layout::{Axis, Geometry};
use crate::types::{Cell, PositionedImage, StyleRef, VAlign};

/// Absolute box for one non-empty cell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBox {
    pub row: u32,
    pub col: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    /// Row height; the box always keeps it for containment
    pub height: f64,
    /// Font size in pixels, zoom applied
    pub font_px: f64,
    pub line_height: f64,
    /// Estimated height of the rendered text
    pub text_height: f64,
    /// Offset of the text inside the box from vertical alignment
    pub text_offset: f64,
    pub text: String,
    pub style: StyleRef,
}

/// Absolute box for one picture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBox {
    pub row: u32,
    pub col: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    pub data_uri: String,
}

/// Everything the document serializer needs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLayout {
    /// Container width: columns `1..=max_col`
    pub width: f64,
    /// Container height: rows `1..=max_row`
    pub height: f64,
    pub zoom: f64,
    pub cells: Vec<CellBox>,
    pub images: Vec<ImageBox>,
}

impl SheetLayout {
    /// Lay out cells and images on the sheet grid.
    ///
    /// Cells with empty text are not placed; images with an empty data URI
    /// are dropped.
    #[must_use]
    pub fn build(
        cells: &[Cell],
        images: &[PositionedImage],
        geometry: &Geometry,
        max_row: u32,
        max_col: u32,
        zoom: f64,
    ) -> Self {
        let metrics = geometry.metrics();

        let cell_boxes = cells
            .iter()
            .filter(|cell| !cell.value.is_empty())
            .map(|cell| layout_cell(cell, geometry, metrics, zoom))
            .collect();

        let image_boxes = images
            .iter()
            .filter(|image| !image.data_uri.is_empty())
            .map(|image| ImageBox {
                row: image.row,
                col: image.col,
                left: image.left,
                top: image.top,
                width: image.width,
                height: image.height,
                data_uri: image.data_uri.clone(),
            })
            .collect();

        Self {
            width: geometry.extent(max_col, Axis::Column),
            height: geometry.extent(max_row, Axis::Row),
            zoom,
            cells: cell_boxes,
            images: image_boxes,
        }
    }
}

fn layout_cell(cell: &Cell, geometry: &Geometry, metrics: &UnitMetrics, zoom: f64) -> CellBox {
    let left = geometry.position(cell.col, 0, Axis::Column);
    let top = geometry.position(cell.row, 0, Axis::Row);
    let width = geometry.size_px(cell.col, Axis::Column);
    let height = geometry.size_px(cell.row, Axis::Row);

    let font_px = metrics.font_px(cell.style.size, zoom);
    let text_height = estimate_text_height(&cell.value, cell.style.wrap, width, font_px, metrics);

    CellBox {
        row: cell.row,
        col: cell.col,
        left,
        top,
        width,
        height,
        font_px,
        line_height: font_px * metrics.line_height_factor,
        text_height,
        text_offset: vertical_offset(cell.style.vertical_align, height, text_height),
        text: cell.value.clone(),
        style: cell.style.clone(),
    }
}

/// Approximate rendered text height.
///
/// Without wrapping the text is one line. With wrapping, each literal line
/// takes `ceil(chars / chars_per_line)` rows (at least one), where
/// `chars_per_line` comes from an average glyph width.
#[must_use]
pub fn estimate_text_height(
    text: &str,
    wrap: bool,
    cell_width: f64,
    font_px: f64,
    metrics: &UnitMetrics,
) -> f64 {
    let line_height = font_px * metrics.line_height_factor;
    if !wrap {
        return line_height;
    }

    let glyph_width = font_px * metrics.char_width_factor;
    let chars_per_line = if glyph_width > 0.0 {
        (cell_width / glyph_width).max(1.0)
    } else {
        f64::INFINITY
    };

    let rows: f64 = text
        .split('\n')
        .map(|line| {
            let chars = line.chars().count() as f64;
            (chars / chars_per_line).ceil().max(1.0)
        })
        .sum();
    rows * line_height
}

/// Top offset of the text inside its row.
#[must_use]
pub fn vertical_offset(align: VAlign, row_height: f64, text_height: f64) -> f64 {
    match align {
        VAlign::Top => 0.0,
        VAlign::Center => (row_height - text_height) / 2.0,
        VAlign::Bottom | VAlign::Justify | VAlign::Distributed => row_height - text_height,
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
    use crate::types::ResolvedCellStyle;
    use test_case::test_case;

    #[test_case(VAlign::Top, 0.0)]
    #[test_case(VAlign::Center, 10.0)]
    #[test_case(VAlign::Bottom, 20.0)]
    #[test_case(VAlign::Justify, 20.0)]
    fn vertical_alignment(align: VAlign, expected: f64) {
        assert_eq!(vertical_offset(align, 40.0, 20.0), expected);
    }

    #[test]
    fn unwrapped_text_is_one_line() {
        let metrics = UnitMetrics::default();
        let h = estimate_text_height("a very long line of text indeed", false, 64.0, 15.0, &metrics);
        assert_eq!(h, 18.0);
    }

    #[test]
    fn wrapped_text_counts_rows_per_line() {
        let metrics = UnitMetrics::default();
        // glyph 9px, 64px cell: 7.1 chars per line
        let h = estimate_text_height("abcdefghijklmno\n\nxyz", true, 64.0, 15.0, &metrics);
        // 15 chars -> 3 rows, empty -> 1, 3 chars -> 1
        assert_eq!(h, 5.0 * 18.0);
    }

    #[test]
    fn narrow_cells_still_fit_one_char_per_row() {
        let metrics = UnitMetrics::default();
        let h = estimate_text_height("abcd", true, 1.0, 15.0, &metrics);
        assert_eq!(h, 4.0 * 18.0);
    }

    #[test]
    fn cells_and_images_are_placed_on_the_grid() {
        let geometry = Geometry::with_defaults(UnitMetrics::default());
        let style = StyleRef::new(ResolvedCellStyle::default());
        let cells = vec![
            Cell {
                row: 1,
                col: 1,
                value: "Hello".into(),
                style: style.clone(),
            },
            Cell {
                row: 2,
                col: 3,
                value: "World".into(),
                style: style.clone(),
            },
            Cell {
                row: 3,
                col: 1,
                value: String::new(),
                style,
            },
        ];
        let images = vec![
            PositionedImage {
                row: 1,
                col: 2,
                left: 64.0,
                top: 0.0,
                width: 10.0,
                height: 20.0,
                data_uri: "data:image/png;base64,AA==".into(),
            },
            PositionedImage {
                row: 1,
                col: 2,
                left: 64.0,
                top: 0.0,
                width: 10.0,
                height: 20.0,
                data_uri: String::new(),
            },
        ];

        let layout = SheetLayout::build(&cells, &images, &geometry, 3, 3, 100.0);
        assert_eq!(layout.width, 192.0);
        assert_eq!(layout.height, 60.0);
        assert_eq!(layout.cells.len(), 2);
        assert_eq!(layout.images.len(), 1);

        let hello = &layout.cells[0];
        assert_eq!((hello.left, hello.top, hello.width, hello.height), (0.0, 0.0, 64.0, 20.0));
        assert_eq!(hello.font_px, 15.0);
        assert_eq!(hello.text_offset, 20.0 - 18.0);

        let world = &layout.cells[1];
        assert_eq!((world.left, world.top), (128.0, 20.0));
    }

    #[test]
    fn zoom_scales_font_size() {
        let geometry = Geometry::with_defaults(UnitMetrics::default());
        let cells = vec![Cell {
            row: 1,
            col: 1,
            value: "x".into(),
            style: StyleRef::new(ResolvedCellStyle::default()),
        }];
        let layout = SheetLayout::build(&cells, &[], &geometry, 1, 1, 200.0);
        assert_eq!(layout.cells[0].font_px, 30.0);
    }
}
