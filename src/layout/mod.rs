//! Layout engine: sheet geometry and the pixel placement of cells and images.
//!
//! This module handles:
//! - Column and row dimension tables with unit conversion
//! - Cumulative positions from memoized prefix sums
//! - Per-cell boxes with zoom-aware font size and vertical alignment

mod geometry;
mod sheet_layout;

pub use geometry::{Axis, DimensionTable, Geometry};
pub use sheet_layout::{estimate_text_height, vertical_offset, CellBox, ImageBox, SheetLayout};
