//! Sheet geometry: column and row dimension tables and the cumulative
//! position function used to place both cells and drawings.
//!
//! Sizes are stored in document units (characters for columns, points for
//! rows) and converted to pixels through [`UnitMetrics`]. Only overridden
//! indices carry a prefix sum; positions between and past them are
//! closed-form, so cost grows with the number of overrides, never with the
//! highest index.

use std::collections::BTreeMap;

use crate::config::UnitMetrics;
use crate::error::{Result, XlstaticError};

/// Which dimension table a lookup goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Column,
    Row,
}

impl Axis {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Row => "row",
        }
    }

    /// Highest index a worksheet can address on this axis.
    #[must_use]
    pub fn max_index(self) -> u32 {
        match self {
            Self::Column => 16_384,
            Self::Row => 1_048_576,
        }
    }
}

/// Per-index sizes for one axis, with a default for every index not listed.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable {
    axis: Axis,
    default: f64,
    sizes: BTreeMap<u32, f64>,
}

impl DimensionTable {
    #[must_use]
    pub fn new(axis: Axis, default: f64) -> Self {
        Self {
            axis,
            default,
            sizes: BTreeMap::new(),
        }
    }

    /// Override the size of one (1-based) index.
    ///
    /// # Errors
    /// Returns [`XlstaticError::Dimension`] for an index outside
    /// `1..=axis.max_index()` or a size that is negative or not finite; the
    /// table is left unchanged.
    pub fn set(&mut self, index: u32, size: f64) -> Result<()> {
        if index == 0 || index > self.axis.max_index() {
            return Err(XlstaticError::Dimension(format!(
                "{} index {index} is out of range",
                self.axis.as_str()
            )));
        }
        if !size.is_finite() || size < 0.0 {
            return Err(XlstaticError::Dimension(format!(
                "{} {index} has invalid size {size}",
                self.axis.as_str()
            )));
        }
        self.sizes.insert(index, size);
        Ok(())
    }

    /// Size of an index in document units, the default when not overridden.
    #[must_use]
    pub fn get(&self, index: u32) -> f64 {
        self.sizes.get(&index).copied().unwrap_or(self.default)
    }

    #[must_use]
    pub fn default_size(&self) -> f64 {
        self.default
    }

    /// Overridden entries in index order.
    pub fn overrides(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.sizes.iter().map(|(i, s)| (*i, *s))
    }
}

/// One overridden index with the pixel extent of everything before it.
#[derive(Debug, Clone, Copy)]
struct Mark {
    index: u32,
    start: f64,
    size: f64,
}

/// Pixel prefix sums for one axis, kept at override keys only.
#[derive(Debug, Clone)]
struct AxisScale {
    marks: Vec<Mark>,
    default_px: f64,
}

impl AxisScale {
    fn build(table: &DimensionTable, to_px: impl Fn(f64) -> f64) -> Self {
        let default_px = to_px(table.default_size());
        let mut marks = Vec::new();
        let mut previous = 0u32;
        let mut end = 0.0;
        for (index, size) in table.overrides() {
            let start = end + f64::from(index - previous - 1) * default_px;
            let size = to_px(size);
            marks.push(Mark { index, start, size });
            previous = index;
            end = start + size;
        }
        Self { marks, default_px }
    }

    /// Pixel extent of indices `1..=count`.
    fn span(&self, count: u32) -> f64 {
        let before = self.marks.partition_point(|m| m.index <= count);
        match before.checked_sub(1).and_then(|i| self.marks.get(i)) {
            Some(mark) => {
                mark.start + mark.size + f64::from(count - mark.index) * self.default_px
            }
            None => f64::from(count) * self.default_px,
        }
    }

    fn size(&self, index: u32) -> f64 {
        if index == 0 {
            return 0.0;
        }
        match self.marks.binary_search_by_key(&index, |m| m.index) {
            Ok(found) => self.marks.get(found).map_or(self.default_px, |m| m.size),
            Err(_) => self.default_px,
        }
    }
}

/// Both dimension tables reduced to pixel scales, plus the unit constants.
#[derive(Debug, Clone)]
pub struct Geometry {
    metrics: UnitMetrics,
    column_scale: AxisScale,
    row_scale: AxisScale,
}

impl Geometry {
    #[must_use]
    pub fn new(columns: &DimensionTable, rows: &DimensionTable, metrics: UnitMetrics) -> Self {
        Self {
            column_scale: AxisScale::build(columns, |w| metrics.column_px(w)),
            row_scale: AxisScale::build(rows, |h| metrics.row_px(h)),
            metrics,
        }
    }

    /// Geometry with every column and row at its default size.
    #[must_use]
    pub fn with_defaults(metrics: UnitMetrics) -> Self {
        Self::new(
            &DimensionTable::new(Axis::Column, metrics.default_column_width),
            &DimensionTable::new(Axis::Row, metrics.default_row_height),
            metrics,
        )
    }

    fn scale(&self, axis: Axis) -> &AxisScale {
        match axis {
            Axis::Column => &self.column_scale,
            Axis::Row => &self.row_scale,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &UnitMetrics {
        &self.metrics
    }

    /// Pixel size of one (1-based) index.
    #[must_use]
    pub fn size_px(&self, index: u32, axis: Axis) -> f64 {
        self.scale(axis).size(index)
    }

    /// Pixel coordinate of the leading edge of `index` plus an EMU offset.
    ///
    /// Non-decreasing in `index`; index 0 and 1 both start at 0.
    #[must_use]
    pub fn position(&self, index: u32, emu_offset: i64, axis: Axis) -> f64 {
        self.scale(axis).span(index.saturating_sub(1)) + self.metrics.emu_to_px(emu_offset)
    }

    /// Pixel extent of indices `1..=count`.
    #[must_use]
    pub fn extent(&self, count: u32, axis: Axis) -> f64 {
        self.scale(axis).span(count)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn geometry(cols: &[(u32, f64)], rows: &[(u32, f64)]) -> Geometry {
        let metrics = UnitMetrics::default();
        let mut columns = DimensionTable::new(Axis::Column, metrics.default_column_width);
        for (i, w) in cols {
            columns.set(*i, *w).unwrap();
        }
        let mut row_table = DimensionTable::new(Axis::Row, metrics.default_row_height);
        for (i, h) in rows {
            row_table.set(*i, *h).unwrap();
        }
        Geometry::new(&columns, &row_table, metrics)
    }

    #[test]
    fn default_positions() {
        let g = geometry(&[], &[]);
        assert_eq!(g.position(1, 0, Axis::Column), 0.0);
        assert_eq!(g.position(5, 0, Axis::Column), 256.0);
        assert_eq!(g.position(4, 0, Axis::Row), 60.0);
        assert_eq!(g.size_px(7, Axis::Column), 64.0);
        assert_eq!(g.size_px(7, Axis::Row), 20.0);
    }

    #[test]
    fn overrides_shift_later_positions() {
        let g = geometry(&[(2, 20.0)], &[(1, 30.0)]);
        assert_eq!(g.size_px(2, Axis::Column), 145.0);
        assert_eq!(g.position(3, 0, Axis::Column), 64.0 + 145.0);
        assert_eq!(g.position(10, 0, Axis::Column), 64.0 + 145.0 + 7.0 * 64.0);
        assert_eq!(g.position(2, 0, Axis::Row), 40.0);
    }

    #[test]
    fn emu_offset_is_added() {
        let g = geometry(&[], &[]);
        assert_eq!(g.position(2, 952_500, Axis::Column), 164.0);
        assert_eq!(g.position(1, 9525, Axis::Row), 1.0);
    }

    #[test]
    fn position_is_monotonic() {
        let g = geometry(&[(3, 0.0), (4, 2.5), (9, 40.0)], &[(2, 0.0), (5, 100.0)]);
        for axis in [Axis::Column, Axis::Row] {
            let mut previous = g.position(0, 0, axis);
            for index in 1..40 {
                let current = g.position(index, 0, axis);
                assert!(current >= previous, "{axis:?} {index}: {current} < {previous}");
                previous = current;
            }
        }
    }

    #[test]
    fn extent_sums_the_first_n() {
        let g = geometry(&[(1, 10.0)], &[]);
        assert_eq!(g.extent(0, Axis::Column), 0.0);
        assert_eq!(g.extent(2, Axis::Column), 75.0 + 64.0);
        assert_eq!(g.extent(3, Axis::Row), 60.0);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let mut table = DimensionTable::new(Axis::Row, 15.0);
        assert!(matches!(table.set(1, -1.0), Err(XlstaticError::Dimension(_))));
        assert!(table.set(1, f64::NAN).is_err());
        assert!(table.set(1, f64::INFINITY).is_err());
        assert!(table.set(0, 10.0).is_err());
        assert!(table.set(1_048_577, 10.0).is_err());
        assert!(DimensionTable::new(Axis::Column, 8.43).set(16_385, 1.0).is_err());
        assert_eq!(table.overrides().count(), 0);
        table.set(1, 0.0).unwrap();
        assert_eq!(table.get(1), 0.0);
    }

    #[test]
    fn huge_indices_stay_closed_form() {
        let g = geometry(&[], &[(3, 30.0)]);
        let far = g.position(1_000_000, 0, Axis::Row);
        assert_eq!(far, 40.0 + 20.0 * 999_998.0);
    }

    #[test]
    fn last_addressable_row_stays_sparse() {
        let g = geometry(&[], &[(1_048_576, 30.0), (2, 0.0)]);
        assert_eq!(g.size_px(1_048_576, Axis::Row), 40.0);
        assert_eq!(g.size_px(1_048_575, Axis::Row), 20.0);
        assert_eq!(g.position(1_048_576, 0, Axis::Row), 20.0 * 1_048_574.0);
        assert_eq!(g.extent(1_048_576, Axis::Row), 20.0 * 1_048_574.0 + 40.0);
    }

    #[test]
    fn sizes_between_overrides_are_default() {
        let g = geometry(&[(2, 20.0), (5, 0.0)], &[]);
        let sizes: Vec<f64> = (1..=6).map(|i| g.size_px(i, Axis::Column)).collect();
        assert_eq!(sizes, vec![64.0, 145.0, 64.0, 64.0, 0.0, 64.0]);
        assert_eq!(g.position(6, 0, Axis::Column), 64.0 * 3.0 + 145.0);
    }
}
