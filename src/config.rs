//! Conversion options and the unit constants the geometry is built from.
//!
//! Both structs deserialize from JSON with every field optional, so a config
//! file only needs to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XlstaticError};

/// Unit-conversion constants.
///
/// The defaults reproduce the spreadsheet application's own rendering at
/// 96 DPI with the Calibri 11 default font.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitMetrics {
    /// EMUs per CSS pixel
    pub emu_per_pixel: f64,
    /// Pixels per character of column width
    pub column_char_px: f64,
    /// Fixed padding added to every column
    pub column_padding_px: f64,
    /// Pixels per point of row height
    pub row_px_per_point: f64,
    /// Pixels per point of font size
    pub font_px_per_point: f64,
    /// Column width in characters when the sheet declares none
    pub default_column_width: f64,
    /// Row height in points when the sheet declares none
    pub default_row_height: f64,
    /// Average glyph width as a fraction of the font pixel size
    pub char_width_factor: f64,
    /// Line height as a multiple of the font pixel size
    pub line_height_factor: f64,
}

impl Default for UnitMetrics {
    fn default() -> Self {
        Self {
            emu_per_pixel: 9525.0,
            column_char_px: 7.0,
            column_padding_px: 5.0,
            row_px_per_point: 96.0 / 72.0,
            font_px_per_point: 1.3333,
            default_column_width: 8.43,
            default_row_height: 15.0,
            char_width_factor: 0.6,
            line_height_factor: 1.2,
        }
    }
}

impl UnitMetrics {
    /// Column width (characters) to integer pixels.
    #[must_use]
    pub fn column_px(&self, width: f64) -> f64 {
        (width * self.column_char_px + self.column_padding_px).round()
    }

    /// Row height (points) to integer pixels.
    #[must_use]
    pub fn row_px(&self, height: f64) -> f64 {
        (height * self.row_px_per_point).round()
    }

    /// Font size (points) to integer pixels, scaled by the sheet zoom.
    #[must_use]
    pub fn font_px(&self, points: f64, zoom_percent: f64) -> f64 {
        (points * self.font_px_per_point).round() * zoom_percent / 100.0
    }

    #[must_use]
    pub fn emu_to_px(&self, emu: i64) -> f64 {
        emu as f64 / self.emu_per_pixel
    }

    /// Check that every constant is finite and non-negative, and that the
    /// divisors are positive.
    ///
    /// # Errors
    /// Returns [`XlstaticError::InvalidOption`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("emuPerPixel", self.emu_per_pixel, true),
            ("columnCharPx", self.column_char_px, false),
            ("columnPaddingPx", self.column_padding_px, false),
            ("rowPxPerPoint", self.row_px_per_point, false),
            ("fontPxPerPoint", self.font_px_per_point, false),
            ("defaultColumnWidth", self.default_column_width, false),
            ("defaultRowHeight", self.default_row_height, false),
            ("charWidthFactor", self.char_width_factor, true),
            ("lineHeightFactor", self.line_height_factor, false),
        ];
        for (name, value, divisor) in fields {
            let valid = value.is_finite() && if divisor { value > 0.0 } else { value >= 0.0 };
            if !valid {
                return Err(XlstaticError::InvalidOption(format!(
                    "metrics.{name} cannot be {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Options for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Images wider than this are downscaled, keeping aspect ratio
    pub max_image_width: u32,
    /// Lossy encoder quality, 0..=100
    pub image_quality: u8,
    /// Sheet to convert by name; the first sheet when absent
    pub sheet: Option<String>,
    pub metrics: UnitMetrics,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_image_width: 300,
            image_quality: 50,
            sheet: None,
            metrics: UnitMetrics::default(),
        }
    }
}

impl ConvertOptions {
    /// Load options from a JSON file; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or its options are invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// # Errors
    /// Returns an error if `text` is not valid JSON for these options, or a
    /// metric is unusable (see [`UnitMetrics::validate`]).
    pub fn from_json(text: &str) -> Result<Self> {
        let mut options: Self = serde_json::from_str(text)?;
        options.metrics.validate()?;
        options.image_quality = options.image_quality.min(100);
        Ok(options)
    }
}
