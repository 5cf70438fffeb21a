use serde::{Serialize, Serializer};
use std::ops::Deref;
use std::sync::Arc;

use crate::color::ColorRef;

/// Font family used when a font record has no `name`.
pub const DEFAULT_FONT_FAMILY: &str = "Calibri";

/// Font size in points used when a font record has no `sz`.
pub const DEFAULT_FONT_SIZE: f64 = 11.0;

// ============================================================================
// Raw style tables (positional, exactly as found in xl/styles.xml)
// ============================================================================

/// Parsed stylesheet: four independently indexed tables.
#[derive(Debug, Default, Clone)]
pub struct StyleTable {
    pub fonts: Vec<RawFont>,
    pub fills: Vec<RawFill>,
    pub borders: Vec<RawBorder>,
    pub cell_xfs: Vec<CellXf>,
}

#[derive(Debug, Default, Clone)]
pub struct RawFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<ColorRef>,
}

#[derive(Debug, Default, Clone)]
pub struct RawFill {
    pub pattern_type: Option<String>,
    pub fg_color: Option<ColorRef>,
}

#[derive(Debug, Default, Clone)]
pub struct RawBorder {
    pub left: Option<RawBorderSide>,
    pub right: Option<RawBorderSide>,
    pub top: Option<RawBorderSide>,
    pub bottom: Option<RawBorderSide>,
}

#[derive(Debug, Clone)]
pub struct RawBorderSide {
    pub style: String,
    pub color: Option<ColorRef>,
}

/// A cell-format record (`<xf>` inside `<cellXfs>`)
#[derive(Debug, Default, Clone)]
pub struct CellXf {
    pub font_id: Option<u32>,
    pub fill_id: Option<u32>,
    pub border_id: Option<u32>,
    pub alignment: Option<RawAlignment>,
}

#[derive(Debug, Default, Clone)]
pub struct RawAlignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
}

// ============================================================================
// Resolved style
// ============================================================================

/// Flattened, fully resolved cell style.
///
/// Colors are bare hex (`RRGGBB`), without the leading `#`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCellStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font size in points
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub borders: Borders,
    pub wrap: bool,
    pub horizontal_align: HAlign,
    pub vertical_align: VAlign,
    pub font_family: String,
}

impl Default for ResolvedCellStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            size: DEFAULT_FONT_SIZE,
            color: None,
            background_color: None,
            borders: Borders::default(),
            wrap: false,
            horizontal_align: HAlign::General,
            vertical_align: VAlign::Bottom,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

/// Shared handle to a resolved style; one per distinct style index.
#[derive(Debug, Clone)]
pub struct StyleRef(pub Arc<ResolvedCellStyle>);

impl StyleRef {
    #[must_use]
    pub fn new(style: ResolvedCellStyle) -> Self {
        Self(Arc::new(style))
    }

    /// True when both handles point at the same memoized record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for StyleRef {
    type Target = ResolvedCellStyle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for StyleRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Resolved borders, one optional line per side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Borders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<BorderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<BorderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<BorderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<BorderLine>,
}

impl Borders {
    /// Present sides in CSS order (top, right, bottom, left).
    pub fn sides(&self) -> impl Iterator<Item = (BorderEdge, &BorderLine)> {
        [
            (BorderEdge::Top, self.top.as_ref()),
            (BorderEdge::Right, self.right.as_ref()),
            (BorderEdge::Bottom, self.bottom.as_ref()),
            (BorderEdge::Left, self.left.as_ref()),
        ]
        .into_iter()
        .filter_map(|(edge, line)| line.map(|l| (edge, l)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sides().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderEdge {
    Top,
    Right,
    Bottom,
    Left,
}

impl BorderEdge {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderLine {
    pub style: BorderStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BorderStyle {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    /// Parse the `style` attribute of a border side; `none` and unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let style = match s {
            "thin" => Self::Thin,
            "medium" => Self::Medium,
            "thick" => Self::Thick,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            "double" => Self::Double,
            "hair" => Self::Hair,
            "mediumDashed" => Self::MediumDashed,
            "dashDot" => Self::DashDot,
            "mediumDashDot" => Self::MediumDashDot,
            "dashDotDot" => Self::DashDotDot,
            "mediumDashDotDot" => Self::MediumDashDotDot,
            "slantDashDot" => Self::SlantDashDot,
            _ => return None,
        };
        Some(style)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum HAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HAlign {
    /// Unknown values fall back to `General`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterContinuous,
            "distributed" => Self::Distributed,
            _ => Self::General,
        }
    }

    /// CSS `text-align` value: `general` becomes `left`, `distributed` becomes
    /// `justify`, everything else passes through.
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::General | Self::Left => "left",
            Self::Distributed | Self::Justify => "justify",
            Self::Center => "center",
            Self::Right => "right",
            Self::Fill => "fill",
            Self::CenterContinuous => "centerContinuous",
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum VAlign {
    Top,
    Center, // Excel says "center", not "middle"
    #[default]
    Bottom,
    Justify,
    Distributed,
}

impl VAlign {
    /// Unknown values fall back to `Bottom`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "top" => Self::Top,
            "center" => Self::Center,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => Self::Bottom,
        }
    }
}
