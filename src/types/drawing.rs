use serde::Serialize;

/// One end of a drawing anchor: a cell plus an EMU offset inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    /// Column (1-based; the document stores it 0-based)
    pub col: u32,
    /// Row (1-based; the document stores it 0-based)
    pub row: u32,
    /// Column offset in EMUs
    pub col_off: i64,
    /// Row offset in EMUs
    pub row_off: i64,
}

/// Where a floating picture sits on the sheet.
///
/// The presence of a `to` element decides the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawingAnchor {
    /// Anchored at one cell with an absolute size (`ext cx/cy`, EMUs)
    FixedExtent { from: AnchorPoint, cx: i64, cy: i64 },
    /// Stretched between two cells
    CellSpan { from: AnchorPoint, to: AnchorPoint },
}

impl DrawingAnchor {
    #[must_use]
    pub fn from_point(&self) -> AnchorPoint {
        match *self {
            Self::FixedExtent { from, .. } | Self::CellSpan { from, .. } => from,
        }
    }
}

/// A picture anchor together with its embed relationship, already resolved
/// to a media part path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnchor {
    pub anchor: DrawingAnchor,
    /// Relationship id from `a:blip/@r:embed`
    pub embed_id: String,
    /// Target media part, e.g. `xl/media/image1.png`
    pub media_path: String,
}

/// Raw bytes of one media part, borrowed from the package.
#[derive(Debug, Clone, Copy)]
pub struct ImageAsset<'a> {
    pub media_path: &'a str,
    pub bytes: &'a [u8],
}

/// Pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// An image ready for layout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedImage {
    /// Anchor cell (informational)
    pub row: u32,
    pub col: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Self-contained `data:` URI; empty when the image could not be read
    #[serde(skip)]
    pub data_uri: String,
}
