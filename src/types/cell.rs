use serde::Serialize;

use super::StyleRef;

/// A cell as read from the worksheet, before style resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCell {
    /// Row (1-based)
    pub row: u32,
    /// Column (1-based)
    pub col: u32,
    /// Display text (cached value, shared string, inline string, ...)
    pub value: String,
    /// Index into the cell-format records, if the cell carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_index: Option<u32>,
}

/// A cell joined with its resolved style
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: String,
    pub style: StyleRef,
}
