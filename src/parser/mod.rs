//! XML part readers.
//!
//! Each reader turns the bytes of one package part into plain data. None of
//! them touch the package directly except the workbook index, which has to
//! follow relationship manifests.

pub mod relationships;
pub mod styles;
pub mod worksheet;

pub use relationships::{
    load_relationships, parse_relationships, read_workbook, Relationship, Relationships,
    SheetEntry, WorkbookIndex,
};
pub use styles::parse_styles;
pub use worksheet::{parse_shared_strings, parse_worksheet, Worksheet};
