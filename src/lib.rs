//! xlstatic - XLSX to static HTML
//!
//! Reconstructs the visual layout of one worksheet and writes it out as a
//! single self-contained HTML page:
//! - Cell text with resolved fonts, fills, borders and alignment
//! - Column widths, row heights and sheet zoom in pixels
//! - Floating pictures positioned from their drawing anchors, downscaled and
//!   embedded as `data:` URIs
//!
//! A malformed styles part, worksheet, drawing or image never aborts a run.
//! It is recorded in the [`Report`] and the page is rendered without it.
//!
//! # Usage
//!
//! ```no_run
//! use xlstatic::{convert_path, ConvertOptions};
//!
//! let conversion = convert_path("book.xlsx", &ConvertOptions::default())?;
//! std::fs::write("book.html", conversion.html)?;
//! for diagnostic in &conversion.report.diagnostics {
//!     eprintln!("{}: {}", diagnostic.part, diagnostic.message);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Package and part readers
pub mod cell_ref;
pub mod color;
pub mod drawings;
pub mod error;
pub mod package;
pub mod parser;
pub mod styles;
pub mod types;
pub mod xml_helpers;

// Layout and output
pub mod config;
pub mod convert;
pub mod layout;
pub mod render;
pub mod transcode;

pub use config::{ConvertOptions, UnitMetrics};
pub use convert::{convert_bytes, convert_package, convert_path, Conversion};
pub use error::{Result, XlstaticError};
pub use package::Package;
pub use types::*;
