//! The conversion pipeline: package in, HTML document and report out.
//!
//! Only opening the package can fail. Every later unit of work (the workbook
//! index, the styles part, the worksheet, each drawing part, each image) is
//! isolated: a failure there becomes a [`Diagnostic`] and the run goes on
//! with that unit's default.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::config::ConvertOptions;
use crate::drawings::{anchor_bounds, drawing_parts_for_sheet, load_drawing};
use crate::error::{Result, XlstaticError};
use crate::layout::{Geometry, SheetLayout};
use crate::package::Package;
use crate::parser::relationships::{read_workbook, SheetEntry, WorkbookIndex};
use crate::parser::styles::parse_styles;
use crate::parser::worksheet::{parse_shared_strings, parse_worksheet, Worksheet};
use crate::render::render_document;
use crate::styles::StyleResolver;
use crate::transcode::{TranscodeOutcome, Transcoder};
use crate::types::{Cell, Diagnostic, DiagnosticKind, PositionedImage, Report};

/// Result of one conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub html: String,
    pub report: Report,
    pub layout: SheetLayout,
}

/// Convert a package file on disk.
///
/// # Errors
/// Returns an error only if the file cannot be read or is not an Office
/// package.
#[instrument(skip(options), fields(path = %path.as_ref().display()))]
pub fn convert_path(path: impl AsRef<Path>, options: &ConvertOptions) -> Result<Conversion> {
    let package = Package::open(path.as_ref())?;
    Ok(convert_package(&package, options))
}

/// Convert a package held in memory.
///
/// # Errors
/// Returns an error only if the bytes are not an Office package.
#[instrument(skip_all, fields(bytes = data.len()))]
pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let package = Package::from_bytes(data)?;
    Ok(convert_package(&package, options))
}

/// Convert an opened package. Never fails; see the returned report for
/// everything that was recovered from.
pub fn convert_package(package: &Package, options: &ConvertOptions) -> Conversion {
    let mut report = Report::default();

    let workbook = match read_workbook(package) {
        Ok(index) => index,
        Err(err) => {
            record(&mut report, DiagnosticKind::Worksheet, "xl/workbook.xml", &err);
            fallback_index()
        }
    };
    let sheet = select_sheet(&workbook, options.sheet.as_deref(), &mut report);
    report.sheet_name.clone_from(&sheet.name);

    let mut resolver = load_styles(package, &workbook.styles_path, &mut report);
    let shared_strings = load_shared_strings(package, &workbook.shared_strings_path, &mut report);
    let worksheet = load_worksheet(package, &sheet, &shared_strings, options, &mut report);
    drop(shared_strings);

    let Worksheet {
        cells: raw_cells,
        columns,
        rows,
        zoom,
        max_row,
        max_col,
        diagnostics,
    } = worksheet;
    report.diagnostics.extend(diagnostics);

    let geometry = Geometry::new(&columns, &rows, options.metrics);

    let cells: Vec<Cell> = raw_cells
        .into_iter()
        .map(|raw| Cell {
            style: resolver.resolve(raw.style_index),
            row: raw.row,
            col: raw.col,
            value: raw.value,
        })
        .collect();
    debug!(
        cells = cells.len(),
        styles = resolver.cached_styles(),
        cache_hits = resolver.cache_hits(),
        "cells resolved"
    );

    let images = place_images(package, &sheet.path, &geometry, options, &mut report);

    let layout = SheetLayout::build(&cells, &images, &geometry, max_row, max_col, zoom);
    report.cells_emitted = layout.cells.len();
    let html = render_document(&layout, &sheet.name);

    info!(
        sheet = %report.sheet_name,
        cells = report.cells_emitted,
        images = report.images_found,
        warnings = report.diagnostics.len(),
        "conversion finished"
    );

    Conversion {
        html,
        report,
        layout,
    }
}

fn record(report: &mut Report, kind: DiagnosticKind, part: &str, err: &XlstaticError) {
    warn!(?kind, part, error = %err, "recovered");
    report.push(Diagnostic::new(kind, part, err));
}

fn fallback_sheet() -> SheetEntry {
    SheetEntry {
        name: "Sheet1".to_string(),
        path: "xl/worksheets/sheet1.xml".to_string(),
    }
}

fn fallback_index() -> WorkbookIndex {
    WorkbookIndex {
        sheets: vec![fallback_sheet()],
        styles_path: "xl/styles.xml".to_string(),
        shared_strings_path: "xl/sharedStrings.xml".to_string(),
    }
}

fn select_sheet(workbook: &WorkbookIndex, name: Option<&str>, report: &mut Report) -> SheetEntry {
    if let Some(entry) = workbook.select(name) {
        return entry.clone();
    }
    let first = workbook.sheets.first().cloned().unwrap_or_else(fallback_sheet);
    if let Some(name) = name {
        warn!(requested = name, using = %first.name, "sheet not found");
        report.push(Diagnostic::new(
            DiagnosticKind::Worksheet,
            "xl/workbook.xml",
            format!("sheet {name:?} not found, using {:?}", first.name),
        ));
    }
    first
}

fn load_styles(package: &Package, path: &str, report: &mut Report) -> StyleResolver {
    let Some(data) = package.part(path) else {
        record(
            report,
            DiagnosticKind::StyleParse,
            path,
            &XlstaticError::MissingPart(path.to_string()),
        );
        return StyleResolver::fallback();
    };
    match parse_styles(data) {
        Ok(table) => {
            debug!(
                fonts = table.fonts.len(),
                fills = table.fills.len(),
                borders = table.borders.len(),
                formats = table.cell_xfs.len(),
                "style table parsed"
            );
            StyleResolver::new(table)
        }
        Err(err) => {
            record(report, DiagnosticKind::StyleParse, path, &err);
            StyleResolver::fallback()
        }
    }
}

fn load_shared_strings(package: &Package, path: &str, report: &mut Report) -> Vec<String> {
    let Some(data) = package.part(path) else {
        return Vec::new();
    };
    parse_shared_strings(data).unwrap_or_else(|err| {
        record(report, DiagnosticKind::Worksheet, path, &err);
        Vec::new()
    })
}

fn load_worksheet(
    package: &Package,
    sheet: &SheetEntry,
    shared_strings: &[String],
    options: &ConvertOptions,
    report: &mut Report,
) -> Worksheet {
    let parsed = package
        .require(&sheet.path)
        .and_then(|data| parse_worksheet(data, &sheet.path, shared_strings, &options.metrics));
    parsed.unwrap_or_else(|err| {
        record(report, DiagnosticKind::Worksheet, &sheet.path, &err);
        Worksheet::empty(&options.metrics)
    })
}

fn place_images(
    package: &Package,
    sheet_path: &str,
    geometry: &Geometry,
    options: &ConvertOptions,
    report: &mut Report,
) -> Vec<PositionedImage> {
    let parts = drawing_parts_for_sheet(package, sheet_path).unwrap_or_else(|err| {
        record(report, DiagnosticKind::DrawingParse, sheet_path, &err);
        Vec::new()
    });
    report.drawing_parts = parts.len();

    let mut transcoder = Transcoder::new(options.max_image_width, options.image_quality);
    let mut images = Vec::new();

    for part in &parts {
        let scan = match load_drawing(package, part) {
            Ok(scan) => scan,
            Err(err) => {
                record(report, DiagnosticKind::DrawingParse, part, &err);
                continue;
            }
        };
        report.anchors_skipped += scan.skipped;

        for anchor in scan.anchors {
            report.images_found += 1;
            let bounds = anchor_bounds(&anchor.anchor, geometry);
            let outcome = transcoder.transcode_part(package, &anchor.media_path);
            match outcome {
                TranscodeOutcome::Transcoded { .. } => report.images_transcoded += 1,
                TranscodeOutcome::Original { .. } => report.images_fallback += 1,
                TranscodeOutcome::Omitted { .. } => report.images_omitted += 1,
            }
            let from = anchor.anchor.from_point();
            images.push(PositionedImage {
                row: from.row,
                col: from.col,
                left: bounds.left,
                top: bounds.top,
                width: bounds.width,
                height: bounds.height,
                data_uri: outcome.data_uri().to_string(),
            });
        }
    }

    debug!(
        parts = parts.len(),
        images = images.len(),
        media = transcoder.cached(),
        "drawings resolved"
    );
    report.diagnostics.extend(transcoder.into_diagnostics());
    images
}
