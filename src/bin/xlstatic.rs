//! xlstatic - render one sheet of an XLSX file as a static HTML page
//!
//! Usage:
//!   xlstatic book.xlsx                      # writes book.html
//!   xlstatic book.xlsx -o page.html --sheet Summary
//!   xlstatic book.xlsx --report report.json # also dump the run report

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use xlstatic::{convert_path, ConvertOptions};

#[derive(Parser)]
#[command(name = "xlstatic")]
#[command(
    author,
    version,
    about = "Render an XLSX sheet as a pixel-positioned static HTML page"
)]
struct Cli {
    /// Input workbook (.xlsx)
    input: PathBuf,

    /// Output HTML file (default: input with an .html extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sheet name to render (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Images wider than this are downscaled, in pixels
    #[arg(long)]
    max_image_width: Option<u32>,

    /// JPEG quality for opaque images (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// JSON file with conversion options and unit metrics
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the conversion report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let options = options_from(&cli)?;

    let conversion = convert_path(&cli.input, &options)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));
    fs::write(&output, conversion.html.as_bytes())
        .with_context(|| format!("failed to write {}", output.display()))?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&conversion.report)
            .context("failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let report = &conversion.report;
    for diagnostic in &report.diagnostics {
        warn!(kind = ?diagnostic.kind, part = %diagnostic.part, "{}", diagnostic.message);
    }
    info!(
        output = %output.display(),
        sheet = %report.sheet_name,
        cells = report.cells_emitted,
        images = report.images_found,
        transcoded = report.images_transcoded,
        warnings = report.diagnostics.len(),
        "wrote page"
    );
    Ok(())
}

fn options_from(cli: &Cli) -> Result<ConvertOptions> {
    let mut options = match &cli.config {
        Some(path) => ConvertOptions::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConvertOptions::default(),
    };
    if let Some(sheet) = &cli.sheet {
        options.sheet = Some(sheet.clone());
    }
    if let Some(width) = cli.max_image_width {
        options.max_image_width = width;
    }
    if let Some(quality) = cli.quality {
        options.image_quality = quality;
    }
    Ok(options)
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("html")
}
