//! Relationship manifests (`_rels/*.rels`) and the workbook index built on them.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Result, XlstaticError};
use crate::package::Package;
use crate::xml_helpers::attr_string;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const DEFAULT_STYLES_PART: &str = "xl/styles.xml";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// One internal relationship, with its target resolved to a package path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// Match on the last segment of the relationship type URI
    /// (`.../relationships/image` is kind `image`).
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// All internal relationships of one source part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Target path for a relationship id.
    #[must_use]
    pub fn target(&self, id: &str) -> Option<&str> {
        self.rels
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.target.as_str())
    }

    /// Targets of every relationship of `kind`, in document order.
    pub fn targets_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rels
            .iter()
            .filter(move |r| r.is_kind(kind))
            .map(|r| r.target.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

/// Parse a relationship manifest belonging to `source_part`.
///
/// Targets are resolved against the source part's directory. Relationships
/// with `TargetMode="External"` are skipped.
///
/// # Errors
/// Returns an error if the manifest is not well-formed XML.
pub fn parse_relationships(data: &[u8], source_part: &str) -> Result<Relationships> {
    let base_dir = parent_dir(source_part.trim_start_matches('/'));
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let Some(rel) = read_relationship(e, base_dir) {
                    rels.push(rel);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(Relationships { rels })
}

fn read_relationship(e: &BytesStart, base_dir: &str) -> Option<Relationship> {
    let external =
        attr_string(e, b"TargetMode").is_some_and(|m| m.eq_ignore_ascii_case("External"));
    if external {
        return None;
    }
    let id = attr_string(e, b"Id").filter(|s| !s.is_empty())?;
    let target = attr_string(e, b"Target").filter(|s| !s.is_empty())?;
    Some(Relationship {
        id,
        rel_type: attr_string(e, b"Type").unwrap_or_default(),
        target: resolve_relative_path(base_dir, &target),
    })
}

/// Load and parse the manifest of `part`, if the package has one.
///
/// # Errors
/// Returns an error if the manifest exists but is malformed.
pub fn load_relationships(package: &Package, part: &str) -> Result<Option<Relationships>> {
    let rels_path = rels_path_for(part);
    match package.part(&rels_path) {
        Some(data) => parse_relationships(data, part).map(Some),
        None => Ok(None),
    }
}

/// Manifest path of a part: `xl/drawings/drawing1.xml` has
/// `xl/drawings/_rels/drawing1.xml.rels`.
#[must_use]
pub fn rels_path_for(part: &str) -> String {
    let part = part.trim_start_matches('/');
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against a base directory.
///
/// `../media/image1.png` against `xl/drawings` is `xl/media/image1.png`; an
/// absolute target only loses its leading `/`.
#[must_use]
pub fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            _ => components.push(part),
        }
    }
    components.join("/")
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// A sheet listed in the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    /// Worksheet part path
    pub path: String,
}

/// Where the workbook keeps its sheets and shared parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookIndex {
    pub sheets: Vec<SheetEntry>,
    pub styles_path: String,
    pub shared_strings_path: String,
}

impl WorkbookIndex {
    /// A sheet by name, or the first sheet when `name` is `None`.
    #[must_use]
    pub fn select(&self, name: Option<&str>) -> Option<&SheetEntry> {
        match name {
            Some(name) => self.sheets.iter().find(|s| s.name == name),
            None => self.sheets.first(),
        }
    }
}

/// Read the sheet list and shared-part locations from `xl/workbook.xml` and
/// its manifest.
///
/// # Errors
/// Returns an error if the workbook part is missing or malformed, or its
/// manifest is malformed.
pub fn read_workbook(package: &Package) -> Result<WorkbookIndex> {
    let data = package.require(WORKBOOK_PART)?;
    let rels = load_relationships(package, WORKBOOK_PART)?.unwrap_or_default();

    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                if let Some(name) = attr_string(e, b"name").filter(|n| !n.is_empty()) {
                    // r:id is namespace prefixed
                    let path = sheet_rel_id(e)
                        .as_deref()
                        .and_then(|id| rels.target(id))
                        .map_or_else(
                            || format!("xl/worksheets/sheet{}.xml", sheets.len() + 1),
                            ToString::to_string,
                        );
                    sheets.push(SheetEntry { name, path });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if sheets.is_empty() {
        return Err(XlstaticError::MissingPart(format!(
            "{WORKBOOK_PART} lists no sheets"
        )));
    }

    let styles_path = rels
        .targets_of_kind("styles")
        .next()
        .unwrap_or(DEFAULT_STYLES_PART)
        .to_string();
    let shared_strings_path = rels
        .targets_of_kind("sharedStrings")
        .next()
        .unwrap_or(DEFAULT_SHARED_STRINGS_PART)
        .to_string();

    debug!(sheets = sheets.len(), %styles_path, "workbook index read");
    Ok(WorkbookIndex {
        sheets,
        styles_path,
        shared_strings_path,
    })
}

fn sheet_rel_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref().ends_with(b":id"))
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(ToString::to_string))
}
