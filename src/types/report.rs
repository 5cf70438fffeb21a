use serde::Serialize;

/// Which unit of work a recovered failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Styles part missing or malformed; every cell uses the default style
    StyleParse,
    /// Worksheet (or workbook index) unreadable; no cells rendered
    Worksheet,
    /// A drawing part or its relationship manifest is malformed
    DrawingParse,
    /// An embedded image could not be transcoded or read
    ImageDecode,
    /// A dimension entry was rejected
    Dimension,
}

/// A recovered, non-fatal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Part path the failure belongs to
    pub part: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, part: impl Into<String>, message: impl ToString) -> Self {
        Self {
            kind,
            part: part.into(),
            message: message.to_string(),
        }
    }
}

/// Summary of one conversion run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub sheet_name: String,
    pub cells_emitted: usize,
    pub drawing_parts: usize,
    /// Picture anchors that resolved to a media part
    pub images_found: usize,
    pub images_transcoded: usize,
    /// Images embedded with their original bytes
    pub images_fallback: usize,
    /// Images dropped because their bytes could not be read
    pub images_omitted: usize,
    pub anchors_skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}
