//! Structured error types for xlstatic.
//!
//! Only the package-level variants ever reach the caller of a conversion.
//! Everything else is caught at the boundary of the unit that failed and
//! recorded as a [`Diagnostic`](crate::types::Diagnostic).

/// All errors that can occur while reading and converting a package.
#[derive(Debug, thiserror::Error)]
pub enum XlstaticError {
    /// ZIP archive could not be opened or read.
    #[error("package unreadable: {0}")]
    Package(#[from] zip::result::ZipError),

    /// The archive opened but is not an Office package.
    #[error("not an Office package: {0}")]
    NotAPackage(String),

    /// A part that was required is absent from the package.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Style table could not be parsed.
    #[error("style table: {0}")]
    Style(String),

    /// Drawing part or its relationship manifest could not be parsed.
    #[error("drawing {part}: {reason}")]
    Drawing { part: String, reason: String },

    /// Embedded image could not be decoded or re-encoded.
    #[error("image {part}: {source}")]
    Image {
        part: String,
        #[source]
        source: image::ImageError,
    },

    /// Dimension table entry that would break position monotonicity.
    #[error("dimension table: {0}")]
    Dimension(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid JSON configuration.
    #[error("configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but holds a value the geometry cannot use.
    #[error("configuration: {0}")]
    InvalidOption(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlstaticError>;

impl XlstaticError {
    /// Build a [`XlstaticError::Drawing`] for `part`.
    pub fn drawing(part: &str, reason: impl std::fmt::Display) -> Self {
        Self::Drawing {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True when the error aborts a whole conversion run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Package(_) | Self::NotAPackage(_) | Self::Io(_))
    }
}
