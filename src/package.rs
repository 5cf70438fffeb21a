//! Package reader: the zip container as a read-only set of named parts.
//!
//! Every file entry is read into memory while the archive is open, then the
//! archive handle is dropped before [`Package::open`] returns. Nothing else in
//! the crate touches the zip layer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Result, XlstaticError};

/// Part every Office package carries at its root.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// An opened Office package: part path to bytes.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Open a package from a file on disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a zip archive, or is
    /// not an Office package.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Open a package held in memory.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a zip archive or not an Office package.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Open a package from any seekable reader.
    ///
    /// # Errors
    /// Returns an error if the archive or one of its entries cannot be read, or
    /// the archive has no `[Content_Types].xml`.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = BTreeMap::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let capacity = usize::try_from(entry.size()).unwrap_or(0);
            let mut bytes = Vec::with_capacity(capacity);
            entry.read_to_end(&mut bytes)?;
            parts.insert(name, bytes);
        }

        if !parts.contains_key(CONTENT_TYPES_PART) {
            return Err(XlstaticError::NotAPackage(format!(
                "{CONTENT_TYPES_PART} is missing"
            )));
        }

        debug!(parts = parts.len(), "package loaded");
        Ok(Self { parts })
    }

    /// All part paths, in sorted order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Bytes of a part by exact path (a leading `/` is ignored).
    #[must_use]
    pub fn part(&self, path: &str) -> Option<&[u8]> {
        self.parts
            .get(path.trim_start_matches('/'))
            .map(Vec::as_slice)
    }

    /// Like [`Package::part`], but a missing part is an error.
    ///
    /// # Errors
    /// Returns [`XlstaticError::MissingPart`] if the part is absent.
    pub fn require(&self, path: &str) -> Result<&[u8]> {
        self.part(path)
            .ok_or_else(|| XlstaticError::MissingPart(path.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_parts_by_exact_path() {
        let data = zip_with(&[
            (CONTENT_TYPES_PART, b"<Types/>"),
            ("xl/styles.xml", b"<styleSheet/>"),
        ]);
        let package = Package::from_bytes(&data).unwrap();

        assert_eq!(package.len(), 2);
        assert_eq!(package.part("xl/styles.xml"), Some(&b"<styleSheet/>"[..]));
        assert_eq!(package.part("/xl/styles.xml"), Some(&b"<styleSheet/>"[..]));
        assert!(package.part("xl/Styles.xml").is_none());
        assert!(matches!(
            package.require("xl/workbook.xml"),
            Err(XlstaticError::MissingPart(_))
        ));
    }

    #[test]
    fn lists_part_names() {
        let data = zip_with(&[(CONTENT_TYPES_PART, b""), ("xl/media/image1.png", b"x")]);
        let package = Package::from_bytes(&data).unwrap();
        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(names, vec![CONTENT_TYPES_PART, "xl/media/image1.png"]);
    }

    #[test]
    fn garbage_is_a_package_error() {
        let err = Package::from_bytes(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, XlstaticError::Package(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn zip_without_content_types_is_rejected() {
        let data = zip_with(&[("hello.txt", b"hi")]);
        let err = Package::from_bytes(&data).unwrap_err();
        assert!(matches!(err, XlstaticError::NotAPackage(_)));
    }
}
