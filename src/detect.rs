//! Source format sniffing and PDF artifact detection.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Formats a source document can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// HTML markup
    Html,
    /// JSON node tree
    Json,
}

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.4")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.4"

/// UTF-8 byte order mark.
const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Sniff whether bytes hold HTML or a JSON tree.
///
/// Leading whitespace and a UTF-8 BOM are skipped; `<` means HTML, `{`
/// means JSON.
pub fn detect_source_format(data: &[u8]) -> Result<SourceFormat> {
    let data = data.strip_prefix(BOM).unwrap_or(data);
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') => Ok(SourceFormat::Html),
        Some(b'{') => Ok(SourceFormat::Json),
        _ => Err(Error::UnknownFormat),
    }
}

/// Sniff the source format of a file.
pub fn detect_source_format_from_path<P: AsRef<Path>>(path: P) -> Result<SourceFormat> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(512);
    BufReader::new(file).take(512).read_to_end(&mut head)?;
    detect_source_format(&head)
}

/// Detect the PDF header of a produced artifact.
///
/// # Returns
/// * `Ok(PdfFormat)` if the data starts with a valid PDF header
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_pdf(data: &[u8]) -> Result<PdfFormat> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }
    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();
    if !is_valid_version(&version) {
        return Err(Error::UnknownFormat);
    }
    Ok(PdfFormat { version })
}

/// Check if bytes look like a PDF file.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_pdf(data).is_ok()
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3
        && (bytes[0] == b'1' || bytes[0] == b'2')
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_html_and_json() {
        assert_eq!(detect_source_format(b"<html>").unwrap(), SourceFormat::Html);
        assert_eq!(detect_source_format(b"\n  {\"tag\":\"p\"}").unwrap(), SourceFormat::Json);
        assert_eq!(
            detect_source_format(b"\xEF\xBB\xBF<!DOCTYPE html>").unwrap(),
            SourceFormat::Html
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(detect_source_format(b""), Err(Error::UnknownFormat)));
        assert!(matches!(detect_source_format(b"plain text"), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_pdf() {
        assert_eq!(detect_pdf(b"%PDF-1.4\n%test").unwrap().version, "1.4");
        assert!(is_pdf_bytes(b"%PDF-2.0\n"));
        assert!(!is_pdf_bytes(b"%PDF"));
        assert!(!is_pdf_bytes(b"%PDF-x.y\n"));
        assert!(!is_pdf_bytes(b"<!DOCTYPE html>"));
    }
}
