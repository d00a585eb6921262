//! Error types for resume-export library.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias for resume-export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading or exporting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// The source element is missing or not attached to the document.
    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    /// The snapshot could not be turned into a bitmap.
    #[error("Rasterization failed: {0}")]
    RasterizationFailed(String),

    /// The paginated PDF could not be assembled.
    #[error("PDF encoding failed: {0}")]
    EncodingFailed(String),

    /// Another export is already running on this controller.
    #[error("An export is already in progress")]
    Busy,

    /// An option value was rejected.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The input format is not recognized.
    #[error("Unknown source format")]
    UnknownFormat,

    /// Error parsing a source document.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A tree mutation would corrupt the document structure.
    #[error("Invalid tree operation: {0}")]
    InvalidTree(String),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding or encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Anything else, including panics caught at the export boundary.
    #[error("{0}")]
    Unknown(String),
}

/// Failure taxonomy surfaced to observers of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No source element to export.
    ContentUnavailable,
    /// Canvas capture failed.
    RasterizationFailed,
    /// PDF assembly failed.
    EncodingFailed,
    /// Any other failure.
    Unknown,
}

impl Error {
    /// Normalize this error to the export failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ContentUnavailable(_) => ErrorKind::ContentUnavailable,
            Error::RasterizationFailed(_) | Error::Image(_) => ErrorKind::RasterizationFailed,
            Error::EncodingFailed(_) => ErrorKind::EncodingFailed,
            _ => ErrorKind::Unknown,
        }
    }

    /// Human-readable message suitable for a status line.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::ContentUnavailable => {
                "Resume content is not available for export.".to_string()
            }
            ErrorKind::RasterizationFailed => {
                format!("Could not capture the document: {}", self.detail())
            }
            ErrorKind::EncodingFailed => format!("Could not build the PDF: {}", self.detail()),
            ErrorKind::Unknown => format!("Failed to generate PDF: {}", self),
        }
    }

    fn detail(&self) -> String {
        match self {
            Error::RasterizationFailed(msg) | Error::EncodingFailed(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Busy;
        assert_eq!(err.to_string(), "An export is already in progress");

        let err = Error::ContentUnavailable("no source element".into());
        assert_eq!(err.to_string(), "Content unavailable: no source element");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(
            Error::RasterizationFailed("zero-sized".into()).kind(),
            ErrorKind::RasterizationFailed
        );
        assert_eq!(
            Error::EncodingFailed("xref".into()).kind(),
            ErrorKind::EncodingFailed
        );
        assert_eq!(Error::Unknown("boom".into()).kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_user_message() {
        let err = Error::EncodingFailed("stream too large".into());
        assert_eq!(err.user_message(), "Could not build the PDF: stream too large");

        let err = Error::ContentUnavailable("missing".into());
        assert!(err.user_message().contains("not available"));
    }
}
