//! Export options and configuration.

use crate::error::{Error, Result};
use crate::model::{Color, Metadata};
use crate::paginate::PageGeometry;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name used when the caller supplies none.
pub const DEFAULT_FILE_NAME: &str = "resume.pdf";

/// Smallest accepted oversampling factor.
pub const MIN_SCALE: f32 = 2.0;

/// Largest accepted oversampling factor.
pub const MAX_SCALE: f32 = 8.0;

/// Physical paper formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    /// 297 × 420 mm
    A3,
    /// 210 × 297 mm
    #[default]
    A4,
    /// 148 × 210 mm
    A5,
    /// 8.5 × 11 in
    Letter,
    /// 8.5 × 14 in
    Legal,
}

impl PaperSize {
    /// Portrait width and height in millimetres.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
        }
    }

    /// Lowercase name as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            PaperSize::A3 => "a3",
            PaperSize::A4 => "a4",
            PaperSize::A5 => "a5",
            PaperSize::Letter => "letter",
            PaperSize::Legal => "legal",
        }
    }
}

impl FromStr for PaperSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(PaperSize::A3),
            "a4" | "" => Ok(PaperSize::A4),
            "a5" => Ok(PaperSize::A5),
            "letter" => Ok(PaperSize::Letter),
            "legal" => Ok(PaperSize::Legal),
            other => Err(Error::InvalidOption(format!("unknown paper size '{}'", other))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Taller than wide
    #[default]
    Portrait,
    /// Wider than tall
    Landscape,
}

/// How the full-height bitmap is placed on pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageImageMode {
    /// One image drawn on every page at that page's negative offset
    #[default]
    Shared,
    /// Each page embeds its own crop of the bitmap
    Sliced,
}

/// Compression of embedded page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    /// Lossless zlib/deflate
    #[default]
    Flate,
    /// JPEG with the given quality (1-100)
    Jpeg {
        /// Quality, clamped to 1-100
        quality: u8,
    },
}

/// Options for the list normalization stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Class marking the designated section-content regions
    pub section_class: String,

    /// Glyph placed in the marker cell of unordered rows
    pub bullet: char,

    /// Fixed width of the marker cell in CSS pixels
    pub marker_width_px: f32,

    /// Left padding forced onto every list
    pub list_padding_px: f32,

    /// Bottom margin of paragraphs created from line breaks
    pub paragraph_spacing_px: f32,

    /// Bottom margin of each marker/content row
    pub row_spacing_px: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            section_class: "section-content".to_string(),
            bullet: '•',
            marker_width_px: 15.0,
            list_padding_px: 20.0,
            paragraph_spacing_px: 8.0,
            row_spacing_px: 4.0,
        }
    }
}

/// Options for exporting a document to PDF.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Paper format
    pub paper_size: PaperSize,

    /// Page orientation
    pub orientation: Orientation,

    /// Requested file name (falls back to `default_file_name`)
    pub file_name: Option<String>,

    /// File name used when none is requested
    pub default_file_name: String,

    /// Rasterization oversampling factor
    pub scale: f32,

    /// Opaque background painted under the snapshot
    pub background: Color,

    /// List normalization settings
    pub normalize: NormalizeOptions,

    /// Placement of the bitmap on pages
    pub image_mode: PageImageMode,

    /// Compression of page images
    pub image_encoding: ImageEncoding,

    /// Compress content streams
    pub compress: bool,

    /// Use parallel processing where possible
    pub parallel: bool,

    /// Directory relative image sources resolve against
    pub base_dir: Option<PathBuf>,

    /// Metadata overriding what the document carries
    pub metadata: Metadata,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the paper size.
    pub fn with_paper_size(mut self, paper: PaperSize) -> Self {
        self.paper_size = paper;
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the output file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the fallback file name (e.g. `document.pdf`).
    pub fn with_default_file_name(mut self, name: impl Into<String>) -> Self {
        self.default_file_name = name.into();
        self
    }

    /// Set the oversampling factor, clamped to 2.0-8.0.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = if scale.is_finite() {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            MIN_SCALE
        };
        self
    }

    /// Set the background colour. Transparent colours are forced opaque.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Color { a: 255, ..color };
        self
    }

    /// Set list normalization options.
    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }

    /// Set the section-content class.
    pub fn with_section_class(mut self, class: impl Into<String>) -> Self {
        self.normalize.section_class = class.into();
        self
    }

    /// Set the page image mode.
    pub fn with_image_mode(mut self, mode: PageImageMode) -> Self {
        self.image_mode = mode;
        self
    }

    /// Set the page image encoding.
    pub fn with_image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = match encoding {
            ImageEncoding::Jpeg { quality } => ImageEncoding::Jpeg {
                quality: quality.clamp(1, 100),
            },
            other => other,
        };
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the directory relative image sources resolve against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Set metadata written to the PDF.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Physical page geometry for the chosen paper and orientation.
    pub fn geometry(&self) -> PageGeometry {
        let (w, h) = self.paper_size.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => PageGeometry::new(w, h),
            Orientation::Landscape => PageGeometry::new(h, w),
        }
    }

    /// Final file name: `requested`, else the configured name, else the default.
    ///
    /// Directory components are stripped and a `.pdf` extension is ensured.
    pub fn resolve_file_name(&self, requested: Option<&str>) -> String {
        let pick = |name: Option<&str>| {
            name.map(str::trim)
                .filter(|n| !n.is_empty())
                .and_then(|n| Path::new(n).file_name())
                .map(|n| n.to_string_lossy().into_owned())
        };
        let name = pick(requested)
            .or_else(|| pick(self.file_name.as_deref()))
            .or_else(|| pick(Some(&self.default_file_name)))
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        if name.to_ascii_lowercase().ends_with(".pdf") {
            name
        } else {
            format!("{}.pdf", name)
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            file_name: None,
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            scale: MIN_SCALE,
            background: Color::WHITE,
            normalize: NormalizeOptions::default(),
            image_mode: PageImageMode::Shared,
            image_encoding: ImageEncoding::Flate,
            compress: true,
            parallel: true,
            base_dir: None,
            metadata: Metadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_options_builder() {
        let options = ExportOptions::new()
            .with_paper_size(PaperSize::Letter)
            .with_orientation(Orientation::Landscape)
            .with_scale(3.0)
            .sequential();

        assert_eq!(options.paper_size, PaperSize::Letter);
        assert_eq!(options.scale, 3.0);
        assert!(!options.parallel);
        let geometry = options.geometry();
        assert_eq!(geometry.width_mm, 279.4);
        assert_eq!(geometry.height_mm, 215.9);
    }

    #[test]
    fn test_default_options() {
        let options = ExportOptions::default();
        assert_eq!(options.paper_size, PaperSize::A4);
        assert_eq!(options.geometry(), PageGeometry::new(210.0, 297.0));
        assert_eq!(options.scale, 2.0);
        assert_eq!(options.background, Color::WHITE);
    }

    #[test]
    fn test_scale_clamped() {
        assert_eq!(ExportOptions::new().with_scale(1.0).scale, MIN_SCALE);
        assert_eq!(ExportOptions::new().with_scale(50.0).scale, MAX_SCALE);
        assert_eq!(ExportOptions::new().with_scale(f32::NAN).scale, MIN_SCALE);
    }

    #[test]
    fn test_paper_size_parse() {
        assert_eq!("A4".parse::<PaperSize>().unwrap(), PaperSize::A4);
        assert_eq!(" letter ".parse::<PaperSize>().unwrap(), PaperSize::Letter);
        assert!(matches!(
            "tabloid".parse::<PaperSize>(),
            Err(Error::InvalidOption(_))
        ));
    }

    #[test]
    fn test_resolve_file_name() {
        let options = ExportOptions::new();
        assert_eq!(options.resolve_file_name(None), "resume.pdf");
        assert_eq!(options.resolve_file_name(Some("   ")), "resume.pdf");
        assert_eq!(options.resolve_file_name(Some("jane-cv")), "jane-cv.pdf");
        assert_eq!(options.resolve_file_name(Some("../etc/cv.PDF")), "cv.PDF");

        let options = ExportOptions::new().with_default_file_name("document.pdf");
        assert_eq!(options.resolve_file_name(Some("")), "document.pdf");
    }

    #[test]
    fn test_background_forced_opaque() {
        let options = ExportOptions::new().with_background(Color::TRANSPARENT);
        assert_eq!(options.background.a, 255);
    }
}
