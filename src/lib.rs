//! # resume-export
//!
//! Paginated PDF export of rendered resume documents.
//!
//! A document is loaded into an owned [`VirtualDocument`]; the element to
//! export is copied into a hidden snapshot, its lists are rewritten into
//! explicit marker/content rows, the snapshot is rasterized into one tall
//! bitmap and the bitmap is cut into physical pages of a PDF.
//!
//! ## Quick Start
//!
//! ```no_run
//! use resume_export::{export_file, ExportOptions, PaperSize};
//!
//! fn main() -> resume_export::Result<()> {
//!     let options = ExportOptions::new()
//!         .with_paper_size(PaperSize::Letter)
//!         .with_file_name("jane-doe.pdf");
//!     let report = export_file("resume.html", "./out", &options)?;
//!     println!("{} pages written to {}", report.page_count, report.location);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **List-safe output**: lists and `•`/`-` bullet text become fixed marker/content rows
//! - **Sliding-window pagination**: any paper size, portrait or landscape
//! - **Observable exports**: `Idle → Generating → Done | Failed`, hooks and event channels
//! - **Guaranteed cleanup**: the offscreen snapshot is removed on every exit path
//! - **Pluggable backends**: custom [`Rasterizer`](raster::Rasterizer) and [`FileSink`]

pub mod detect;
pub mod error;
pub mod export;
pub mod load;
pub mod model;
pub mod paginate;
pub mod pdf;
pub mod raster;

// Re-export commonly used types
pub use detect::{detect_pdf, detect_source_format, is_pdf_bytes, PdfFormat, SourceFormat};
pub use error::{Error, ErrorKind, Result};
pub use export::{
    locate_source, DirectorySink, ExportController, ExportEvent, ExportObserver, ExportOptions,
    ExportPlan, ExportReport, ExportStage, ExportState, FileSink, ImageEncoding, MemorySink,
    NormalizeOptions, NormalizeReport, Orientation, PageImageMode, PaperSize,
};
pub use load::{parse_html, parse_json, DocumentLoader, LoaderRegistry};
pub use model::{Color, Element, Metadata, NodeId, NodeTree, Style, VirtualDocument};
pub use paginate::{paginate, PageDescriptor, PageGeometry, PageLayout};
pub use raster::{BoxRasterizer, RasterImage, RasterOptions, Rasterizer};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load an HTML or JSON document from a file.
///
/// # Example
///
/// ```no_run
/// let doc = resume_export::load_file("resume.html").unwrap();
/// println!("{} nodes", doc.node_count());
/// ```
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<VirtualDocument> {
    LoaderRegistry::with_defaults().load(path.as_ref())
}

/// Load an HTML or JSON document from bytes.
pub fn load_bytes(data: &[u8]) -> Result<VirtualDocument> {
    LoaderRegistry::with_defaults().load_bytes(data)
}

/// Export the resume element of a file into `out_dir`.
///
/// The source element is found with [`locate_source`]. Relative image paths
/// resolve against the input file's directory unless the options set one.
pub fn export_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    out_dir: Q,
    options: &ExportOptions,
) -> Result<ExportReport> {
    ResumeExport::with_options(options.clone())
        .with_output_dir(out_dir.as_ref())
        .load(input)?
        .export()
}

/// Export `source` of an in-memory document and return the PDF bytes.
///
/// # Example
///
/// ```
/// use resume_export::{export_to_bytes, is_pdf_bytes, parse_html, ExportOptions};
///
/// let mut doc = parse_html(r#"<div id="resume">Jane Doe</div>"#).unwrap();
/// let source = doc.find_by_id("resume");
/// let pdf = export_to_bytes(&mut doc, source, &ExportOptions::default()).unwrap();
/// assert!(is_pdf_bytes(&pdf));
/// ```
pub fn export_to_bytes(
    doc: &mut VirtualDocument,
    source: Option<NodeId>,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let sink = MemorySink::new();
    ExportController::new(options.clone())
        .with_sink(Arc::new(sink.clone()))
        .export(doc, source, None)?;
    sink.last()
        .map(|(_, bytes)| bytes)
        .ok_or_else(|| Error::Unknown("export produced no file".into()))
}

/// Builder for loading and exporting a resume.
///
/// # Example
///
/// ```no_run
/// use resume_export::{PaperSize, ResumeExport};
///
/// let report = ResumeExport::new()
///     .with_paper_size(PaperSize::A4)
///     .with_target("#resume")
///     .with_output_dir("./out")
///     .with_scale(3.0)
///     .load("resume.html")?
///     .export()?;
/// # Ok::<(), resume_export::Error>(())
/// ```
pub struct ResumeExport {
    options: ExportOptions,
    target: Option<String>,
    output_dir: PathBuf,
}

impl ResumeExport {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::with_options(ExportOptions::default())
    }

    /// Create a builder from existing options.
    pub fn with_options(options: ExportOptions) -> Self {
        Self {
            options,
            target: None,
            output_dir: PathBuf::from("."),
        }
    }

    /// Set the paper size.
    pub fn with_paper_size(mut self, paper: PaperSize) -> Self {
        self.options = self.options.with_paper_size(paper);
        self
    }

    /// Use landscape pages.
    pub fn landscape(mut self) -> Self {
        self.options = self.options.with_orientation(Orientation::Landscape);
        self
    }

    /// Set the oversampling factor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.options = self.options.with_scale(scale);
        self
    }

    /// Set the output file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_file_name(name);
        self
    }

    /// Select the element to export (`#id`, `.class` or tag name).
    pub fn with_target(mut self, selector: impl Into<String>) -> Self {
        self.target = Some(selector.into());
        self
    }

    /// Set the directory the PDF is written to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Embed one crop per page instead of a shared image.
    pub fn sliced(mut self) -> Self {
        self.options = self.options.with_image_mode(PageImageMode::Sliced);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Load a document file.
    pub fn load<P: AsRef<Path>>(mut self, path: P) -> Result<LoadedResume> {
        let path = path.as_ref();
        let document = load_file(path)?;
        if self.options.base_dir.is_none() {
            self.options.base_dir = path.parent().map(Path::to_path_buf);
        }
        Ok(self.into_loaded(document))
    }

    /// Load a document from bytes.
    pub fn load_bytes(self, data: &[u8]) -> Result<LoadedResume> {
        let document = load_bytes(data)?;
        Ok(self.into_loaded(document))
    }

    /// Wrap an already built document.
    pub fn document(self, document: VirtualDocument) -> LoadedResume {
        self.into_loaded(document)
    }

    fn into_loaded(self, document: VirtualDocument) -> LoadedResume {
        LoadedResume {
            document,
            options: self.options,
            target: self.target,
            output_dir: self.output_dir,
        }
    }
}

impl Default for ResumeExport {
    fn default() -> Self {
        Self::new()
    }
}

/// A loaded document ready for export.
pub struct LoadedResume {
    document: VirtualDocument,
    options: ExportOptions,
    target: Option<String>,
    output_dir: PathBuf,
}

impl LoadedResume {
    /// The element that will be exported.
    pub fn source(&self) -> Option<NodeId> {
        locate_source(&self.document, self.target.as_deref())
    }

    /// Export into the output directory.
    pub fn export(&mut self) -> Result<ExportReport> {
        let source = self.source();
        ExportController::new(self.options.clone())
            .with_sink(Arc::new(DirectorySink::new(&self.output_dir)))
            .export(&mut self.document, source, None)
    }

    /// Export and return the PDF bytes.
    pub fn to_pdf_bytes(&mut self) -> Result<Vec<u8>> {
        let source = self.source();
        export_to_bytes(&mut self.document, source, &self.options)
    }

    /// Page plan without encoding.
    pub fn plan(&mut self) -> Result<ExportPlan> {
        let source = self.source();
        ExportController::new(self.options.clone()).plan(&mut self.document, source)
    }

    /// Rasterized preview of the export.
    pub fn preview(&mut self) -> Result<RasterImage> {
        let source = self.source();
        ExportController::new(self.options.clone()).preview(&mut self.document, source)
    }

    /// Get the document.
    pub fn document(&self) -> &VirtualDocument {
        &self.document
    }

    /// Export options in effect.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = r#"<div id="resume"><h1>Jane Doe</h1><p>Engineer</p></div>"#;

    #[test]
    fn test_builder_options() {
        let builder = ResumeExport::new()
            .with_paper_size(PaperSize::Letter)
            .landscape()
            .with_scale(4.0)
            .sliced()
            .sequential()
            .with_target("#resume");
        assert_eq!(builder.options.paper_size, PaperSize::Letter);
        assert_eq!(builder.options.orientation, Orientation::Landscape);
        assert_eq!(builder.options.scale, 4.0);
        assert_eq!(builder.options.image_mode, PageImageMode::Sliced);
        assert!(!builder.options.parallel);
        assert_eq!(builder.target.as_deref(), Some("#resume"));
    }

    #[test]
    fn test_load_bytes_and_export() {
        let mut loaded = ResumeExport::new().load_bytes(RESUME.as_bytes()).unwrap();
        assert!(loaded.source().is_some());
        let pdf = loaded.to_pdf_bytes().unwrap();
        assert_eq!(detect_pdf(&pdf).unwrap().version, "1.4");
    }

    #[test]
    fn test_missing_target_is_content_unavailable() {
        let mut loaded = ResumeExport::new()
            .with_target("#nope")
            .load_bytes(RESUME.as_bytes())
            .unwrap();
        let err = loaded.to_pdf_bytes().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentUnavailable);
    }

    #[test]
    fn test_load_bytes_unknown_format() {
        assert!(matches!(load_bytes(b"plain text"), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_export_file_writes_pdf() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("cv.html");
        std::fs::write(&input, RESUME).unwrap();
        let out = dir.path().join("out");

        let options = ExportOptions::new().with_file_name("jane");
        let report = export_file(&input, &out, &options).unwrap();
        assert_eq!(report.file_name, "jane.pdf");
        let bytes = std::fs::read(out.join("jane.pdf")).unwrap();
        assert_eq!(bytes.len(), report.byte_size);
        assert!(is_pdf_bytes(&bytes));
    }
}
