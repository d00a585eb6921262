//! The export pipeline.
//!
//! [`ExportController::export`] runs, in order:
//!
//! 1. [`Snapshot::capture`]: hidden offscreen copy of the source element;
//! 2. [`normalize`]: lists and bullet text rewritten into marker/content rows;
//! 3. a [`Rasterizer`](crate::raster::Rasterizer): one full-height bitmap;
//! 4. [`paginate`](crate::paginate::paginate): page windows over the bitmap;
//! 5. [`PdfEncoder`](crate::pdf::PdfEncoder): the PDF bytes;
//! 6. a [`FileSink`]: the saved artifact.
//!
//! Failures from any stage are normalized to [`ErrorKind`](crate::ErrorKind)
//! and reported through the controller state; the snapshot is removed on
//! every path.
//!
//! Reflowing the document into paged HTML and printing that is an
//! alternative to the bitmap approach taken here. It is not implemented: the
//! bitmap path gives byte-stable output for a given document.

mod controller;
mod normalize;
mod options;
mod result;
mod sink;
mod snapshot;

pub use controller::{ExportController, ExportEvent, ExportObserver, ExportStage, ExportState};
pub use normalize::{
    has_bullet_delimiter, normalize, split_bullets, NormalizeReport, BREAK_PARAGRAPH_ATTR,
    BULLET_LIST_ATTR, BULLET_ROW_ATTR,
};
pub use options::{
    ExportOptions, ImageEncoding, NormalizeOptions, Orientation, PageImageMode, PaperSize,
    DEFAULT_FILE_NAME, MAX_SCALE, MIN_SCALE,
};
pub use result::{ExportPlan, ExportReport};
pub use sink::{DirectorySink, FileSink, MemorySink};
pub use snapshot::{
    remove_stale_snapshots, snapshot_hosts, Snapshot, SNAPSHOT_MARKER, SNAPSHOT_ROOT_MARKER,
};

use crate::model::{NodeId, VirtualDocument};

/// Selectors tried, in order, when no source selector is given.
pub const DEFAULT_SOURCE_SELECTORS: &[&str] = &["#resume", ".resume", "#resume-preview", "main"];

/// Find the element to export.
///
/// With a selector, only that selector is tried. Without one, the
/// [`DEFAULT_SOURCE_SELECTORS`] are tried and then the first element under
/// the document root.
pub fn locate_source(doc: &VirtualDocument, selector: Option<&str>) -> Option<NodeId> {
    if let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) {
        return doc.select(selector);
    }
    DEFAULT_SOURCE_SELECTORS
        .iter()
        .find_map(|s| doc.select(s))
        .or_else(|| doc.element_children(doc.root()).into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::parse_html;

    #[test]
    fn test_locate_source() {
        let doc = parse_html(r#"<nav>x</nav><div class="resume">cv</div><p id="other">o</p>"#).unwrap();
        let found = locate_source(&doc, None).unwrap();
        assert_eq!(doc.text_content(found), "cv");

        let other = locate_source(&doc, Some("#other")).unwrap();
        assert_eq!(doc.text_content(other), "o");
        assert!(locate_source(&doc, Some("#missing")).is_none());
    }

    #[test]
    fn test_locate_source_falls_back_to_first_element() {
        let doc = parse_html("<section>a</section><section>b</section>").unwrap();
        let found = locate_source(&doc, None).unwrap();
        assert_eq!(doc.text_content(found), "a");
    }
}
