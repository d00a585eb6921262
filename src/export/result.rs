//! Export report and page plan.

use super::normalize::NormalizeReport;
use crate::paginate::{PageDescriptor, PageLayout};
use serde::Serialize;
use std::time::Duration;

/// Summary of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Final file name
    pub file_name: String,

    /// Where the sink stored the artifact
    pub location: String,

    /// Number of pages written
    pub page_count: usize,

    /// Bitmap width in device pixels
    pub bitmap_width: u32,

    /// Bitmap height in device pixels
    pub bitmap_height: u32,

    /// Oversampling factor used for rasterization
    pub scale: f32,

    /// Physical height of the bitmap at page width, in millimetres
    pub image_height_mm: f64,

    /// Per-page placement
    pub pages: Vec<PageDescriptor>,

    /// What the list normalizer changed
    pub normalize: NormalizeReport,

    /// Images left out of the bitmap
    pub skipped_images: usize,

    /// Size of the PDF in bytes
    pub byte_size: usize,

    /// Wall time of the whole export
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ExportReport {
    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// Check if every image made it into the bitmap.
    pub fn is_complete(&self) -> bool {
        self.skipped_images == 0
    }
}

/// Pagination of a rendered snapshot, computed without encoding a PDF.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    /// Page layout of the bitmap
    pub layout: PageLayout,

    /// What the list normalizer changed
    pub normalize: NormalizeReport,

    /// Images left out of the bitmap
    pub skipped_images: usize,
}

impl ExportPlan {
    /// Number of pages an export would produce.
    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::{paginate, PageGeometry};

    #[test]
    fn test_report_serializes_elapsed_as_millis() {
        let layout = paginate(1000, 4000, PageGeometry::a4()).unwrap();
        let report = ExportReport {
            file_name: "resume.pdf".into(),
            location: "memory:resume.pdf".into(),
            page_count: layout.page_count(),
            bitmap_width: 1000,
            bitmap_height: 4000,
            scale: 2.0,
            image_height_mm: layout.image_height_mm,
            pages: layout.pages.clone(),
            normalize: NormalizeReport::default(),
            skipped_images: 0,
            byte_size: 1234,
            elapsed: Duration::from_millis(42),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], 42);
        assert_eq!(json["page_count"], 3);
        assert_eq!(json["pages"].as_array().unwrap().len(), 3);
        assert!(report.is_complete());
    }
}
