//! Pagination of a full-height bitmap into fixed-size physical pages.
//!
//! The bitmap is scaled so its width matches the page width; its height in
//! the same physical unit is then cut into consecutive page-sized windows.
//! Page `n` shows the image drawn at a vertical offset of minus the height
//! already consumed by pages `0..n`, clipped to the page frame.

use crate::error::{Error, Result};
use crate::model::PX_PER_MM;
use serde::Serialize;

/// Points per millimetre (72 pt per inch).
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Heights below this many millimetres do not start a new page.
const EPSILON_MM: f64 = 1e-6;

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Page width
    pub width_mm: f64,
    /// Page height
    pub height_mm: f64,
}

impl PageGeometry {
    /// Geometry from explicit dimensions.
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }

    /// ISO A4 portrait.
    pub fn a4() -> Self {
        Self::new(210.0, 297.0)
    }

    /// Width in CSS pixels.
    pub fn width_px(&self) -> f32 {
        (self.width_mm * PX_PER_MM as f64) as f32
    }

    /// Height in CSS pixels.
    pub fn height_px(&self) -> f32 {
        (self.height_mm * PX_PER_MM as f64) as f32
    }

    /// Width in PDF points.
    pub fn width_pt(&self) -> f64 {
        self.width_mm * PT_PER_MM
    }

    /// Height in PDF points.
    pub fn height_pt(&self) -> f64 {
        self.height_mm * PT_PER_MM
    }

    fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width_mm) && ok(self.height_mm) {
            Ok(())
        } else {
            Err(Error::InvalidOption(format!(
                "page geometry must be positive, got {} x {} mm",
                self.width_mm, self.height_mm
            )))
        }
    }
}

/// One physical page's window onto the full bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageDescriptor {
    /// Zero-based page index
    pub index: usize,

    /// Vertical draw offset of the full image in mm (0 for the first page, negative after)
    pub offset_mm: f64,

    /// Height of content visible on this page in mm, never more than the page height
    pub height_mm: f64,

    /// First bitmap row shown on this page
    pub source_top_px: u32,

    /// Number of bitmap rows shown on this page
    pub source_height_px: u32,
}

/// The complete page plan for one bitmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    /// Page geometry the plan was computed for
    pub geometry: PageGeometry,

    /// Bitmap width in pixels
    pub bitmap_width: u32,

    /// Bitmap height in pixels
    pub bitmap_height: u32,

    /// Image height scaled to the page width, in mm
    pub image_height_mm: f64,

    /// Pages in order
    pub pages: Vec<PageDescriptor>,
}

impl PageLayout {
    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bitmap pixels per physical millimetre.
    pub fn px_per_mm(&self) -> f64 {
        self.bitmap_width as f64 / self.geometry.width_mm
    }
}

/// Number of pages needed for `image_height_mm` of content.
///
/// Equal to `ceil(image / page)`, never less than one.
pub fn page_count_for(image_height_mm: f64, page_height_mm: f64) -> usize {
    if page_height_mm <= 0.0 || image_height_mm <= page_height_mm {
        return 1;
    }
    ((image_height_mm - EPSILON_MM) / page_height_mm).ceil().max(1.0) as usize
}

/// Compute the page plan for a bitmap of the given pixel size.
///
/// # Example
///
/// ```
/// use resume_export::paginate::{paginate, PageGeometry};
///
/// let layout = paginate(1000, 4000, PageGeometry::a4()).unwrap();
/// assert_eq!(layout.image_height_mm, 840.0);
/// assert_eq!(layout.page_count(), 3);
/// ```
pub fn paginate(bitmap_width: u32, bitmap_height: u32, geometry: PageGeometry) -> Result<PageLayout> {
    geometry.validate()?;
    if bitmap_width == 0 || bitmap_height == 0 {
        return Err(Error::RasterizationFailed(format!(
            "cannot paginate an empty {}x{} bitmap",
            bitmap_width, bitmap_height
        )));
    }

    let image_height_mm = bitmap_height as f64 * geometry.width_mm / bitmap_width as f64;
    let page_height = geometry.height_mm;
    let px_per_mm = bitmap_width as f64 / geometry.width_mm;

    let descriptor = |index: usize, consumed: f64| {
        let height_mm = (image_height_mm - consumed).min(page_height).max(0.0);
        let top = ((consumed * px_per_mm).round() as u32).min(bitmap_height - 1);
        let bottom = (((consumed + height_mm) * px_per_mm).round() as u32).min(bitmap_height);
        PageDescriptor {
            index,
            offset_mm: -consumed,
            height_mm,
            source_top_px: top,
            source_height_px: bottom.saturating_sub(top).max(1),
        }
    };

    let mut pages = vec![descriptor(0, 0.0)];
    let mut remaining = image_height_mm - page_height;
    while remaining > EPSILON_MM {
        let position = remaining - image_height_mm;
        pages.push(descriptor(pages.len(), -position));
        remaining -= page_height;
    }

    log::debug!(
        "Paginated {}x{} px bitmap ({:.1} mm) into {} page(s) of {:.1} mm",
        bitmap_width,
        bitmap_height,
        image_height_mm,
        pages.len(),
        page_height
    );

    Ok(PageLayout {
        geometry,
        bitmap_width,
        bitmap_height,
        image_height_mm,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worked_example_three_pages() {
        let layout = paginate(1000, 4000, PageGeometry::a4()).unwrap();
        assert_eq!(layout.image_height_mm, 840.0);
        assert_eq!(layout.page_count(), 3);

        let offsets: Vec<f64> = layout.pages.iter().map(|p| p.offset_mm).collect();
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] + 297.0).abs() < 1e-9);
        assert!((offsets[2] + 594.0).abs() < 1e-9);

        let last = layout.pages[2];
        assert!((last.height_mm - 246.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_page_no_blank_extra() {
        let layout = paginate(1000, 1000, PageGeometry::a4()).unwrap();
        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.pages[0].offset_mm, 0.0);
        assert_eq!(layout.pages[0].source_height_px, 1000);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        // 210 mm wide, 594 mm tall => exactly two A4 pages.
        let layout = paginate(210, 594, PageGeometry::a4()).unwrap();
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.pages[1].height_mm, 297.0);
    }

    #[test]
    fn test_page_count_matches_ceiling() {
        let geometry = PageGeometry::a4();
        for height in [1u32, 500, 1414, 1415, 2828, 2829, 4000, 10_000, 33_333] {
            let layout = paginate(1000, height, geometry).unwrap();
            let expected = page_count_for(layout.image_height_mm, geometry.height_mm);
            assert_eq!(layout.page_count(), expected, "height {}", height);
            let naive = (layout.image_height_mm / geometry.height_mm).ceil().max(1.0) as usize;
            assert_eq!(layout.page_count(), naive, "height {}", height);
        }
    }

    #[test]
    fn test_slices_cover_bitmap() {
        let layout = paginate(800, 3000, PageGeometry::a4()).unwrap();
        let mut next_top = 0;
        for page in &layout.pages {
            assert_eq!(page.source_top_px, next_top);
            assert!(page.height_mm > 0.0 && page.height_mm <= 297.0);
            next_top = page.source_top_px + page.source_height_px;
        }
        assert_eq!(next_top, 3000);
    }

    #[test]
    fn test_empty_bitmap_rejected() {
        assert!(matches!(
            paginate(0, 100, PageGeometry::a4()),
            Err(Error::RasterizationFailed(_))
        ));
        assert!(matches!(
            paginate(100, 100, PageGeometry::new(0.0, 297.0)),
            Err(Error::InvalidOption(_))
        ));
    }
}
