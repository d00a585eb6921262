//! Rasterization of a document subtree into a single full-height bitmap.
//!
//! The [`Rasterizer`] trait is the seam between the export pipeline and the
//! capture backend. [`BoxRasterizer`] is the built-in backend: it lays out
//! the subtree with a small box model, then paints text with a bitmap font.
//!
//! # Example
//!
//! ```
//! use resume_export::load::parse_html;
//! use resume_export::raster::{BoxRasterizer, RasterOptions, Rasterizer};
//!
//! let doc = parse_html(r#"<div id="cv" style="width: 200px">Jane Doe</div>"#).unwrap();
//! let root = doc.find_by_id("cv").unwrap();
//! let bitmap = BoxRasterizer::new()
//!     .rasterize(&doc, root, &RasterOptions::default())
//!     .unwrap();
//! assert_eq!(bitmap.width(), 400);
//! ```

mod font;
mod images;
mod layout;
mod paint;

pub use font::{advance, glyph, text_width};
pub use images::{ImageLoader, ImageSource};
pub use layout::{layout, DisplayItem, DisplayList, Rect};

use crate::error::{Error, Result};
use crate::export::ExportOptions;
use crate::model::{Color, NodeId, VirtualDocument};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Largest canvas side in device pixels.
pub const MAX_CANVAS_SIDE: u32 = 32_767;

/// Largest canvas area in device pixels.
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

/// Options for rasterization.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Device pixels per CSS pixel
    pub scale: f32,

    /// Colour painted under everything
    pub background: Color,

    /// Directory relative image paths resolve against
    pub base_dir: Option<PathBuf>,

    /// Layout width in CSS pixels (defaults to the root's `width`)
    pub width: Option<f32>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: crate::export::MIN_SCALE,
            background: Color::WHITE,
            base_dir: None,
            width: None,
        }
    }
}

impl RasterOptions {
    /// Set the oversampling factor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the layout width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the image base directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

impl From<&ExportOptions> for RasterOptions {
    fn from(options: &ExportOptions) -> Self {
        Self {
            scale: options.scale,
            background: options.background,
            base_dir: options.base_dir.clone(),
            width: Some(options.geometry().width_px()),
        }
    }
}

/// A full-height bitmap of a subtree.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbImage,
    scale: f32,
    skipped_images: usize,
}

impl RasterImage {
    /// Wrap an existing bitmap.
    pub fn new(pixels: RgbImage, scale: f32) -> Self {
        Self {
            pixels,
            scale,
            skipped_images: 0,
        }
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Device pixels per CSS pixel.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Images that could not be included.
    pub fn skipped_images(&self) -> usize {
        self.skipped_images
    }

    /// Borrow the pixels.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Take the pixels.
    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Write as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

/// Turns a subtree into a bitmap.
///
/// Implement this trait to plug in a different capture backend.
pub trait Rasterizer: Send + Sync {
    /// Name of this backend.
    fn name(&self) -> &str;

    /// Capture `root` as one bitmap covering its full height.
    ///
    /// Fails with [`Error::RasterizationFailed`] when no canvas can be
    /// produced (zero size, or beyond the canvas limits).
    fn rasterize(
        &self,
        doc: &VirtualDocument,
        root: NodeId,
        options: &RasterOptions,
    ) -> Result<RasterImage>;
}

/// Check a canvas size against the limits.
pub fn check_canvas_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::RasterizationFailed(format!(
            "source has no visible area ({}x{} px)",
            width, height
        )));
    }
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(Error::RasterizationFailed(format!(
            "canvas {}x{} px exceeds the {} px side limit",
            width, height, MAX_CANVAS_SIDE
        )));
    }
    if width as u64 * height as u64 > MAX_CANVAS_AREA {
        return Err(Error::RasterizationFailed(format!(
            "canvas {}x{} px exceeds the {} px area limit",
            width, height, MAX_CANVAS_AREA
        )));
    }
    Ok(())
}

/// Built-in rasterizer backed by the box layout and bitmap font.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxRasterizer;

impl BoxRasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for BoxRasterizer {
    fn name(&self) -> &str {
        "box"
    }

    fn rasterize(
        &self,
        doc: &VirtualDocument,
        root: NodeId,
        options: &RasterOptions,
    ) -> Result<RasterImage> {
        if !doc.contains(root) {
            return Err(Error::RasterizationFailed(format!("{} does not exist", root)));
        }
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(Error::InvalidOption(format!("invalid scale {}", options.scale)));
        }

        let mut images = ImageLoader::new(options.base_dir.as_deref());
        let list = layout(doc, root, options.width, &mut images);
        // a box exactly one page tall must stay on one page
        let width = (list.width * options.scale).ceil() as u32;
        let height = (list.height * options.scale).round() as u32;
        check_canvas_size(width, height)?;

        let pixels = paint::paint(&list, width, height, options.scale, options.background);
        let skipped = images.skipped();
        if skipped > 0 {
            log::warn!("{} image(s) could not be read and were left out", skipped);
        }
        log::debug!(
            "Rasterized {} into {}x{} px at scale {}",
            root,
            width,
            height,
            options.scale
        );
        Ok(RasterImage {
            pixels,
            scale: options.scale,
            skipped_images: skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::parse_html;

    #[test]
    fn test_rasterize_scales_dimensions() {
        let doc = parse_html(r#"<div id="r" style="width: 100px; height: 50px"></div>"#).unwrap();
        let root = doc.find_by_id("r").unwrap();
        let img = BoxRasterizer::new()
            .rasterize(&doc, root, &RasterOptions::default().with_scale(3.0))
            .unwrap();
        assert_eq!((img.width(), img.height()), (300, 150));
        assert_eq!(img.scale(), 3.0);
    }

    #[test]
    fn test_transparent_source_renders_white() {
        let doc = parse_html(
            r#"<div id="r" style="width: 10px; height: 10px; background: transparent"></div>"#,
        )
        .unwrap();
        let root = doc.find_by_id("r").unwrap();
        let img = BoxRasterizer::new()
            .rasterize(&doc, root, &RasterOptions::default())
            .unwrap();
        assert!(img.pixels().pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_zero_size_fails() {
        let doc = parse_html(r#"<div id="r" style="width: 100px"></div>"#).unwrap();
        let root = doc.find_by_id("r").unwrap();
        let err = BoxRasterizer::new()
            .rasterize(&doc, root, &RasterOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::RasterizationFailed(_)));
    }

    #[test]
    fn test_canvas_limits() {
        assert!(check_canvas_size(100, 100).is_ok());
        assert!(check_canvas_size(32_768, 10).is_err());
        assert!(check_canvas_size(20_000, 20_000).is_err());
        assert!(check_canvas_size(0, 10).is_err());
    }

    #[test]
    fn test_remote_image_is_skipped_not_fatal() {
        let doc = parse_html(
            r#"<div id="r" style="width: 100px">Hi <img src="https://example.com/p.png" width="20" height="20"></div>"#,
        )
        .unwrap();
        let root = doc.find_by_id("r").unwrap();
        let img = BoxRasterizer::new()
            .rasterize(&doc, root, &RasterOptions::default())
            .unwrap();
        assert_eq!(img.skipped_images(), 1);
        assert!(img.height() > 0);
    }

    #[test]
    fn test_png_encoding() {
        let img = RasterImage::new(RgbImage::new(2, 2), 2.0);
        let png = img.to_png().unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
