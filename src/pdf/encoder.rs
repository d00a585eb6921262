//! Multi-page PDF assembly from a full-height bitmap and its page plan.

use super::objects::{PdfDictionary, PdfObject};
use super::writer::{deflate, info_dictionary, PdfWriter, PDF_VERSION};
use crate::detect::detect_pdf;
use crate::error::{Error, Result};
use crate::export::{ExportOptions, ImageEncoding, PageImageMode};
use crate::model::Metadata;
use crate::paginate::{PageLayout, PT_PER_MM};
use crate::raster::RasterImage;
use image::{imageops, RgbImage};
use rayon::prelude::*;

/// An image ready to embed as an XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Filter name (`FlateDecode` or `DCTDecode`)
    pub filter: &'static str,
    /// Encoded sample data
    pub data: Vec<u8>,
}

/// Encode RGB pixels for embedding.
pub fn encode_image(pixels: &RgbImage, encoding: ImageEncoding) -> Result<EncodedImage> {
    let (width, height) = pixels.dimensions();
    let (filter, data) = match encoding {
        ImageEncoding::Flate => ("FlateDecode", deflate(pixels.as_raw())?),
        ImageEncoding::Jpeg { quality } => ("DCTDecode", encode_jpeg(pixels, quality)?),
    };
    Ok(EncodedImage {
        width,
        height,
        filter,
        data,
    })
}

#[cfg(feature = "jpeg")]
fn encode_jpeg(pixels: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    use image::codecs::jpeg::JpegEncoder;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(pixels)?;
    Ok(out)
}

#[cfg(not(feature = "jpeg"))]
fn encode_jpeg(_pixels: &RgbImage, _quality: u8) -> Result<Vec<u8>> {
    Err(Error::EncodingFailed(
        "JPEG output requires the `jpeg` feature".to_string(),
    ))
}

/// Builds the final PDF bytes.
#[derive(Debug, Clone)]
pub struct PdfEncoder {
    mode: PageImageMode,
    encoding: ImageEncoding,
    compress: bool,
    parallel: bool,
    metadata: Metadata,
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self {
            mode: PageImageMode::Shared,
            encoding: ImageEncoding::Flate,
            compress: true,
            parallel: true,
            metadata: Metadata::default(),
        }
    }
}

impl PdfEncoder {
    /// Encoder configured from export options.
    pub fn from_options(options: &ExportOptions) -> Self {
        Self {
            mode: options.image_mode,
            encoding: options.image_encoding,
            compress: options.compress,
            parallel: options.parallel,
            metadata: options.metadata.clone(),
        }
    }

    /// Set the page image mode.
    pub fn with_mode(mut self, mode: PageImageMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the image encoding.
    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the Info dictionary metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Assemble the PDF.
    ///
    /// Any failure is reported as [`Error::EncodingFailed`].
    pub fn encode(&self, image: &RasterImage, layout: &PageLayout) -> Result<Vec<u8>> {
        self.encode_inner(image, layout).map_err(|e| match e {
            Error::EncodingFailed(_) => e,
            other => Error::EncodingFailed(other.to_string()),
        })
    }

    fn encode_inner(&self, image: &RasterImage, layout: &PageLayout) -> Result<Vec<u8>> {
        if layout.pages.is_empty() {
            return Err(Error::EncodingFailed("no pages to write".into()));
        }
        if (image.width(), image.height()) != (layout.bitmap_width, layout.bitmap_height) {
            return Err(Error::EncodingFailed(format!(
                "page plan is for {}x{} px but the bitmap is {}x{} px",
                layout.bitmap_width,
                layout.bitmap_height,
                image.width(),
                image.height()
            )));
        }

        let images = self.page_images(image, layout)?;

        let mut w = PdfWriter::new(self.compress);
        let catalog = w.allocate();
        let pages_obj = w.allocate();
        let info = w.allocate();
        let image_objs: Vec<u32> = images.iter().map(|_| w.allocate()).collect();
        let page_objs: Vec<(u32, u32)> = layout
            .pages
            .iter()
            .map(|_| (w.allocate(), w.allocate()))
            .collect();

        w.write_object(
            catalog,
            &PdfDictionary::typed("Catalog")
                .with("Pages", PdfObject::reference(pages_obj))
                .into(),
        )?;
        w.write_object(
            pages_obj,
            &PdfDictionary::typed("Pages")
                .with(
                    "Kids",
                    PdfObject::Array(
                        page_objs
                            .iter()
                            .map(|(p, _)| PdfObject::reference(*p))
                            .collect(),
                    ),
                )
                .with("Count", PdfObject::Integer(page_objs.len() as i64))
                .into(),
        )?;
        w.write_object(info, &info_dictionary(&self.metadata).into())?;

        for (obj, img) in image_objs.iter().zip(&images) {
            let dict = PdfDictionary::typed("XObject")
                .with("Subtype", PdfObject::name("Image"))
                .with("Width", img.width.into())
                .with("Height", img.height.into())
                .with("ColorSpace", PdfObject::name("DeviceRGB"))
                .with("BitsPerComponent", PdfObject::Integer(8))
                .with("Filter", PdfObject::name(img.filter));
            w.write_raw_stream(*obj, dict, &img.data)?;
        }

        let geometry = layout.geometry;
        let page_w = geometry.width_pt();
        let page_h = geometry.height_pt();
        let px_per_mm = layout.px_per_mm();
        for (page, (page_obj, content_obj)) in layout.pages.iter().zip(&page_objs) {
            let (image_obj, draw_h, top_mm) = match self.mode {
                PageImageMode::Shared => (image_objs[0], layout.image_height_mm * PT_PER_MM, page.offset_mm),
                PageImageMode::Sliced => (
                    image_objs[page.index],
                    page.source_height_px as f64 / px_per_mm * PT_PER_MM,
                    0.0,
                ),
            };
            let y = page_h - top_mm * PT_PER_MM - draw_h;
            let content = format!(
                "q\n0 0 {} {} re W n\n{} 0 0 {} 0 {} cm\n/Im0 Do\nQ\n",
                fmt(page_w),
                fmt(page_h),
                fmt(page_w),
                fmt(draw_h),
                fmt(y)
            );
            w.write_stream(*content_obj, PdfDictionary::new(), content.as_bytes())?;

            let resources = PdfDictionary::new().with(
                "XObject",
                PdfDictionary::new()
                    .with("Im0", PdfObject::reference(image_obj))
                    .into(),
            );
            w.write_object(
                *page_obj,
                &PdfDictionary::typed("Page")
                    .with("Parent", PdfObject::reference(pages_obj))
                    .with("MediaBox", PdfObject::rect([0.0, 0.0, page_w, page_h]))
                    .with("Resources", resources.into())
                    .with("Contents", PdfObject::reference(*content_obj))
                    .into(),
            )?;
        }

        let bytes = w.finish(catalog, Some(info))?;
        verify_header(&bytes)?;
        log::debug!(
            "Encoded {} page(s), {} image object(s), {} bytes",
            page_objs.len(),
            images.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn page_images(&self, image: &RasterImage, layout: &PageLayout) -> Result<Vec<EncodedImage>> {
        let pixels = image.pixels();
        match self.mode {
            PageImageMode::Shared => Ok(vec![encode_image(pixels, self.encoding)?]),
            PageImageMode::Sliced => {
                let slice = |page: &crate::paginate::PageDescriptor| {
                    let crop = imageops::crop_imm(
                        pixels,
                        0,
                        page.source_top_px,
                        pixels.width(),
                        page.source_height_px,
                    )
                    .to_image();
                    encode_image(&crop, self.encoding)
                };
                if self.parallel {
                    layout.pages.par_iter().map(slice).collect()
                } else {
                    layout.pages.iter().map(slice).collect()
                }
            }
        }
    }
}

fn fmt(v: f64) -> String {
    super::objects::format_real(v)
}

/// Check that `bytes` start with the header this writer produces.
fn verify_header(bytes: &[u8]) -> Result<()> {
    match detect_pdf(bytes) {
        Ok(format) if format.version == PDF_VERSION => Ok(()),
        Ok(format) => Err(Error::EncodingFailed(format!(
            "wrote PDF {} instead of {}",
            format.version, PDF_VERSION
        ))),
        Err(_) => Err(Error::EncodingFailed("output has no PDF header".into())),
    }
}
