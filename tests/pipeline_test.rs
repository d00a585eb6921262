//! Integration tests for the individual pipeline stages.

use resume_export::detect::detect_source_format_from_path;
use resume_export::error::ErrorKind;
use resume_export::paginate::page_count_for;
use resume_export::pdf::{PdfDictionary, PdfObject, PdfWriter};
use resume_export::{
    detect_pdf, detect_source_format, load_file, paginate, parse_html, BoxRasterizer, Color,
    Error, ExportOptions, LoaderRegistry, Orientation, PageGeometry, PaperSize, RasterOptions,
    Rasterizer, SourceFormat,
};
use std::fs;
use tempfile::TempDir;

// ---- loading ----

#[test]
fn test_registry_picks_loader_by_extension() {
    let registry = LoaderRegistry::with_defaults();
    for ext in ["html", "HTM", "xhtml", "json"] {
        assert!(registry.supports(ext), "{}", ext);
    }
    assert!(!registry.supports("docx"));
    assert_eq!(registry.get_by_extension("json").unwrap().name(), "json");
}

#[test]
fn test_load_file_sniffs_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resume.txt");
    fs::write(&path, "\u{feff}  <div id=\"resume\">Jane</div>").unwrap();

    assert_eq!(detect_source_format_from_path(&path).unwrap(), SourceFormat::Html);
    let doc = load_file(&path).unwrap();
    assert!(doc.find_by_id("resume").is_some());
}

#[test]
fn test_load_json_with_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resume.json");
    fs::write(
        &path,
        r#"{"metadata": {"title": "CV"}, "root": {"tag": "div", "attrs": {"id": "resume"}}}"#,
    )
    .unwrap();
    let doc = load_file(&path).unwrap();
    assert_eq!(doc.metadata.title.as_deref(), Some("CV"));
    assert!(doc.find_by_id("resume").is_some());
}

#[test]
fn test_load_errors() {
    assert!(matches!(load_file("/nonexistent/resume.html"), Err(Error::Io(_))));
    assert!(matches!(detect_source_format(b"   "), Err(Error::UnknownFormat)));
    let err = LoaderRegistry::with_defaults()
        .load_bytes(b"{ not json")
        .unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

// ---- pagination ----

#[test]
fn test_page_count_is_ceil_of_height() {
    // width 210 px on A4 makes one pixel one millimetre
    for h in (1..=1500u32).step_by(37).chain([297, 298, 594, 595, 891]) {
        let layout = paginate(210, h, PageGeometry::a4()).unwrap();
        let expected = ((h as f64) / 297.0).ceil().max(1.0) as usize;
        assert_eq!(layout.page_count(), expected, "height {} mm", h);
        assert_eq!(page_count_for(h as f64, 297.0), expected);
    }
}

#[test]
fn test_offsets_step_by_page_height() {
    let layout = paginate(1000, 4000, PageGeometry::a4()).unwrap();
    assert_eq!(layout.image_height_mm, 840.0);
    let offsets: Vec<f64> = layout.pages.iter().map(|p| p.offset_mm).collect();
    assert_eq!(offsets.len(), 3);
    for (i, offset) in offsets.iter().enumerate() {
        assert!((offset + 297.0 * i as f64).abs() < 1e-9, "page {}", i);
    }
    assert!((layout.pages[2].height_mm - 246.0).abs() < 1e-9);
}

#[test]
fn test_page_windows_cover_bitmap() {
    let layout = paginate(1588, 5000, PageGeometry::a4()).unwrap();
    let mut next = 0u32;
    for page in &layout.pages {
        assert!(page.source_top_px.abs_diff(next) <= 1);
        next = page.source_top_px + page.source_height_px;
    }
    assert_eq!(next, 5000);
}

#[test]
fn test_landscape_geometry_pages() {
    let options = ExportOptions::new()
        .with_paper_size(PaperSize::Letter)
        .with_orientation(Orientation::Landscape);
    let geometry = options.geometry();
    assert_eq!(geometry.width_mm, 279.4);
    assert_eq!(geometry.height_mm, 215.9);
    // 279.4 x 500 mm of content
    let layout = paginate(2794, 5000, geometry).unwrap();
    assert_eq!(layout.page_count(), 3);
}

#[test]
fn test_paginate_rejects_bad_input() {
    let err = paginate(0, 100, PageGeometry::a4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RasterizationFailed);
    let err = paginate(100, 100, PageGeometry::new(0.0, 297.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidOption(_)));
}

// ---- rasterization ----

#[test]
fn test_rasterize_size_follows_scale() {
    let doc = parse_html(r#"<div id="cv" style="width: 200px; height: 50px"></div>"#).unwrap();
    let root = doc.find_by_id("cv").unwrap();
    let bitmap = BoxRasterizer::new()
        .rasterize(&doc, root, &RasterOptions::default().with_scale(3.0))
        .unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (600, 150));
    assert_eq!(bitmap.scale(), 3.0);
}

#[test]
fn test_rasterize_paints_background_and_text() {
    let doc = parse_html(r#"<div id="cv" style="width: 200px">Jane Doe</div>"#).unwrap();
    let root = doc.find_by_id("cv").unwrap();
    let mut options = RasterOptions::default();
    options.background = Color::rgb(250, 240, 230);
    let bitmap = BoxRasterizer::new().rasterize(&doc, root, &options).unwrap();

    let pixels = bitmap.pixels();
    assert_eq!(pixels.get_pixel(bitmap.width() - 1, bitmap.height() - 1).0, [250, 240, 230]);
    assert!(pixels.pixels().any(|p| p.0 != [250, 240, 230]));
}

#[test]
fn test_rasterize_rejects_oversized_canvas() {
    let doc = parse_html(r#"<div id="cv" style="width: 100px; height: 20000px"></div>"#).unwrap();
    let root = doc.find_by_id("cv").unwrap();
    let err = BoxRasterizer::new()
        .rasterize(&doc, root, &RasterOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::RasterizationFailed(_)));
}

#[test]
fn test_preview_png() {
    let doc = parse_html(r#"<div id="cv" style="width: 50px">x</div>"#).unwrap();
    let root = doc.find_by_id("cv").unwrap();
    let png = BoxRasterizer::new()
        .rasterize(&doc, root, &RasterOptions::default())
        .unwrap()
        .to_png()
        .unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}

// ---- PDF writer ----

#[test]
fn test_writer_xref_points_at_objects() {
    let mut writer = PdfWriter::new(false);
    let catalog = writer.allocate();
    let pages = writer.allocate();
    writer
        .write_object(
            catalog,
            &PdfObject::Dictionary(
                PdfDictionary::typed("Catalog").with("Pages", PdfObject::reference(pages)),
            ),
        )
        .unwrap();
    writer
        .write_object(
            pages,
            &PdfObject::Dictionary(
                PdfDictionary::typed("Pages")
                    .with("Kids", PdfObject::Array(Vec::new()))
                    .with("Count", PdfObject::Integer(0)),
            ),
        )
        .unwrap();
    let bytes = writer.finish(catalog, None).unwrap();

    assert_eq!(detect_pdf(&bytes).unwrap().version, "1.4");
    assert!(bytes.ends_with(b"%%EOF\n"));

    let position = |needle: &[u8]| bytes.windows(needle.len()).rposition(|w| w == needle);
    let start = position(b"startxref\n").unwrap() + "startxref\n".len();
    let offset: usize = std::str::from_utf8(&bytes[start..])
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .parse()
        .unwrap();
    assert!(bytes[offset..].starts_with(b"xref\n0 3\n"));
    assert!(position(b"/Root 1 0 R").is_some());

    let first = position(b"1 0 obj").unwrap();
    assert!(position(format!("{:010} 00000 n ", first).as_bytes()).is_some());
}

#[test]
fn test_writer_rejects_unwritten_objects() {
    let mut writer = PdfWriter::new(true);
    let catalog = writer.allocate();
    let _orphan = writer.allocate();
    writer
        .write_object(catalog, &PdfObject::Dictionary(PdfDictionary::typed("Catalog")))
        .unwrap();
    let err = writer.finish(catalog, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncodingFailed);
}
