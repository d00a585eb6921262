//! Best-effort loading of `<img>` sources.
//!
//! Local files and `data:` URIs are decoded; remote URLs and anything that
//! fails to decode are skipped with a warning, never failing the export.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where an image source points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Inline `data:` URI
    Data {
        /// Declared media type, possibly empty
        mime: &'a str,
        /// Whether the payload is base64
        base64: bool,
        /// Raw payload after the comma
        payload: &'a str,
    },
    /// `http(s)://` or protocol-relative URL
    Remote(&'a str),
    /// File path, relative or absolute
    File(&'a str),
}

impl<'a> ImageSource<'a> {
    /// Classify an `src` attribute value.
    pub fn parse(src: &'a str) -> Option<Self> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        if let Some(rest) = src.strip_prefix("data:") {
            let (header, payload) = rest.split_once(',')?;
            let base64 = header.ends_with(";base64");
            let mime = header.split(';').next().unwrap_or_default();
            return Some(ImageSource::Data {
                mime,
                base64,
                payload,
            });
        }
        let lower = src.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || src.starts_with("//") {
            return Some(ImageSource::Remote(src));
        }
        Some(ImageSource::File(src.strip_prefix("file://").unwrap_or(src)))
    }
}

/// Decodes and caches images for one rasterization.
#[derive(Debug, Default)]
pub struct ImageLoader {
    base_dir: Option<PathBuf>,
    cache: HashMap<String, Option<Arc<RgbaImage>>>,
}

impl ImageLoader {
    /// Create a loader resolving relative paths against `base_dir`.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
            cache: HashMap::new(),
        }
    }

    /// Load an image, returning `None` when it cannot be read.
    pub fn load(&mut self, src: &str) -> Option<Arc<RgbaImage>> {
        if let Some(cached) = self.cache.get(src) {
            return cached.clone();
        }
        let loaded = self.decode(src).map(Arc::new);
        self.cache.insert(src.to_string(), loaded.clone());
        loaded
    }

    /// Number of distinct sources seen so far.
    pub fn seen(&self) -> usize {
        self.cache.len()
    }

    /// Number of sources that could not be loaded.
    pub fn skipped(&self) -> usize {
        self.cache.values().filter(|v| v.is_none()).count()
    }

    fn decode(&self, src: &str) -> Option<RgbaImage> {
        let bytes = match ImageSource::parse(src)? {
            ImageSource::Remote(url) => {
                log::warn!("Skipping remote image {}", url);
                return None;
            }
            ImageSource::Data {
                base64: false,
                mime,
                ..
            } => {
                log::warn!("Skipping non-base64 data URI ({})", mime);
                return None;
            }
            ImageSource::Data { payload, .. } => {
                let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                match STANDARD.decode(cleaned) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("Skipping data URI with invalid base64: {}", e);
                        return None;
                    }
                }
            }
            ImageSource::File(path) => {
                let path = match &self.base_dir {
                    Some(dir) if Path::new(path).is_relative() => dir.join(path),
                    _ => PathBuf::from(path),
                };
                match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("Skipping image {}: {}", path.display(), e);
                        return None;
                    }
                }
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                log::warn!("Skipping undecodable image: {}", e);
                None
            }
        }
    }
}
