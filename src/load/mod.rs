//! Source loaders turning files into a [`VirtualDocument`].
//!
//! Loaders are registered by file extension; unknown extensions fall back to
//! content sniffing through [`crate::detect`].
//!
//! # Example
//!
//! ```no_run
//! use resume_export::load::LoaderRegistry;
//! use std::path::Path;
//!
//! fn main() -> resume_export::Result<()> {
//!     let registry = LoaderRegistry::with_defaults();
//!     let doc = registry.load(Path::new("resume.html"))?;
//!     println!("{} nodes", doc.node_count());
//!     Ok(())
//! }
//! ```

mod html;
mod json;

pub use html::{decode_entities, parse_html, HtmlLoader};
pub use json::{parse_json, to_json, JsonFormat, JsonLoader};

use crate::detect::{detect_source_format, SourceFormat};
use crate::error::{Error, Result};
use crate::model::VirtualDocument;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for document loaders.
///
/// Implement this trait to accept a new source format.
pub trait DocumentLoader: Send + Sync {
    /// Lowercase extensions without the leading dot (e.g., `["html"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Name of this loader.
    fn name(&self) -> &str;

    /// Load a file at the given path.
    fn load(&self, path: &Path) -> Result<VirtualDocument>;

    /// Load from bytes.
    fn load_bytes(&self, bytes: &[u8]) -> Result<VirtualDocument>;

    /// Check if this loader handles the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry mapping extensions and names to loaders.
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn DocumentLoader>>,
    by_name: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the HTML and JSON loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HtmlLoader::new()));
        registry.register(Arc::new(JsonLoader::new()));
        registry
    }

    /// Register a loader for all of its extensions.
    pub fn register(&mut self, loader: Arc<dyn DocumentLoader>) {
        for ext in loader.supported_extensions() {
            self.loaders.insert(ext.to_lowercase(), loader.clone());
        }
        self.by_name.insert(loader.name().to_lowercase(), loader);
    }

    /// Get a loader by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentLoader>> {
        self.loaders.get(&ext.to_lowercase()).cloned()
    }

    /// Get a loader by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentLoader>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.loaders.contains_key(&ext.to_lowercase())
    }

    /// Load a file, choosing the loader by extension and then by content.
    pub fn load(&self, path: &Path) -> Result<VirtualDocument> {
        if let Some(loader) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.get_by_extension(ext))
        {
            log::debug!("Loading {} with the {} loader", path.display(), loader.name());
            return loader.load(path);
        }
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes)
    }

    /// Load bytes, choosing the loader by content sniffing.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<VirtualDocument> {
        let name = match detect_source_format(bytes)? {
            SourceFormat::Html => "html",
            SourceFormat::Json => "json",
        };
        let loader = self
            .get_by_name(name)
            .ok_or_else(|| Error::Parse(format!("No loader registered for {}", name)))?;
        loader.load_bytes(bytes)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
