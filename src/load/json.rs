//! JSON tree loader and writer.

use crate::error::{Error, Result};
use crate::model::{Metadata, NodeId, NodeTree, VirtualDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::DocumentLoader;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Accepted JSON shapes: a bare node tree, or a tree plus metadata.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonSource {
    Wrapped {
        #[serde(default)]
        metadata: Metadata,
        root: NodeTree,
    },
    Bare(NodeTree),
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: &'a Metadata,
    root: NodeTree,
}

/// Parse a JSON document tree.
pub fn parse_json(data: &[u8]) -> Result<VirtualDocument> {
    let source: JsonSource = serde_json::from_slice(data)?;
    match source {
        JsonSource::Wrapped { metadata, root } => {
            let mut doc = VirtualDocument::from_tree(&root)?;
            doc.metadata = metadata;
            Ok(doc)
        }
        JsonSource::Bare(root) => VirtualDocument::from_tree(&root),
    }
}

/// Serialize a subtree (with the document metadata) to JSON.
pub fn to_json(doc: &VirtualDocument, node: NodeId, format: JsonFormat) -> Result<String> {
    let root = doc
        .to_tree(node)
        .ok_or_else(|| Error::InvalidTree(format!("{} is not a live node", node)))?;
    let output = JsonOutput {
        metadata: &doc.metadata,
        root,
    };
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&output)?,
        JsonFormat::Compact => serde_json::to_string(&output)?,
    };
    Ok(json)
}

/// Loader for `.json` document trees.
#[derive(Debug, Clone, Default)]
pub struct JsonLoader {
    _private: (),
}

impl JsonLoader {
    /// Create a new JSON loader.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentLoader for JsonLoader {
    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, path: &Path) -> Result<VirtualDocument> {
        let data = std::fs::read(path)?;
        self.load_bytes(&data)
    }

    fn load_bytes(&self, bytes: &[u8]) -> Result<VirtualDocument> {
        parse_json(bytes)
    }
}
