//! Node-level types of the virtual document.

use super::Style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a node inside a [`super::VirtualDocument`].
///
/// Handles are never reused: once a node is removed, its handle stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node slot in the document arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Element or text payload
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Parent handle, if attached to one.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Element payload, if this is an element.
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Text payload, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An element with tag, attributes and style
    Element(Element),
    /// A run of character data
    Text(String),
}

/// Tags that never have children.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "meta", "link", "input", "wbr", "col", "source"];

/// Tags laid out as blocks unless styled otherwise.
const BLOCK_TAGS: &[&str] = &[
    "body", "div", "p", "section", "article", "header", "footer", "main", "aside", "nav", "h1",
    "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "tr", "blockquote", "pre", "hr",
    "address", "figure", "dl", "dt", "dd", "form",
];

/// Tags whose content never renders.
const HIDDEN_TAGS: &[&str] = &["head", "style", "script", "title", "meta", "link", "template"];

/// An element node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lower-case tag name
    pub tag: String,
    /// Attributes other than `style`
    pub attributes: BTreeMap<String, String>,
    /// Inline style
    pub style: Style,
}

impl Element {
    /// Create an element with a lower-cased tag name.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style style setter.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute. A `style` attribute is parsed into the style map.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "style" {
            self.style.merge(&Style::parse(&value));
        } else {
            self.attributes.insert(name, value);
        }
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Check for a class name.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Check whether the tag never has children.
    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }

    /// Check whether the tag defaults to block layout.
    pub fn is_block_level(&self) -> bool {
        BLOCK_TAGS.contains(&self.tag.as_str())
    }

    /// Check whether the tag never renders.
    pub fn is_hidden_tag(&self) -> bool {
        HIDDEN_TAGS.contains(&self.tag.as_str())
    }

    /// Check for a `ul` or `ol` container.
    pub fn is_list(&self) -> bool {
        self.tag == "ul" || self.tag == "ol"
    }
}

/// Serializable tree form of a subtree, used for JSON input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeTree {
    /// Character data
    Text {
        /// The text
        text: String,
    },
    /// An element and its children
    Element {
        /// Tag name
        tag: String,
        /// Attributes (a `style` entry is parsed into the style map)
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        /// Inline style declarations
        #[serde(default, skip_serializing_if = "Style::is_empty")]
        style: Style,
        /// Child nodes
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeTree>,
    },
}

impl NodeTree {
    /// Shorthand for a text node.
    pub fn text(text: impl Into<String>) -> Self {
        NodeTree::Text { text: text.into() }
    }

    /// Shorthand for an element with children.
    pub fn element(tag: &str, children: Vec<NodeTree>) -> Self {
        NodeTree::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            style: Style::new(),
            children,
        }
    }

    /// Add an attribute to an element tree; text trees are returned unchanged.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let NodeTree::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.to_string());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_classes() {
        let el = Element::new("DIV").with_attr("class", "section  section-content");
        assert_eq!(el.tag, "div");
        assert!(el.has_class("section-content"));
        assert!(!el.has_class("section-con"));
        assert!(el.is_block_level());
    }

    #[test]
    fn test_style_attribute_goes_to_style_map() {
        let el = Element::new("p").with_attr("style", "margin: 0; color: red");
        assert!(el.attr("style").is_none());
        assert_eq!(el.style.get("color"), Some("red"));
    }

    #[test]
    fn test_node_tree_json() {
        let json = r#"{"tag":"ul","children":[{"tag":"li","children":[{"text":"Rust"}]}]}"#;
        let tree: NodeTree = serde_json::from_str(json).unwrap();
        match &tree {
            NodeTree::Element { tag, children, .. } => {
                assert_eq!(tag, "ul");
                assert_eq!(children.len(), 1);
            }
            NodeTree::Text { .. } => panic!("expected element"),
        }
        let back = serde_json::to_string(&tree).unwrap();
        assert_eq!(back, json);
    }
}
