//! Document-level types.

use super::{Element, Node, NodeId, NodeKind, NodeTree};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An owned visual tree standing in for a live page.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. The root is a
/// `body` element; a node is *attached* when it is reachable from the root.
#[derive(Debug, Clone)]
pub struct VirtualDocument {
    nodes: Vec<Option<Node>>,
    root: NodeId,

    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,
}

impl VirtualDocument {
    /// Create a new document holding only an empty `body`.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Element(Element::new("body"))))],
            root: NodeId(0),
            metadata: Metadata::default(),
        }
    }

    /// Build a document whose body contains the given tree.
    ///
    /// A tree rooted at `body` becomes the body itself.
    pub fn from_tree(tree: &NodeTree) -> Result<Self> {
        let mut doc = Self::new();
        match tree {
            NodeTree::Element {
                tag,
                attrs,
                style,
                children,
            } if tag.eq_ignore_ascii_case("body") => {
                let root = doc.root;
                if let Some(body) = doc.element_mut(root) {
                    for (k, v) in attrs {
                        body.set_attr(k, v.clone());
                    }
                    body.style.merge(style);
                }
                for child in children {
                    doc.append_tree(root, child)?;
                }
            }
            other => {
                let root = doc.root;
                doc.append_tree(root, other)?;
            }
        }
        Ok(doc)
    }

    /// The `body` root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Get a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Check whether a handle refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Get an element payload.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::as_element)
    }

    /// Get a mutable element payload.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Get a text payload.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::as_text)
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node (empty for dead handles and text nodes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Check for at least one element child.
    pub fn has_element_children(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|c| self.element(*c).is_some())
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert_node(Node::new(NodeKind::Element(Element::new(tag))))
    }

    /// Create a detached element from a prepared payload.
    pub fn create_element_with(&mut self, element: Element) -> NodeId {
        self.insert_node(Node::new(NodeKind::Element(element)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.insert_node(Node::new(NodeKind::Text(text.into())))
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        self.detach(child);
        if let Some(p) = self.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Insert `child` under `parent` immediately before `reference`.
    ///
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let Some(p) = self.get_mut(parent) else {
            return Err(Error::InvalidTree(format!("parent {} is gone", parent)));
        };
        match p.children.iter().position(|c| *c == reference) {
            Some(pos) => p.children.insert(pos, child),
            None => p.children.push(child),
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.element(parent).is_none() {
            return Err(Error::InvalidTree(format!(
                "{} is not a live element",
                parent
            )));
        }
        if !self.contains(child) {
            return Err(Error::InvalidTree(format!("{} is not a live node", child)));
        }
        if child == self.root {
            return Err(Error::InvalidTree("the root cannot be moved".into()));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::InvalidTree(format!(
                "{} would become its own ancestor",
                child
            )));
        }
        Ok(())
    }

    /// Put `replacements` where `old` is, then remove `old` and its subtree.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> Result<()> {
        let parent = self
            .parent(old)
            .ok_or_else(|| Error::InvalidTree(format!("{} has no parent", old)))?;
        for r in replacements {
            self.insert_before(parent, *r, old)?;
        }
        self.remove(old);
        Ok(())
    }

    /// Detach a node from its parent, keeping it alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.get_mut(id) {
            n.parent = None;
        }
    }

    /// Detach a node and free it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        for node in self.descendants(id) {
            if let Some(slot) = self.nodes.get_mut(node.0) {
                *slot = None;
            }
        }
    }

    /// Detach all children of `id` and return them in order.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        for c in &children {
            self.detach(*c);
        }
        children
    }

    /// Copy a subtree into fresh, detached nodes.
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        let kind = node.kind.clone();
        let children = node.children.clone();
        let copy = self.insert_node(Node::new(kind));
        for child in children {
            if let Some(c) = self.deep_clone(child) {
                if let Some(n) = self.get_mut(copy) {
                    n.children.push(c);
                }
                if let Some(n) = self.get_mut(c) {
                    n.parent = Some(copy);
                }
            }
        }
        Some(copy)
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Check whether a node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// The node and all of its descendants in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if !self.contains(n) {
                continue;
            }
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes (`""` when there is none).
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// First attached element matching `pred`, in document order.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.element(*n).is_some_and(&pred))
    }

    /// All attached elements matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(&pred))
            .collect()
    }

    /// First element with the given `id` attribute.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.find(|el| el.id() == Some(id))
    }

    /// First element carrying the given class.
    pub fn find_by_class(&self, class: &str) -> Option<NodeId> {
        self.find(|el| el.has_class(class))
    }

    /// Resolve a simple selector: `#id`, `.class` or a tag name.
    pub fn select(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            self.find_by_id(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            self.find_by_class(class)
        } else if selector.is_empty() {
            None
        } else {
            let tag = selector.to_ascii_lowercase();
            self.find(|el| el.tag == tag)
        }
    }

    /// Build a subtree from its tree form and append it under `parent`.
    pub fn append_tree(&mut self, parent: NodeId, tree: &NodeTree) -> Result<NodeId> {
        let id = match tree {
            NodeTree::Text { text } => self.create_text(text.clone()),
            NodeTree::Element {
                tag,
                attrs,
                style,
                children,
            } => {
                let mut el = Element::new(tag);
                for (k, v) in attrs {
                    el.set_attr(k, v.clone());
                }
                el.style.merge(style);
                let id = self.create_element_with(el);
                for child in children {
                    self.append_tree(id, child)?;
                }
                id
            }
        };
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Tree form of a subtree.
    pub fn to_tree(&self, id: NodeId) -> Option<NodeTree> {
        match &self.get(id)?.kind {
            NodeKind::Text(text) => Some(NodeTree::Text { text: text.clone() }),
            NodeKind::Element(el) => Some(NodeTree::Element {
                tag: el.tag.clone(),
                attrs: el.attributes.clone(),
                style: el.style.clone(),
                children: self
                    .children(id)
                    .iter()
                    .filter_map(|c| self.to_tree(*c))
                    .collect(),
            }),
        }
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Document metadata carried into the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Create metadata with a title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Fill every unset field from `other`.
    pub fn merge_missing(&mut self, other: &Metadata) {
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }
        fill(&mut self.title, &other.title);
        fill(&mut self.author, &other.author);
        fill(&mut self.subject, &other.subject);
        fill(&mut self.keywords, &other.keywords);
        fill(&mut self.creator, &other.creator);
        fill(&mut self.producer, &other.producer);
        fill(&mut self.created, &other.created);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (VirtualDocument, NodeId, NodeId) {
        let mut doc = VirtualDocument::new();
        let root = doc.root();
        let list = doc.create_element("ul");
        doc.append_child(root, list).unwrap();
        let item = doc.create_element("li");
        doc.append_child(list, item).unwrap();
        let text = doc.create_text("Rust");
        doc.append_child(item, text).unwrap();
        (doc, list, item)
    }

    #[test]
    fn test_document_new() {
        let doc = VirtualDocument::new();
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.element(doc.root()).unwrap().tag, "body");
    }

    #[test]
    fn test_attach_and_text_content() {
        let (doc, list, item) = sample();
        assert!(doc.is_attached(item));
        assert_eq!(doc.text_content(list), "Rust");
        assert_eq!(doc.parent(item), Some(list));
    }

    #[test]
    fn test_remove_frees_subtree() {
        let (mut doc, list, item) = sample();
        doc.remove(list);
        assert!(!doc.contains(list));
        assert!(!doc.contains(item));
        assert_eq!(doc.node_count(), 1);
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let (mut doc, list, _) = sample();
        let copy = doc.deep_clone(list).unwrap();
        assert!(!doc.is_attached(copy));
        assert_eq!(doc.text_content(copy), "Rust");
        assert_eq!(doc.to_tree(copy), doc.to_tree(list));
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut doc, list, item) = sample();
        let err = doc.append_child(item, list).unwrap_err();
        assert!(matches!(err, Error::InvalidTree(_)));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let (mut doc, list, _) = sample();
        let root = doc.root();
        let after = doc.create_element("p");
        doc.append_child(root, after).unwrap();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.replace_with(list, &[a, b]).unwrap();
        assert_eq!(doc.children(root), &[a, b, after]);
    }

    #[test]
    fn test_select() {
        let tree = NodeTree::element(
            "div",
            vec![NodeTree::element("section", vec![]).attr("class", "section-content")],
        )
        .attr("id", "resume");
        let doc = VirtualDocument::from_tree(&tree).unwrap();
        assert!(doc.select("#resume").is_some());
        assert!(doc.select(".section-content").is_some());
        assert!(doc.select("section").is_some());
        assert!(doc.select("#missing").is_none());
    }

    #[test]
    fn test_metadata_merge_missing() {
        let mut meta = Metadata::with_title("Resume");
        let other = Metadata {
            title: Some("Ignored".into()),
            author: Some("A. Candidate".into()),
            ..Default::default()
        };
        meta.merge_missing(&other);
        assert_eq!(meta.title.as_deref(), Some("Resume"));
        assert_eq!(meta.author.as_deref(), Some("A. Candidate"));
    }
}
