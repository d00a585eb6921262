//! Offscreen snapshot of a live subtree.
//!
//! A [`Snapshot`] deep-copies the source element into a hidden host node
//! attached to the document root. The host is removed when the snapshot is
//! dropped, on success, error and unwind alike.

use crate::error::{Error, Result};
use crate::model::{Element, NodeId, Style, VirtualDocument};
use crate::paginate::PageGeometry;

/// Attribute marking the hidden host of a snapshot.
pub const SNAPSHOT_MARKER: &str = "data-export-snapshot";

/// Attribute marking the cloned subtree inside the host.
pub const SNAPSHOT_ROOT_MARKER: &str = "data-export-clone";

/// Scoped, detached copy of a document subtree.
pub struct Snapshot<'d> {
    doc: &'d mut VirtualDocument,
    host: NodeId,
    root: NodeId,
}

impl<'d> Snapshot<'d> {
    /// Clone `source` into a hidden host sized to `geometry`.
    ///
    /// Fails with [`Error::ContentUnavailable`] when `source` is `None`, no
    /// longer exists or is not attached to the document. Nothing is inserted
    /// in that case.
    pub fn capture(
        doc: &'d mut VirtualDocument,
        source: Option<NodeId>,
        geometry: PageGeometry,
    ) -> Result<Self> {
        let source = source
            .ok_or_else(|| Error::ContentUnavailable("no source element was given".into()))?;
        if !doc.is_attached(source) {
            return Err(Error::ContentUnavailable(format!(
                "source element {} is not attached to the document",
                source
            )));
        }
        if doc.element(source).is_none() {
            return Err(Error::ContentUnavailable(format!(
                "source {} is not an element",
                source
            )));
        }
        if in_snapshot(doc, source) {
            return Err(Error::ContentUnavailable(format!(
                "source {} belongs to another export snapshot",
                source
            )));
        }

        let clone = doc
            .deep_clone(source)
            .ok_or_else(|| Error::ContentUnavailable(format!("could not copy {}", source)))?;
        if let Some(element) = doc.element_mut(clone) {
            element.set_attr(SNAPSHOT_ROOT_MARKER, "true");
            element.style.set("width", format!("{}mm", geometry.width_mm));
            element.style.set("min-height", format!("{}mm", geometry.height_mm));
            element.style.set("margin", "0");
            element.style.set("box-sizing", "border-box");
        }

        let host_style = Style::new()
            .with("position", "absolute")
            .with("left", "-9999px")
            .with("top", "0")
            .with("visibility", "hidden")
            .with("pointer-events", "none");
        let host = doc.create_element_with(
            Element::new("div")
                .with_attr(SNAPSHOT_MARKER, "true")
                .with_attr("aria-hidden", "true")
                .with_style(host_style),
        );

        let root = doc.root();
        let attached = doc
            .append_child(root, host)
            .and_then(|_| doc.append_child(host, clone));
        if let Err(e) = attached {
            doc.remove(host);
            doc.remove(clone);
            return Err(e);
        }

        log::debug!(
            "Captured snapshot {} of {} ({} x {} mm)",
            clone,
            source,
            geometry.width_mm,
            geometry.height_mm
        );
        Ok(Self { doc, host, root: clone })
    }

    /// Root of the cloned subtree.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The hidden host node.
    pub fn host(&self) -> NodeId {
        self.host
    }

    /// Read access to the document holding the snapshot.
    pub fn document(&self) -> &VirtualDocument {
        self.doc
    }

    /// Write access to the document holding the snapshot.
    pub fn document_mut(&mut self) -> &mut VirtualDocument {
        self.doc
    }
}

impl Drop for Snapshot<'_> {
    fn drop(&mut self) {
        self.doc.remove(self.host);
        log::debug!("Removed snapshot host {}", self.host);
    }
}

/// Hidden snapshot hosts currently attached to `doc`.
pub fn snapshot_hosts(doc: &VirtualDocument) -> Vec<NodeId> {
    doc.find_all(|e| e.attr(SNAPSHOT_MARKER).is_some())
}

/// Remove snapshot hosts leaked by an interrupted export.
///
/// Returns the number of hosts removed.
pub fn remove_stale_snapshots(doc: &mut VirtualDocument) -> usize {
    let hosts = snapshot_hosts(doc);
    for host in &hosts {
        log::warn!("Removing stale snapshot host {}", host);
        doc.remove(*host);
    }
    hosts.len()
}

fn in_snapshot(doc: &VirtualDocument, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .any(|n| doc.element(n).is_some_and(|e| e.attr(SNAPSHOT_MARKER).is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::parse_html;

    fn sample() -> VirtualDocument {
        parse_html(r#"<div id="resume"><h1>Jane</h1><ul><li>a</li></ul></div>"#).unwrap()
    }

    #[test]
    fn test_capture_and_drop() {
        let mut doc = sample();
        let source = doc.find_by_id("resume");
        let before = doc.text_content(doc.root());
        {
            let snapshot = Snapshot::capture(&mut doc, source, PageGeometry::a4()).unwrap();
            let root = snapshot.root();
            let doc = snapshot.document();
            assert_eq!(doc.text_content(root), "Janea");
            assert_eq!(doc.parent(root), Some(snapshot.host()));
            assert_eq!(snapshot_hosts(doc).len(), 1);
            let style = &doc.element(root).unwrap().style;
            assert_eq!(style.get("width"), Some("210mm"));
            assert_eq!(style.get("min-height"), Some("297mm"));
        }
        assert!(snapshot_hosts(&doc).is_empty());
        assert_eq!(doc.text_content(doc.root()), before);
    }

    #[test]
    fn test_mutation_does_not_touch_source() {
        let mut doc = sample();
        let source = doc.find_by_id("resume");
        {
            let mut snapshot = Snapshot::capture(&mut doc, source, PageGeometry::a4()).unwrap();
            let root = snapshot.root();
            let doc = snapshot.document_mut();
            for child in doc.take_children(root) {
                doc.remove(child);
            }
        }
        let source = doc.find_by_id("resume").unwrap();
        assert_eq!(doc.text_content(source), "Janea");
    }

    #[test]
    fn test_missing_source() {
        let mut doc = sample();
        let count = doc.node_count();
        assert!(matches!(
            Snapshot::capture(&mut doc, None, PageGeometry::a4()),
            Err(Error::ContentUnavailable(_))
        ));
        assert_eq!(doc.node_count(), count);
        assert!(snapshot_hosts(&doc).is_empty());
    }

    #[test]
    fn test_detached_source() {
        let mut doc = sample();
        let orphan = doc.create_element("div");
        assert!(matches!(
            Snapshot::capture(&mut doc, Some(orphan), PageGeometry::a4()),
            Err(Error::ContentUnavailable(_))
        ));
        assert!(snapshot_hosts(&doc).is_empty());
    }

    #[test]
    fn test_remove_stale_snapshots() {
        let mut doc = sample();
        let source = doc.find_by_id("resume");
        let snapshot = Snapshot::capture(&mut doc, source, PageGeometry::a4()).unwrap();
        std::mem::forget(snapshot);
        assert_eq!(remove_stale_snapshots(&mut doc), 1);
        assert!(snapshot_hosts(&doc).is_empty());
    }
}
