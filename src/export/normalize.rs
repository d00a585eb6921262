//! List normalization.
//!
//! Rasterizers place list markers inconsistently, so lists and bullet-like
//! text are rewritten into explicit marker/content rows before capture:
//!
//! 1. every `ul`/`ol` gets fixed outside-marker styling;
//! 2. lists inside section-content regions are replaced by row blocks;
//! 3. `<br>` inside section-content regions becomes paragraph boundaries;
//! 4. leaf text containing `•` or a line-leading `-` is split into an intro
//!    paragraph plus one row per segment.
//!
//! Rewritten containers carry [`BULLET_LIST_ATTR`] and are never visited
//! again, which makes the whole pass idempotent.

use crate::export::options::NormalizeOptions;
use crate::model::{Element, NodeId, Style, VirtualDocument};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Attribute marking a container already exploded into rows.
pub const BULLET_LIST_ATTR: &str = "data-bullet-list";

/// Attribute marking one marker/content row.
pub const BULLET_ROW_ATTR: &str = "data-bullet-row";

/// Attribute marking a paragraph created from a line break.
pub const BREAK_PARAGRAPH_ATTR: &str = "data-break-paragraph";

/// Counts of what a normalization pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Lists whose marker styling was forced
    pub lists_styled: usize,
    /// Lists replaced by row blocks
    pub lists_replaced: usize,
    /// Text elements split on bullet delimiters
    pub text_blocks_split: usize,
    /// Line breaks turned into paragraph boundaries
    pub breaks_replaced: usize,
    /// Marker/content rows created
    pub rows_created: usize,
}

impl NormalizeReport {
    /// Check whether the pass changed the structure.
    pub fn is_structural_noop(&self) -> bool {
        self.lists_replaced == 0 && self.text_blocks_split == 0 && self.breaks_replaced == 0
    }
}

/// `•` anywhere, or `-` followed by blanks at the start of a line.
///
/// Hyphenated words are safe, but a line that starts with `- ` or a negative
/// number written as `- 5` will be split.
fn bullet_delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)•|^[ \t]*-[ \t]+").unwrap())
}

/// Check whether text contains a bullet delimiter.
pub fn has_bullet_delimiter(text: &str) -> bool {
    bullet_delimiter().is_match(text)
}

/// Split text into the intro before the first delimiter and the trimmed,
/// non-empty segments after each delimiter.
pub fn split_bullets(text: &str) -> (String, Vec<String>) {
    let mut parts = bullet_delimiter().split(text);
    let intro = parts.next().unwrap_or_default().trim().to_string();
    let items = parts
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (intro, items)
}

/// Normalize every list and bullet-like block below `root`.
///
/// Never fails: malformed or empty content is left as it is.
pub fn normalize(
    doc: &mut VirtualDocument,
    root: NodeId,
    options: &NormalizeOptions,
) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    if doc.element(root).is_none() {
        log::warn!("Normalization root {} is not an element, skipping", root);
        return report;
    }

    force_list_styles(doc, root, options, &mut report);

    for region in section_regions(doc, root, &options.section_class) {
        replace_section_lists(doc, region, options, &mut report);
        replace_line_breaks(doc, region, options, &mut report);
    }

    split_bullet_text(doc, root, options, &mut report);

    log::debug!(
        "Normalized {}: {} lists styled, {} replaced, {} text blocks split, {} breaks, {} rows",
        root,
        report.lists_styled,
        report.lists_replaced,
        report.text_blocks_split,
        report.breaks_replaced,
        report.rows_created
    );
    report
}

fn force_list_styles(
    doc: &mut VirtualDocument,
    root: NodeId,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) {
    for id in doc.descendants(root) {
        let Some(el) = doc.element_mut(id) else {
            continue;
        };
        if !el.is_list() {
            continue;
        }
        el.style.set("list-style-position", "outside");
        el.style.set("padding-left", px(options.list_padding_px));
        el.style.set("margin-left", "0");
        report.lists_styled += 1;
    }
}

/// Section-content elements, outermost only, in document order.
fn section_regions(doc: &VirtualDocument, root: NodeId, class: &str) -> Vec<NodeId> {
    if class.is_empty() {
        return Vec::new();
    }
    let is_region = |id: NodeId| doc.element(id).is_some_and(|e| e.has_class(class));
    doc.descendants(root)
        .into_iter()
        .filter(|id| is_region(*id))
        .filter(|id| {
            !doc.ancestors(*id)
                .take_while(|a| *a != root)
                .any(&is_region)
                && (*id == root || !is_region(root))
        })
        .collect()
}

fn replace_section_lists(
    doc: &mut VirtualDocument,
    region: NodeId,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) {
    let lists: Vec<NodeId> = doc
        .descendants(region)
        .into_iter()
        .filter(|id| doc.element(*id).is_some_and(Element::is_list))
        .collect();

    for list in lists {
        // Nested lists move with their item content and are visited later.
        if !doc.contains(list) || doc.parent(list).is_none() {
            continue;
        }
        let Some(list_el) = doc.element(list) else {
            continue;
        };
        let ordered = list_el.tag == "ol";
        let start = list_el
            .attr("start")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let items: Vec<NodeId> = doc
            .element_children(list)
            .into_iter()
            .filter(|c| doc.element(*c).is_some_and(|e| e.tag == "li"))
            .collect();

        let container = doc.create_element_with(
            Element::new("div")
                .with_attr(BULLET_LIST_ATTR, if ordered { "ol" } else { "ul" })
                .with_style(Style::new().with("display", "block").with("margin", "0")),
        );

        for (n, item) in items.into_iter().enumerate() {
            let marker = if ordered {
                format!("{}.", start + n as i64)
            } else {
                options.bullet.to_string()
            };
            let item_style = doc.element(item).map(|e| e.style.clone()).unwrap_or_default();
            let children = doc.take_children(item);
            let row = build_row(doc, &marker, options, &item_style);
            let content = row.1;
            for child in children {
                if doc.append_child(content, child).is_err() {
                    log::warn!("Dropped list content {} that could not be moved", child);
                }
            }
            append_or_discard(doc, container, row.0);
            report.rows_created += 1;
        }

        if doc.replace_with(list, &[container]).is_ok() {
            report.lists_replaced += 1;
        } else {
            doc.remove(container);
        }
    }
}

fn replace_line_breaks(
    doc: &mut VirtualDocument,
    region: NodeId,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) {
    let mut parents: Vec<NodeId> = Vec::new();
    for id in doc.descendants(region) {
        if doc.element(id).is_some_and(|e| e.tag == "br") {
            if let Some(p) = doc.parent(id) {
                if !parents.contains(&p) {
                    parents.push(p);
                }
            }
        }
    }

    for parent in parents {
        let children = doc.take_children(parent);
        let mut segments: Vec<Vec<NodeId>> = vec![Vec::new()];
        for child in children {
            if doc.element(child).is_some_and(|e| e.tag == "br") {
                doc.remove(child);
                report.breaks_replaced += 1;
                segments.push(Vec::new());
            } else if let Some(last) = segments.last_mut() {
                last.push(child);
            }
        }

        let last = segments.len() - 1;
        for (i, segment) in segments.into_iter().enumerate() {
            let blank = segment
                .iter()
                .all(|n| doc.text(*n).is_some_and(|t| t.trim().is_empty()));
            if blank && (i == 0 || i == last) {
                for n in segment {
                    doc.remove(n);
                }
                continue;
            }
            let paragraph = doc.create_element_with(
                Element::new("p")
                    .with_attr(BREAK_PARAGRAPH_ATTR, "true")
                    .with_style(paragraph_style(options)),
            );
            for n in segment {
                append_or_discard(doc, paragraph, n);
            }
            append_or_discard(doc, parent, paragraph);
        }
    }
}

fn split_bullet_text(
    doc: &mut VirtualDocument,
    root: NodeId,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) {
    let candidates: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|id| *id != root && is_split_candidate(doc, *id, root))
        .collect();

    for id in candidates {
        let text = doc.text_content(id);
        if !has_bullet_delimiter(&text) {
            continue;
        }
        let (intro, items) = split_bullets(&text);
        if items.is_empty() {
            continue;
        }

        for child in doc.take_children(id) {
            doc.remove(child);
        }
        if let Some(el) = doc.element_mut(id) {
            el.set_attr(BULLET_LIST_ATTR, "text");
            el.style.set("display", "block");
        }
        if !intro.is_empty() {
            let paragraph = doc.create_element_with(
                Element::new("p").with_style(paragraph_style(options)),
            );
            let text = doc.create_text(intro);
            append_or_discard(doc, paragraph, text);
            append_or_discard(doc, id, paragraph);
        }
        let bullet = options.bullet.to_string();
        for item in items {
            let (row, content) = build_row(doc, &bullet, options, &Style::new());
            let text = doc.create_text(item);
            append_or_discard(doc, content, text);
            append_or_discard(doc, id, row);
            report.rows_created += 1;
        }
        report.text_blocks_split += 1;
    }
}

/// Leaf elements holding only text, outside lists and existing rows.
fn is_split_candidate(doc: &VirtualDocument, id: NodeId, root: NodeId) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };
    if el.is_list()
        || el.tag == "li"
        || el.tag == "pre"
        || el.is_hidden_tag()
        || el.is_void()
        || el.attr(BULLET_LIST_ATTR).is_some()
        || el.attr(BULLET_ROW_ATTR).is_some()
    {
        return false;
    }
    if doc.has_element_children(id) || doc.children(id).is_empty() {
        return false;
    }
    !doc.ancestors(id).take_while(|a| *a != root).any(|a| {
        doc.element(a).is_some_and(|e| {
            e.is_list()
                || e.tag == "li"
                || e.attr(BULLET_LIST_ATTR).is_some()
                || e.attr(BULLET_ROW_ATTR).is_some()
        })
    })
}

/// Build a detached row; returns `(row, content cell)`.
fn build_row(
    doc: &mut VirtualDocument,
    marker: &str,
    options: &NormalizeOptions,
    content_style: &Style,
) -> (NodeId, NodeId) {
    let row = doc.create_element_with(
        Element::new("div").with_attr(BULLET_ROW_ATTR, "true").with_style(
            Style::new()
                .with("display", "flex")
                .with("align-items", "flex-start")
                .with("break-inside", "avoid")
                .with("page-break-inside", "avoid")
                .with("margin", format!("0 0 {} 0", px(options.row_spacing_px))),
        ),
    );
    let marker_cell = doc.create_element_with(
        Element::new("span").with_attr("data-bullet-marker", "true").with_style(
            Style::new()
                .with("display", "block")
                .with("flex", "none")
                .with("width", px(options.marker_width_px))
                .with("white-space", "nowrap"),
        ),
    );
    let glyph = doc.create_text(marker);
    append_or_discard(doc, marker_cell, glyph);

    let mut style = content_style.clone();
    style.remove("display");
    style.remove("list-style-type");
    style.set("display", "block");
    style.set("flex", "1");
    style.set("min-width", "0");
    style.set("white-space", "normal");
    style.set("overflow-wrap", "break-word");
    let content = doc.create_element_with(
        Element::new("div")
            .with_attr("data-bullet-content", "true")
            .with_style(style),
    );

    append_or_discard(doc, row, marker_cell);
    append_or_discard(doc, row, content);
    (row, content)
}

fn paragraph_style(options: &NormalizeOptions) -> Style {
    Style::new().with("margin", format!("0 0 {} 0", px(options.paragraph_spacing_px)))
}

fn append_or_discard(doc: &mut VirtualDocument, parent: NodeId, child: NodeId) {
    if let Err(e) = doc.append_child(parent, child) {
        log::warn!("Discarding {} during normalization: {}", child, e);
        doc.remove(child);
    }
}

fn px(v: f32) -> String {
    format!("{}px", v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::parse_html;

    fn rows(doc: &VirtualDocument, under: NodeId) -> Vec<NodeId> {
        doc.descendants(under)
            .into_iter()
            .filter(|n| doc.element(*n).is_some_and(|e| e.attr(BULLET_ROW_ATTR).is_some()))
            .collect()
    }

    fn row_texts(doc: &VirtualDocument, under: NodeId) -> Vec<(String, String)> {
        rows(doc, under)
            .into_iter()
            .map(|r| {
                let cells = doc.element_children(r);
                (doc.text_content(cells[0]), doc.text_content(cells[1]))
            })
            .collect()
    }

    fn normalized(html: &str) -> (VirtualDocument, NodeId, NormalizeReport) {
        let mut doc = parse_html(html).unwrap();
        let root = doc.root();
        let report = normalize(&mut doc, root, &NormalizeOptions::default());
        (doc, root, report)
    }

    #[test]
    fn test_split_bullets() {
        let (intro, items) = split_bullets("Intro text • Point A • Point B");
        assert_eq!(intro, "Intro text");
        assert_eq!(items, vec!["Point A", "Point B"]);

        let (intro, items) = split_bullets("- one\n- two");
        assert_eq!(intro, "");
        assert_eq!(items, vec!["one", "two"]);
    }

    #[test]
    fn test_hyphenated_words_not_split() {
        assert!(!has_bullet_delimiter("state-of-the-art tooling"));
        assert!(!has_bullet_delimiter("Reduced latency by -40%"));
        assert!(has_bullet_delimiter("Skills\n- Rust"));
    }

    #[test]
    fn test_section_list_rows_in_order() {
        let (doc, root, report) = normalized(
            r#"<div class="section-content"><ul><li>First</li><li>Second</li><li>Third</li></ul></div>"#,
        );
        assert_eq!(report.lists_replaced, 1);
        assert_eq!(report.rows_created, 3);
        assert!(doc.find(|e| e.tag == "ul").is_none());
        assert_eq!(
            row_texts(&doc, root),
            vec![
                ("•".to_string(), "First".to_string()),
                ("•".to_string(), "Second".to_string()),
                ("•".to_string(), "Third".to_string()),
            ]
        );
        let row = rows(&doc, root)[0];
        let style = &doc.element(row).unwrap().style;
        assert_eq!(style.get("display"), Some("flex"));
        assert_eq!(style.get("break-inside"), Some("avoid"));
    }

    #[test]
    fn test_ordered_list_honours_start() {
        let (doc, root, _) = normalized(
            r#"<div class="section-content"><ol start="3"><li>c</li><li>d</li></ol></div>"#,
        );
        let markers: Vec<String> = row_texts(&doc, root).into_iter().map(|r| r.0).collect();
        assert_eq!(markers, vec!["3.", "4."]);
    }

    #[test]
    fn test_empty_list_emits_no_rows() {
        let (doc, root, report) = normalized(r#"<div class="section-content"><ul></ul></div>"#);
        assert_eq!(report.lists_replaced, 1);
        assert_eq!(report.rows_created, 0);
        assert!(rows(&doc, root).is_empty());
    }

    #[test]
    fn test_list_outside_section_keeps_structure() {
        let (doc, _, report) = normalized(r#"<div><ul><li>a</li><li>b</li></ul></div>"#);
        assert_eq!(report.lists_replaced, 0);
        let ul = doc.find(|e| e.tag == "ul").unwrap();
        let style = &doc.element(ul).unwrap().style;
        assert_eq!(style.get("list-style-position"), Some("outside"));
        assert_eq!(style.get("padding-left"), Some("20px"));
        assert_eq!(style.get("margin-left"), Some("0"));
    }

    #[test]
    fn test_bullet_text_split() {
        let (doc, _, report) = normalized(r#"<div><p id="x">Intro text • Point A • Point B</p></div>"#);
        assert_eq!(report.text_blocks_split, 1);
        let p = doc.find_by_id("x").unwrap();
        let children = doc.element_children(p);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.text_content(children[0]), "Intro text");
        assert_eq!(
            row_texts(&doc, p),
            vec![
                ("•".to_string(), "Point A".to_string()),
                ("•".to_string(), "Point B".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_breaks_become_paragraphs() {
        let (doc, _, report) =
            normalized(r#"<div class="section-content"><div id="d">one<br>two<br/>three</div></div>"#);
        assert_eq!(report.breaks_replaced, 2);
        assert!(doc.find(|e| e.tag == "br").is_none());
        let d = doc.find_by_id("d").unwrap();
        let paragraphs: Vec<String> = doc
            .element_children(d)
            .into_iter()
            .map(|p| doc.text_content(p))
            .collect();
        assert_eq!(paragraphs, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let html = r#"<div class="section-content">
            <ul><li>A • nested</li><li>B</li></ul>
            <p>Lead • x • y</p>
            <div>l1<br>l2</div>
        </div>"#;
        let mut doc = parse_html(html).unwrap();
        let root = doc.root();
        let options = NormalizeOptions::default();
        normalize(&mut doc, root, &options);
        let once = doc.to_tree(root);
        let second = normalize(&mut doc, root, &options);
        assert!(second.is_structural_noop());
        assert_eq!(second.rows_created, 0);
        assert_eq!(doc.to_tree(root), once);
    }

    #[test]
    fn test_non_element_root_is_ignored() {
        let mut doc = VirtualDocument::new();
        let text = doc.create_text("• a • b");
        let report = normalize(&mut doc, text, &NormalizeOptions::default());
        assert_eq!(report, NormalizeReport::default());
    }
}
