//! Integration tests for list normalization.

use resume_export::export::{
    normalize, NormalizeOptions, BREAK_PARAGRAPH_ATTR, BULLET_LIST_ATTR, BULLET_ROW_ATTR,
};
use resume_export::load::{parse_json, to_json, JsonFormat};
use resume_export::{parse_html, NodeId, VirtualDocument};

fn rows(doc: &VirtualDocument, under: NodeId) -> Vec<NodeId> {
    doc.descendants(under)
        .into_iter()
        .filter(|n| {
            doc.element(*n)
                .is_some_and(|e| e.attr(BULLET_ROW_ATTR).is_some())
        })
        .collect()
}

fn contents(doc: &VirtualDocument, under: NodeId) -> Vec<String> {
    rows(doc, under)
        .into_iter()
        .map(|r| doc.text_content(doc.element_children(r)[1]))
        .collect()
}

fn run(html: &str) -> (VirtualDocument, NodeId) {
    let mut doc = parse_html(html).unwrap();
    let root = doc.root();
    normalize(&mut doc, root, &NormalizeOptions::default());
    (doc, root)
}

#[test]
fn test_n_items_give_n_rows_in_order() {
    for n in [1usize, 2, 5, 12] {
        let items: String = (0..n).map(|i| format!("<li>item {}</li>", i)).collect();
        let (doc, root) = run(&format!(
            r#"<div class="section-content"><ul>{}</ul></div>"#,
            items
        ));
        let expected: Vec<String> = (0..n).map(|i| format!("item {}", i)).collect();
        assert_eq!(contents(&doc, root), expected, "{} items", n);
    }
}

#[test]
fn test_item_markup_survives() {
    let (doc, root) = run(
        r#"<div class="section-content"><ul><li><b>Lead</b> of <a href="x">team</a></li></ul></div>"#,
    );
    let row = rows(&doc, root)[0];
    let content = doc.element_children(row)[1];
    assert_eq!(doc.text_content(content), "Lead of team");
    assert!(doc
        .descendants(content)
        .iter()
        .any(|n| doc.element(*n).is_some_and(|e| e.tag == "b")));
}

#[test]
fn test_nested_section_lists() {
    let (doc, root) = run(
        r#"<div class="section-content"><ul><li>outer<ul><li>inner a</li><li>inner b</li></ul></li></ul></div>"#,
    );
    assert!(doc.find(|e| e.tag == "ul").is_none());
    let texts = contents(&doc, root);
    assert_eq!(texts.len(), 3);
    assert!(texts[0].starts_with("outer"));
    assert_eq!(&texts[1..], &["inner a".to_string(), "inner b".to_string()]);
}

#[test]
fn test_multiple_sections_are_independent() {
    let (doc, root) = run(
        r#"<div class="section-content"><ul><li>a</li></ul></div>
           <div><ul><li>kept</li></ul></div>
           <div class="section-content"><ol><li>b</li><li>c</li></ol></div>"#,
    );
    assert_eq!(contents(&doc, root), vec!["a", "b", "c"]);
    assert_eq!(doc.find_all(|e| e.tag == "ul").len(), 1);
    assert_eq!(doc.find_all(|e| e.attr(BULLET_LIST_ATTR) == Some("ol")).len(), 1);
}

#[test]
fn test_custom_section_class_and_bullet() {
    let mut doc = parse_html(r#"<div class="cv-body"><ul><li>x</li></ul></div>"#).unwrap();
    let root = doc.root();
    let options = NormalizeOptions {
        section_class: "cv-body".into(),
        bullet: '▪',
        ..Default::default()
    };
    let report = normalize(&mut doc, root, &options);
    assert_eq!(report.lists_replaced, 1);
    let row = rows(&doc, root)[0];
    assert_eq!(doc.text_content(doc.element_children(row)[0]), "▪");
}

#[test]
fn test_line_breaks_become_paragraphs() {
    let (doc, _) = run(
        r#"<div class="section-content" id="s">Line one<br>Line two<br><br>Line three<br></div>"#,
    );
    let paragraphs = doc.find_all(|e| e.attr(BREAK_PARAGRAPH_ATTR).is_some());
    let texts: Vec<String> = paragraphs.iter().map(|p| doc.text_content(*p)).collect();
    assert_eq!(texts, vec!["Line one", "Line two", "", "Line three"]);
    assert!(doc.find(|e| e.tag == "br").is_none());
    let style = &doc.element(paragraphs[0]).unwrap().style;
    assert_eq!(style.get("margin"), Some("0 0 8px 0"));
}

#[test]
fn test_line_breaks_outside_sections_are_kept() {
    let (doc, _) = run("<div>a<br>b</div>");
    assert!(doc.find(|e| e.tag == "br").is_some());
}

#[test]
fn test_bullet_text_split_into_intro_and_rows() {
    let (doc, _) = run(r#"<p id="summary">Intro text • Point A • Point B</p>"#);
    let p = doc.find_by_id("summary").unwrap();
    let children = doc.element_children(p);
    assert_eq!(children.len(), 3);
    assert_eq!(doc.text_content(children[0]), "Intro text");
    assert_eq!(contents(&doc, p), vec!["Point A", "Point B"]);
}

#[test]
fn test_dash_lines_in_html_give_one_row_each() {
    let (doc, _) = run("<div><p id=\"skills\">- Rust\n- Go\n- SQL</p></div>");
    let p = doc.find_by_id("skills").unwrap();
    assert_eq!(contents(&doc, p), vec!["Rust", "Go", "SQL"]);
    assert_eq!(doc.element_children(p).len(), 3);
}

#[test]
fn test_dash_lines_in_html_keep_intro() {
    let mut doc = parse_html("<div><p id=\"lead\">Led team\n  - built X\n  - shipped Y\n</p></div>").unwrap();
    let root = doc.root();
    let report = normalize(&mut doc, root, &NormalizeOptions::default());
    assert_eq!(report.text_blocks_split, 1);
    assert_eq!(report.rows_created, 2);
    let p = doc.find_by_id("lead").unwrap();
    assert_eq!(doc.text_content(doc.element_children(p)[0]), "Led team");
    assert_eq!(contents(&doc, p), vec!["built X", "shipped Y"]);
}

#[test]
fn test_dash_lines_split_without_intro() {
    let json = br#"{"tag": "div", "children": [
        {"tag": "div", "attrs": {"id": "skills"}, "children": [{"text": "- Rust\n- Go\n- SQL"}]}
    ]}"#;
    let mut doc = parse_json(json).unwrap();
    let root = doc.root();
    normalize(&mut doc, root, &NormalizeOptions::default());
    let div = doc.find_by_id("skills").unwrap();
    assert_eq!(contents(&doc, div), vec!["Rust", "Go", "SQL"]);
    assert_eq!(doc.element_children(div).len(), 3);
}

#[test]
fn test_elements_with_children_are_not_split() {
    let (doc, root) = run(r#"<p>Intro • <b>bold</b> • tail</p>"#);
    assert!(rows(&doc, root).is_empty());
}

#[test]
fn test_second_pass_is_noop() {
    let html = r#"<div class="section-content">
        <p>Header<br>Sub</p>
        <ul><li>a</li><li>b</li></ul>
        <p>Intro • x • y</p>
      </div>"#;
    let mut doc = parse_html(html).unwrap();
    let root = doc.root();
    let options = NormalizeOptions::default();

    let first = normalize(&mut doc, root, &options);
    assert!(!first.is_structural_noop());
    let snapshot = to_json(&doc, root, JsonFormat::Compact).unwrap();

    let second = normalize(&mut doc, root, &options);
    assert!(second.is_structural_noop());
    assert_eq!(second.rows_created, 0);
    assert_eq!(to_json(&doc, root, JsonFormat::Compact).unwrap(), snapshot);
}

#[test]
fn test_json_tree_input() {
    let json = br#"{
        "tag": "div",
        "attrs": {"class": "section-content"},
        "children": [
            {"tag": "ul", "children": [
                {"tag": "li", "children": [{"text": "from json"}]}
            ]}
        ]
    }"#;
    let mut doc = parse_json(json).unwrap();
    let root = doc.root();
    let report = normalize(&mut doc, root, &NormalizeOptions::default());
    assert_eq!(report.rows_created, 1);
    assert_eq!(contents(&doc, root), vec!["from json"]);
}

#[test]
fn test_empty_and_malformed_content_never_fails() {
    for html in [
        "",
        "<ul></ul>",
        r#"<div class="section-content"></div>"#,
        r#"<div class="section-content"><ul><li></li></ul><br></div>"#,
        "<p>•</p>",
        "<p> - </p>",
    ] {
        let mut doc = parse_html(html).unwrap();
        let root = doc.root();
        normalize(&mut doc, root, &NormalizeOptions::default());
    }
}
