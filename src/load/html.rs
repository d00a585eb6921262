//! Lenient HTML subset loader.
//!
//! Understands what a rendered resume fragment needs: elements with quoted,
//! unquoted or bare attributes, inline `style` attributes, void elements,
//! comments, doctype, character references, and the implied end tags of
//! `li` and `p`. `script` and `style` contents are dropped; `title` and a
//! few `meta` tags feed the document metadata. Text is stored as written so
//! line-leading markers survive until normalization.

use crate::error::{Error, Result};
use crate::model::{Element, NodeId, VirtualDocument};
use std::path::Path;

use super::DocumentLoader;

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "title", "textarea"];

/// Containers in which whitespace-only text carries no meaning.
const WHITESPACE_INSENSITIVE: &[&str] = &["body", "ul", "ol", "table", "tbody", "thead", "tr", "dl"];

/// Parse an HTML string into a virtual document.
pub fn parse_html(source: &str) -> Result<VirtualDocument> {
    HtmlParser::new(source).run()
}

struct HtmlParser<'a> {
    src: &'a str,
    pos: usize,
    doc: VirtualDocument,
    stack: Vec<NodeId>,
}

impl<'a> HtmlParser<'a> {
    fn new(src: &'a str) -> Self {
        let doc = VirtualDocument::new();
        let root = doc.root();
        Self {
            src,
            pos: 0,
            doc,
            stack: vec![root],
        }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn run(mut self) -> Result<VirtualDocument> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or_else(|| Error::Parse(format!("unterminated comment at byte {}", self.pos)))?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest.find('>').unwrap_or(rest.len() - 1);
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                self.end_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag()?;
            } else {
                let end = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| *c == '<')
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let text = &rest[..end];
                self.pos += end;
                self.text(text)?;
            }
        }
        Ok(self.doc)
    }

    /// Text keeps its line structure; layout collapses whitespace runs.
    fn text(&mut self, raw: &str) -> Result<()> {
        let parent = self.current();
        let mut text = decode_entities(raw);
        if text.is_empty() {
            return Ok(());
        }
        if text.chars().all(|c| c.is_ascii_whitespace()) && !self.in_pre() {
            let insensitive = self
                .doc
                .element(parent)
                .is_some_and(|el| WHITESPACE_INSENSITIVE.contains(&el.tag.as_str()));
            if insensitive || self.doc.children(parent).is_empty() {
                return Ok(());
            }
            text = " ".to_string();
        }
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node)
    }

    fn in_pre(&self) -> bool {
        self.stack
            .iter()
            .any(|id| self.doc.element(*id).is_some_and(|el| el.tag == "pre"))
    }

    fn end_tag(&mut self) -> Result<()> {
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| Error::Parse(format!("unterminated end tag at byte {}", self.pos)))?;
        let name = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;
        if let Some(depth) = self
            .stack
            .iter()
            .rposition(|id| self.doc.element(*id).is_some_and(|el| el.tag == name))
        {
            // The body root stays on the stack.
            self.stack.truncate(depth.max(1));
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<()> {
        let (element, self_closing) = self.read_tag()?;
        let tag = element.tag.clone();

        match tag.as_str() {
            "html" | "head" => return Ok(()),
            "body" => {
                let root = self.doc.root();
                if let Some(body) = self.doc.element_mut(root) {
                    for (k, v) in &element.attributes {
                        body.attributes.insert(k.clone(), v.clone());
                    }
                    body.style.merge(&element.style);
                }
                return Ok(());
            }
            "meta" => {
                self.read_meta(&element);
                return Ok(());
            }
            "link" => return Ok(()),
            _ => {}
        }

        if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_closing {
            let content = self.raw_text(&tag);
            match tag.as_str() {
                "title" => {
                    let title = collapse_whitespace(&decode_entities(&content)).trim().to_string();
                    if !title.is_empty() {
                        self.doc.metadata.title = Some(title);
                    }
                }
                "textarea" => {
                    let id = self.doc.create_element_with(element);
                    let parent = self.current();
                    self.doc.append_child(parent, id)?;
                    let text = self.doc.create_text(decode_entities(&content));
                    self.doc.append_child(id, text)?;
                }
                _ => {}
            }
            return Ok(());
        }

        self.close_implied(&tag);

        let is_void = element.is_void();
        let id = self.doc.create_element_with(element);
        let parent = self.current();
        self.doc.append_child(parent, id)?;
        if !is_void && !self_closing {
            self.stack.push(id);
        }
        Ok(())
    }

    /// Pop elements whose end tag is implied by the opening of `tag`.
    fn close_implied(&mut self, tag: &str) {
        let top_tag = |p: &Self| {
            p.doc
                .element(p.current())
                .map(|el| el.tag.clone())
                .unwrap_or_default()
        };
        if tag == "li" {
            // Close an open item of the nearest list.
            let found = self.stack.iter().rposition(|id| {
                self.doc
                    .element(*id)
                    .is_some_and(|el| el.tag == "li" || el.is_list())
            });
            if let Some(depth) = found {
                if self.doc.element(self.stack[depth]).is_some_and(|el| el.tag == "li") {
                    self.stack.truncate(depth.max(1));
                }
            }
        } else if Element::new(tag).is_block_level() && top_tag(self) == "p" {
            self.stack.pop();
        }
    }

    fn read_meta(&mut self, element: &Element) {
        let (Some(name), Some(content)) = (element.attr("name"), element.attr("content")) else {
            return;
        };
        let content = content.trim().to_string();
        match name.to_ascii_lowercase().as_str() {
            "author" => self.doc.metadata.author = Some(content),
            "description" => self.doc.metadata.subject = Some(content),
            "keywords" => self.doc.metadata.keywords = Some(content),
            "generator" => self.doc.metadata.creator = Some(content),
            _ => {}
        }
    }

    /// Consume raw text up to `</tag` and the end tag itself.
    fn raw_text(&mut self, tag: &str) -> String {
        let rest = self.rest();
        let needle = format!("</{}", tag);
        let lower = rest.to_ascii_lowercase();
        match lower.find(&needle) {
            Some(start) => {
                let content = rest[..start].to_string();
                let after = rest[start..].find('>').map(|i| start + i + 1).unwrap_or(rest.len());
                self.pos += after;
                content
            }
            None => {
                self.pos = self.src.len();
                rest.to_string()
            }
        }
    }

    /// Read `<name attr=value ...>` and report whether it was self-closing.
    fn read_tag(&mut self) -> Result<(Element, bool)> {
        let start = self.pos;
        self.pos += 1;
        let name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let mut element = Element::new(name);
        let mut self_closing = false;

        loop {
            self.take_while(char::is_whitespace);
            let rest = self.rest();
            if rest.is_empty() {
                return Err(Error::Parse(format!("unterminated tag at byte {}", start)));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_name = self
                .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
                .to_string();
            self.take_while(char::is_whitespace);
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.take_while(char::is_whitespace);
                self.attribute_value()
            } else {
                String::new()
            };
            if !attr_name.is_empty() {
                element.set_attr(&attr_name, decode_entities(&value));
            }
        }
        Ok((element, self_closing))
    }

    fn attribute_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(q).unwrap_or(body.len());
                self.pos += 1 + end + usize::from(end < body.len());
                body[..end].to_string()
            }
            _ => self
                .take_while(|c| !c.is_whitespace() && c != '>')
                .to_string(),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }
}

/// Collapse whitespace runs to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        // U+00A0 is deliberately not collapsed.
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Decode named and numeric character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_reference(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "bull" => '•',
        "middot" => '·',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "copy" => '©',
        "reg" => '®',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        _ => return None,
    };
    Some(c)
}

/// Loader for `.html` / `.htm` documents.
#[derive(Debug, Clone, Default)]
pub struct HtmlLoader {
    _private: (),
}

impl HtmlLoader {
    /// Create a new HTML loader.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentLoader for HtmlLoader {
    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm", "xhtml"]
    }

    fn name(&self) -> &str {
        "html"
    }

    fn load(&self, path: &Path) -> Result<VirtualDocument> {
        let source = std::fs::read_to_string(path)?;
        parse_html(&source)
    }

    fn load_bytes(&self, bytes: &[u8]) -> Result<VirtualDocument> {
        let source = String::from_utf8_lossy(bytes);
        parse_html(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse_html(
            r#"<!DOCTYPE html><html><head><title>My CV</title></head>
            <body><div id="resume" class="page"><h1>Jane</h1><p>Engineer</p></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("My CV"));
        let resume = doc.find_by_id("resume").unwrap();
        assert_eq!(doc.element_children(resume).len(), 2);
        assert_eq!(doc.text_content(resume), "JaneEngineer");
    }

    #[test]
    fn test_implied_li_end_tags() {
        let doc = parse_html("<ul><li>One<li>Two<li>Three</ul>").unwrap();
        let list = doc.select("ul").unwrap();
        assert_eq!(doc.element_children(list).len(), 3);
    }

    #[test]
    fn test_void_and_self_closing() {
        let doc = parse_html(r#"<p>a<br>b<br/>c<img src="x.png" alt=logo></p>"#).unwrap();
        let p = doc.select("p").unwrap();
        assert_eq!(doc.children(p).len(), 6);
        let img = doc.select("img").unwrap();
        assert_eq!(doc.element(img).unwrap().attr("alt"), Some("logo"));
    }

    #[test]
    fn test_inline_style_and_entities() {
        let doc = parse_html(r#"<p style="color: #333; margin: 0">Tom &amp; Jerry &bull; &#x41;</p>"#)
            .unwrap();
        let p = doc.select("p").unwrap();
        assert_eq!(doc.element(p).unwrap().style.get("color"), Some("#333"));
        assert_eq!(doc.text_content(p), "Tom & Jerry • A");
    }

    #[test]
    fn test_scripts_and_comments_dropped() {
        let doc = parse_html("<div><!-- note --><script>var x = '<p>';</script>ok</div>").unwrap();
        let div = doc.select("div").unwrap();
        assert_eq!(doc.text_content(div), "ok");
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(parse_html("<p><!-- oops"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_meta_author() {
        let doc = parse_html(r#"<head><meta name="author" content="Jane Doe"></head><p>x</p>"#).unwrap();
        assert_eq!(doc.metadata.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_text_keeps_line_breaks() {
        let doc = parse_html("<div>\n  <p id=\"skills\">- Rust\n- Go</p>\n  <b>x</b>\n</div>").unwrap();
        let p = doc.find_by_id("skills").unwrap();
        assert_eq!(doc.text_content(p), "- Rust\n- Go");
        // inter-element whitespace is reduced to one space
        let div = doc.select("div").unwrap();
        let blanks: Vec<&str> = doc
            .children(div)
            .iter()
            .filter_map(|n| doc.text(*n))
            .collect();
        assert_eq!(blanks, vec![" ", " "]);
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_entities("R&D &zz; 5 & 6"), "R&D &zz; 5 & 6");
    }
}
