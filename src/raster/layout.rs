//! Box layout of a document subtree into a display list.
//!
//! Supports the subset of CSS a rendered resume uses: block flow, flex rows,
//! inline text with greedy line breaking, list items with outside markers,
//! inline images, backgrounds and solid borders. All coordinates are CSS
//! pixels relative to the top-left corner of the laid-out root.

use super::font;
use super::images::ImageLoader;
use crate::model::{
    parse_length, Color, Display, NodeId, Sides, Style, TextAlign, VirtualDocument,
    DEFAULT_FONT_SIZE,
};
use image::RgbaImage;
use std::sync::Arc;

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Rectangle from position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn translate(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// One paint operation.
#[derive(Debug, Clone)]
pub enum DisplayItem {
    /// Solid rectangle
    Fill {
        /// Area
        rect: Rect,
        /// Colour, possibly translucent
        color: Color,
    },
    /// A run of text on one line; `y` is the top of the glyph box
    Text {
        /// Left edge
        x: f32,
        /// Top edge
        y: f32,
        /// Characters to draw
        text: String,
        /// Font size in CSS pixels
        font_size: f32,
        /// Ink colour
        color: Color,
        /// Draw with a thickened stroke
        bold: bool,
    },
    /// A decoded image stretched to `rect`
    Image {
        /// Destination
        rect: Rect,
        /// Pixels
        image: Arc<RgbaImage>,
    },
}

impl DisplayItem {
    fn translate(self, dx: f32, dy: f32) -> Self {
        match self {
            DisplayItem::Fill { rect, color } => DisplayItem::Fill {
                rect: rect.translate(dx, dy),
                color,
            },
            DisplayItem::Text {
                x,
                y,
                text,
                font_size,
                color,
                bold,
            } => DisplayItem::Text {
                x: x + dx,
                y: y + dy,
                text,
                font_size,
                color,
                bold,
            },
            DisplayItem::Image { rect, image } => DisplayItem::Image {
                rect: rect.translate(dx, dy),
                image,
            },
        }
    }
}

/// Result of laying out a subtree.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    /// Width of the laid-out root
    pub width: f32,
    /// Full height of the laid-out root
    pub height: f32,
    /// Paint operations, back to front
    pub items: Vec<DisplayItem>,
}

impl DisplayList {
    /// Number of text runs.
    pub fn text_runs(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, DisplayItem::Text { .. }))
            .count()
    }

    /// Concatenated text of all runs in paint order, separated by spaces.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|i| match i {
                DisplayItem::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lay out `root` at the given width.
///
/// A `width` of `None` uses the root's own `width` declaration, falling back
/// to the A4 page width.
pub fn layout(
    doc: &VirtualDocument,
    root: NodeId,
    width: Option<f32>,
    images: &mut ImageLoader,
) -> DisplayList {
    let mut engine = LayoutEngine {
        doc,
        images,
        items: Vec::new(),
    };
    let inherited = Inherited::default();
    let width = width
        .or_else(|| {
            engine
                .computed(root)
                .and_then(|s| s.length("width", DEFAULT_FONT_SIZE, 0.0))
        })
        .unwrap_or(210.0 * crate::model::PX_PER_MM)
        .max(0.0);

    let height = if doc.element(root).is_some() {
        engine.layout_box(root, 0.0, 0.0, width, &inherited, Some(width))
    } else {
        engine.layout_inline(&[root], 0.0, 0.0, width, &inherited)
    };
    log::debug!(
        "Laid out {} at {:.1} x {:.1} px ({} items)",
        root,
        width,
        height,
        engine.items.len()
    );
    DisplayList {
        width,
        height,
        items: engine.items,
    }
}

/// Properties inherited down the tree.
#[derive(Debug, Clone)]
struct Inherited {
    font_size: f32,
    color: Color,
    bold: bool,
    align: TextAlign,
    line_height: f32,
    preserve_whitespace: bool,
    visible: bool,
    uppercase: bool,
    list_style: Option<String>,
}

impl Default for Inherited {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
            bold: false,
            align: TextAlign::Left,
            line_height: 1.2,
            preserve_whitespace: false,
            visible: true,
            uppercase: false,
            list_style: None,
        }
    }
}

impl Inherited {
    fn child(&self, style: &Style) -> Self {
        let mut next = self.clone();
        next.font_size = style.font_size(self.font_size);
        if let Some(c) = style.color("color") {
            next.color = c;
        }
        if let Some(bold) = style.is_bold() {
            next.bold = bold;
        }
        if let Some(align) = style.text_align() {
            next.align = align;
        }
        if let Some(lh) = style.get("line-height") {
            next.line_height = match lh.trim() {
                "normal" => 1.2,
                v => v.parse::<f32>().ok().unwrap_or_else(|| {
                    parse_length(v, next.font_size, next.font_size)
                        .map(|px| px / next.font_size.max(1.0))
                        .unwrap_or(self.line_height)
                }),
            };
        }
        if let Some(ws) = style.get("white-space") {
            next.preserve_whitespace = ws.starts_with("pre") || ws == "break-spaces";
        }
        if let Some(v) = style.get("visibility") {
            next.visible = v != "hidden" && v != "collapse";
        }
        if let Some(t) = style.get("text-transform") {
            next.uppercase = t == "uppercase";
        }
        if let Some(ls) = style.get("list-style-type").or_else(|| style.get("list-style")) {
            next.list_style = Some(ls.to_string());
        }
        next
    }

    fn line_box(&self) -> f32 {
        self.font_size * self.line_height
    }
}

/// Built-in presentation of common tags.
fn user_agent_style(tag: &str) -> Style {
    let css = match tag {
        "h1" => "display: block; font-size: 2em; font-weight: bold; margin: 0.67em 0",
        "h2" => "display: block; font-size: 1.5em; font-weight: bold; margin: 0.83em 0",
        "h3" => "display: block; font-size: 1.17em; font-weight: bold; margin: 1em 0",
        "h4" => "display: block; font-weight: bold; margin: 1.33em 0",
        "h5" => "display: block; font-size: 0.83em; font-weight: bold; margin: 1.67em 0",
        "h6" => "display: block; font-size: 0.67em; font-weight: bold; margin: 2.33em 0",
        "p" | "blockquote" | "figure" => "display: block; margin: 1em 0",
        "ul" | "ol" => "display: block; margin: 1em 0; padding-left: 40px",
        "li" => "display: list-item",
        "pre" => "display: block; white-space: pre; margin: 1em 0",
        "hr" => "display: block; margin: 0.5em 0; border-top: 1px solid #808080",
        "strong" | "b" | "th" | "dt" => "font-weight: bold",
        "small" => "font-size: 0.83em",
        "a" => "color: #0000ee",
        "table" | "tbody" | "thead" | "tfoot" => "display: block",
        "tr" => "display: flex",
        "td" => "display: block; flex: 1; padding: 1px",
        "dd" => "display: block; margin-left: 40px",
        _ => "",
    };
    let mut style = Style::parse(css);
    if tag == "th" {
        style.merge(&Style::parse("display: block; flex: 1; padding: 1px"));
    }
    style
}

enum Fragment {
    Word {
        text: String,
        width: f32,
        font_size: f32,
        color: Color,
        bold: bool,
        line_box: f32,
        visible: bool,
    },
    Space {
        width: f32,
    },
    Break {
        line_box: f32,
    },
    Atomic {
        width: f32,
        height: f32,
        items: Vec<DisplayItem>,
    },
}

struct Line {
    fragments: Vec<(f32, Fragment)>,
    width: f32,
    height: f32,
}

impl Line {
    fn new() -> Self {
        Self {
            fragments: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

struct LayoutEngine<'a> {
    doc: &'a VirtualDocument,
    images: &'a mut ImageLoader,
    items: Vec<DisplayItem>,
}

impl LayoutEngine<'_> {
    fn computed(&self, id: NodeId) -> Option<Style> {
        let el = self.doc.element(id)?;
        let mut style = user_agent_style(&el.tag);
        style.merge(&el.style);
        Some(style)
    }

    fn display_of(&self, id: NodeId) -> Option<Display> {
        let el = self.doc.element(id)?;
        if el.is_hidden_tag() {
            return Some(Display::None);
        }
        let fallback = if el.tag == "img" {
            Display::InlineBlock
        } else if el.is_block_level() {
            Display::Block
        } else {
            Display::Inline
        };
        Some(self.computed(id)?.display(fallback))
    }

    fn is_block_child(&self, id: NodeId) -> bool {
        matches!(
            self.display_of(id),
            Some(Display::Block | Display::Flex | Display::ListItem)
        )
    }

    /// Lay out a block-level box; returns its margin-box height.
    fn layout_box(
        &mut self,
        id: NodeId,
        x: f32,
        y: f32,
        avail: f32,
        parent: &Inherited,
        forced_width: Option<f32>,
    ) -> f32 {
        let Some(style) = self.computed(id) else {
            return 0.0;
        };
        let display = self.display_of(id).unwrap_or(Display::Block);
        if display == Display::None {
            return 0.0;
        }
        let inh = parent.child(&style);
        let fs = inh.font_size;

        let margin = style.sides("margin", fs, avail);
        let padding = style.sides("padding", fs, avail);
        let border = border_sides(&style);
        let chrome = padding.horizontal() + border.horizontal();
        let border_box = style.get("box-sizing") == Some("border-box");

        let mut box_width = match forced_width {
            Some(w) => w - margin.horizontal(),
            None => match style.length("width", fs, avail) {
                Some(w) if border_box => w,
                Some(w) => w + chrome,
                None => avail - margin.horizontal(),
            },
        };
        if let Some(max) = style.length("max-width", fs, avail) {
            box_width = box_width.min(if border_box { max } else { max + chrome });
        }
        let box_width = box_width.max(chrome).max(0.0);

        let content_x = x + margin.left + border.left + padding.left;
        let content_y = y + margin.top + border.top + padding.top;
        let content_width = (box_width - chrome).max(0.0);

        let decoration_index = self.items.len();
        let children: Vec<NodeId> = self.doc.children(id).to_vec();

        let mut content_height = if self.doc.element(id).is_some_and(|e| e.tag == "img") {
            self.place_block_image(id, &style, content_x, content_y, content_width, &inh)
        } else if display == Display::Flex
            && !style
                .get("flex-direction")
                .is_some_and(|d| d.starts_with("column"))
        {
            self.layout_flex(&style, &children, content_x, content_y, content_width, &inh)
        } else {
            self.layout_flow(&children, content_x, content_y, content_width, &inh)
        };

        if display == Display::ListItem {
            self.paint_marker(id, content_x, content_y, &inh);
        }

        let vertical_chrome = padding.vertical() + border.vertical();
        if let Some(h) = style.length("height", fs, 0.0) {
            content_height = if border_box { h - vertical_chrome } else { h };
        }
        if let Some(min) = style.length("min-height", fs, 0.0) {
            let min = if border_box { min - vertical_chrome } else { min };
            content_height = content_height.max(min);
        }
        let content_height = content_height.max(0.0);

        let box_height = content_height + vertical_chrome;
        let border_rect = Rect::new(x + margin.left, y + margin.top, box_width, box_height);
        if inh.visible {
            let decorations = decorations(&style, border_rect, border);
            self.items
                .splice(decoration_index..decoration_index, decorations);
        }

        margin.top + box_height + margin.bottom
    }

    /// Block and inline children stacked vertically; returns content height.
    fn layout_flow(
        &mut self,
        children: &[NodeId],
        x: f32,
        y: f32,
        width: f32,
        inh: &Inherited,
    ) -> f32 {
        let mut cursor = y;
        let mut run: Vec<NodeId> = Vec::new();
        for child in children {
            if self.is_block_child(*child) {
                if !run.is_empty() {
                    cursor += self.layout_inline(&run, x, cursor, width, inh);
                    run.clear();
                }
                cursor += self.layout_box(*child, x, cursor, width, inh, None);
            } else {
                run.push(*child);
            }
        }
        if !run.is_empty() {
            cursor += self.layout_inline(&run, x, cursor, width, inh);
        }
        cursor - y
    }

    /// Horizontal flex row; returns content height.
    fn layout_flex(
        &mut self,
        style: &Style,
        children: &[NodeId],
        x: f32,
        y: f32,
        width: f32,
        inh: &Inherited,
    ) -> f32 {
        let items: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|c| match self.doc.text(*c) {
                Some(t) => !t.trim().is_empty(),
                None => self.display_of(*c) != Some(Display::None),
            })
            .collect();
        if items.is_empty() {
            return 0.0;
        }
        let gap = style
            .length("column-gap", inh.font_size, width)
            .or_else(|| style.length("gap", inh.font_size, width))
            .unwrap_or(0.0);
        let total_gap = gap * (items.len() - 1) as f32;

        let mut bases = Vec::with_capacity(items.len());
        let mut grows = Vec::with_capacity(items.len());
        for item in &items {
            let (grow, basis) = self.flex_factors(*item, width, inh);
            grows.push(grow);
            bases.push(basis);
        }
        let used: f32 = bases.iter().sum::<f32>() + total_gap;
        let free = width - used;
        let grow_total: f32 = grows.iter().sum();
        let widths: Vec<f32> = bases
            .iter()
            .zip(&grows)
            .map(|(b, g)| {
                if free > 0.0 && grow_total > 0.0 {
                    b + free * g / grow_total
                } else if free < 0.0 && used > 0.0 {
                    // shrink proportionally to basis
                    (b + free * b / (used - total_gap).max(1.0)).max(0.0)
                } else {
                    *b
                }
            })
            .collect();

        let justify = style.get("justify-content").unwrap_or("flex-start");
        let slack = (width - widths.iter().sum::<f32>() - total_gap).max(0.0);
        let (mut cursor, extra_gap) = match justify {
            "center" => (x + slack / 2.0, 0.0),
            "flex-end" | "end" | "right" => (x + slack, 0.0),
            "space-between" if items.len() > 1 => (x, slack / (items.len() - 1) as f32),
            _ => (x, 0.0),
        };

        let mut row_height: f32 = 0.0;
        for (item, w) in items.iter().zip(widths) {
            let h = if self.doc.element(*item).is_some() {
                self.layout_box(*item, cursor, y, w, inh, Some(w))
            } else {
                self.layout_inline(&[*item], cursor, y, w, inh)
            };
            row_height = row_height.max(h);
            cursor += w + gap + extra_gap;
        }
        row_height
    }

    /// `(grow, basis)` for a flex item.
    fn flex_factors(&self, item: NodeId, container: f32, inh: &Inherited) -> (f32, f32) {
        let Some(style) = self.computed(item) else {
            return (0.0, self.max_content(item, inh).min(container));
        };
        let fs = style.font_size(inh.font_size);
        let margin = style.sides("margin", fs, container).horizontal();
        let mut grow: f32 = 0.0;
        let mut basis: Option<f32> = None;
        if let Some(flex) = style.get("flex") {
            let parts: Vec<&str> = flex.split_whitespace().collect();
            match parts.as_slice() {
                ["none"] | ["auto"] | ["initial"] => {}
                [g] => {
                    if let Ok(v) = g.parse::<f32>() {
                        grow = v;
                        basis = Some(0.0);
                    } else {
                        basis = parse_length(g, fs, container);
                    }
                }
                [g, _] => grow = g.parse().unwrap_or(0.0),
                [g, _, b, ..] => {
                    grow = g.parse().unwrap_or(0.0);
                    basis = parse_length(b, fs, container);
                }
                [] => {}
            }
        }
        if let Some(g) = style.get("flex-grow").and_then(|g| g.parse::<f32>().ok()) {
            grow = g;
        }
        if let Some(b) = style.length("flex-basis", fs, container) {
            basis = Some(b);
        }
        let chrome = style.sides("padding", fs, container).horizontal()
            + border_sides(&style).horizontal();
        let explicit = style.length("width", fs, container).map(|w| {
            if style.get("box-sizing") == Some("border-box") {
                w
            } else {
                w + chrome
            }
        });
        let basis = match (basis, explicit) {
            (Some(b), _) if grow > 0.0 => b,
            (_, Some(w)) => w,
            (Some(b), None) => b,
            (None, None) if grow > 0.0 => 0.0,
            (None, None) => self.max_content(item, inh).min(container) + chrome,
        };
        (grow.max(0.0), basis.max(0.0) + margin)
    }

    /// Width of a subtree's text laid out on a single line.
    fn max_content(&self, id: NodeId, inh: &Inherited) -> f32 {
        if let Some(text) = self.doc.text(id) {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            return font::text_width(&collapsed, inh.font_size);
        }
        let Some(style) = self.computed(id) else {
            return 0.0;
        };
        let inh = inh.child(&style);
        if let Some(w) = style.length("width", inh.font_size, 0.0) {
            return w;
        }
        let mut width: f32 = 0.0;
        let mut line: f32 = 0.0;
        for child in self.doc.children(id) {
            let w = self.max_content(*child, &inh);
            if self.is_block_child(*child) {
                width = width.max(line).max(w);
                line = 0.0;
            } else {
                line += w;
            }
        }
        width.max(line)
    }

    /// Inline content wrapped into lines; returns content height.
    fn layout_inline(
        &mut self,
        nodes: &[NodeId],
        x: f32,
        y: f32,
        width: f32,
        inh: &Inherited,
    ) -> f32 {
        let mut fragments = Vec::new();
        for node in nodes {
            self.collect_fragments(*node, inh, &mut fragments);
        }
        while matches!(fragments.last(), Some(Fragment::Space { .. })) {
            fragments.pop();
        }
        if fragments.is_empty() {
            return 0.0;
        }

        let lines = break_lines(fragments, width);
        let mut cursor = y;
        for line in lines {
            let offset = match inh.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((width - line.width) / 2.0).max(0.0),
                TextAlign::Right => (width - line.width).max(0.0),
            };
            for (fx, fragment) in line.fragments {
                let left = x + offset + fx;
                match fragment {
                    Fragment::Word {
                        text,
                        font_size,
                        color,
                        bold,
                        line_box,
                        visible,
                        ..
                    } => {
                        if !visible {
                            continue;
                        }
                        let top = cursor + (line.height - line_box)
                            + (line_box - font::glyph_height(font_size)) / 2.0;
                        self.items.push(DisplayItem::Text {
                            x: left,
                            y: top,
                            text,
                            font_size,
                            color,
                            bold,
                        });
                    }
                    Fragment::Atomic { height, items, .. } => {
                        let top = cursor + line.height - height;
                        self.items
                            .extend(items.into_iter().map(|i| i.translate(left, top)));
                    }
                    Fragment::Space { .. } | Fragment::Break { .. } => {}
                }
            }
            cursor += line.height;
        }
        cursor - y
    }

    fn collect_fragments(&mut self, id: NodeId, inh: &Inherited, out: &mut Vec<Fragment>) {
        let doc = self.doc;
        if let Some(text) = doc.text(id) {
            push_text(text, inh, out);
            return;
        }
        let Some(el) = doc.element(id) else {
            return;
        };
        let Some(style) = self.computed(id) else {
            return;
        };
        let display = self.display_of(id).unwrap_or(Display::Inline);
        if display == Display::None {
            return;
        }
        let child_inh = inh.child(&style);
        if el.tag == "br" {
            out.push(Fragment::Break {
                line_box: child_inh.line_box(),
            });
            return;
        }
        if el.tag == "img" || display == Display::InlineBlock {
            if let Some(atomic) = self.layout_atomic(id, &style, inh) {
                out.push(atomic);
            }
            return;
        }
        let block = matches!(display, Display::Block | Display::Flex | Display::ListItem);
        if block {
            out.push(Fragment::Break {
                line_box: 0.0,
            });
        }
        for child in doc.children(id) {
            self.collect_fragments(*child, &child_inh, out);
        }
        if block {
            out.push(Fragment::Break {
                line_box: 0.0,
            });
        }
    }

    /// Lay out an inline-block or image on its own and capture its items.
    fn layout_atomic(&mut self, id: NodeId, style: &Style, inh: &Inherited) -> Option<Fragment> {
        let saved = std::mem::take(&mut self.items);
        let width = match style.length("width", inh.font_size, 0.0) {
            Some(w) => w,
            None if self.doc.element(id).is_some_and(|e| e.tag == "img") => {
                self.image_size(id, style, inh).map(|s| s.0).unwrap_or(0.0)
            }
            None => {
                let fs = style.font_size(inh.font_size);
                self.max_content(id, inh)
                    + style.sides("padding", fs, 0.0).horizontal()
                    + border_sides(style).horizontal()
                    + style.sides("margin", fs, 0.0).horizontal()
            }
        };
        let height = self.layout_box(id, 0.0, 0.0, width, inh, Some(width));
        let items = std::mem::replace(&mut self.items, saved);
        if width <= 0.0 && height <= 0.0 {
            return None;
        }
        Some(Fragment::Atomic {
            width,
            height,
            items,
        })
    }

    fn image_size(&mut self, id: NodeId, style: &Style, inh: &Inherited) -> Option<(f32, f32)> {
        let doc = self.doc;
        let el = doc.element(id)?;
        let attr_len = |name: &str| el.attr(name).and_then(|v| parse_length(v, inh.font_size, 0.0));
        let w = style.length("width", inh.font_size, 0.0).or_else(|| attr_len("width"));
        let h = style.length("height", inh.font_size, 0.0).or_else(|| attr_len("height"));
        let natural = el
            .attr("src")
            .and_then(|src| self.images.load(src))
            .map(|img| (img.width() as f32, img.height() as f32));
        match (w, h, natural) {
            (Some(w), Some(h), _) => Some((w, h)),
            (Some(w), None, Some((nw, nh))) if nw > 0.0 => Some((w, w * nh / nw)),
            (None, Some(h), Some((nw, nh))) if nh > 0.0 => Some((h * nw / nh, h)),
            (None, None, Some(size)) => Some(size),
            (Some(w), None, _) => Some((w, 0.0)),
            (None, Some(h), _) => Some((0.0, h)),
            _ => None,
        }
    }

    /// Paint an `<img>` inside its content box; returns the content height.
    fn place_block_image(
        &mut self,
        id: NodeId,
        style: &Style,
        x: f32,
        y: f32,
        width: f32,
        inh: &Inherited,
    ) -> f32 {
        let Some((w, h)) = self.image_size(id, style, inh) else {
            return 0.0;
        };
        let (w, h) = if w > width && w > 0.0 {
            (width, h * width / w)
        } else {
            (w, h)
        };
        let doc = self.doc;
        let image = doc
            .element(id)
            .and_then(|e| e.attr("src"))
            .and_then(|src| self.images.load(src));
        if let (Some(image), true) = (image, inh.visible) {
            self.items.push(DisplayItem::Image {
                rect: Rect::new(x, y, w, h),
                image,
            });
        }
        h
    }

    fn paint_marker(&mut self, id: NodeId, x: f32, y: f32, inh: &Inherited) {
        let list_style = inh.list_style.as_deref().unwrap_or("");
        if list_style.starts_with("none") || !inh.visible {
            return;
        }
        let doc = self.doc;
        let Some(parent) = doc.parent(id) else {
            return;
        };
        let parent_el = doc.element(parent);
        let ordered = parent_el.is_some_and(|e| e.tag == "ol")
            || list_style.starts_with("decimal");
        let marker = if ordered {
            let start = parent_el
                .and_then(|e| e.attr("start"))
                .and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(1);
            let index = doc
                .element_children(parent)
                .into_iter()
                .filter(|c| doc.element(*c).is_some_and(|e| e.tag == "li"))
                .position(|c| c == id)
                .unwrap_or(0);
            format!("{}.", start + index as i64)
        } else if list_style.starts_with("circle") {
            "◦".to_string()
        } else if list_style.starts_with("square") {
            "▪".to_string()
        } else {
            "•".to_string()
        };
        let fs = inh.font_size;
        let width = font::text_width(&marker, fs);
        let line_box = inh.line_box();
        self.items.push(DisplayItem::Text {
            x: x - width - fs * 0.5,
            y: y + (line_box - font::glyph_height(fs)) / 2.0,
            text: marker,
            font_size: fs,
            color: inh.color,
            bold: inh.bold,
        });
    }
}

fn push_text(text: &str, inh: &Inherited, out: &mut Vec<Fragment>) {
    let text = if inh.uppercase {
        text.to_uppercase()
    } else {
        text.to_string()
    };
    let word = |s: &str| Fragment::Word {
        text: s.to_string(),
        width: font::text_width(s, inh.font_size),
        font_size: inh.font_size,
        color: inh.color,
        bold: inh.bold,
        line_box: inh.line_box(),
        visible: inh.visible,
    };

    if inh.preserve_whitespace {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push(Fragment::Break {
                    line_box: inh.line_box(),
                });
            }
            if !line.is_empty() {
                out.push(word(line));
            }
        }
        return;
    }

    let mut current = String::new();
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !current.is_empty() {
                out.push(word(&current));
                current.clear();
            }
            if !matches!(out.last(), Some(Fragment::Space { .. } | Fragment::Break { .. }) | None) {
                out.push(Fragment::Space {
                    width: font::advance(inh.font_size),
                });
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        out.push(word(&current));
    }
}

fn break_lines(fragments: Vec<Fragment>, width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::new();
    let mut pending_space = 0.0;

    let mut queue: std::collections::VecDeque<Fragment> = fragments.into();
    while let Some(fragment) = queue.pop_front() {
        match fragment {
            Fragment::Space { width: w } => {
                if !line.is_empty() {
                    pending_space = w;
                }
            }
            Fragment::Break { line_box } => {
                if line.is_empty() {
                    line.height = line.height.max(line_box);
                }
                if !line.is_empty() || line_box > 0.0 {
                    lines.push(std::mem::replace(&mut line, Line::new()));
                }
                pending_space = 0.0;
            }
            Fragment::Word {
                text,
                width: w,
                font_size,
                color,
                bold,
                line_box,
                visible,
            } => {
                if !line.is_empty() && line.width + pending_space + w > width {
                    lines.push(std::mem::replace(&mut line, Line::new()));
                    pending_space = 0.0;
                }
                if line.is_empty() && w > width && text.chars().count() > 1 {
                    // overflow-wrap: split the word at the last character that fits
                    let per_char = font::advance(font_size);
                    let fit = ((width / per_char).floor() as usize).max(1);
                    let head: String = text.chars().take(fit).collect();
                    let tail: String = text.chars().skip(fit).collect();
                    queue.push_front(Fragment::Word {
                        width: font::text_width(&tail, font_size),
                        text: tail,
                        font_size,
                        color,
                        bold,
                        line_box,
                        visible,
                    });
                    queue.push_front(Fragment::Break { line_box: 0.0 });
                    queue.push_front(Fragment::Word {
                        width: font::text_width(&head, font_size),
                        text: head,
                        font_size,
                        color,
                        bold,
                        line_box,
                        visible,
                    });
                    continue;
                }
                let fx = line.width + pending_space;
                line.width = fx + w;
                line.height = line.height.max(line_box);
                line.fragments.push((
                    fx,
                    Fragment::Word {
                        text,
                        width: w,
                        font_size,
                        color,
                        bold,
                        line_box,
                        visible,
                    },
                ));
                pending_space = 0.0;
            }
            Fragment::Atomic {
                width: w,
                height,
                items,
            } => {
                if !line.is_empty() && line.width + pending_space + w > width {
                    lines.push(std::mem::replace(&mut line, Line::new()));
                    pending_space = 0.0;
                }
                let fx = line.width + pending_space;
                line.width = fx + w;
                line.height = line.height.max(height);
                line.fragments.push((
                    fx,
                    Fragment::Atomic {
                        width: w,
                        height,
                        items,
                    },
                ));
                pending_space = 0.0;
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn border_sides(style: &Style) -> Sides {
    let width = |side: &str| style.border(side).map(|b| b.width).unwrap_or(0.0);
    Sides::new(width("top"), width("right"), width("bottom"), width("left"))
}

/// Background fill followed by border edges.
fn decorations(style: &Style, rect: Rect, border: Sides) -> Vec<DisplayItem> {
    let mut out = Vec::new();
    let background = style
        .color("background-color")
        .or_else(|| style.get("background").and_then(first_color));
    if let Some(color) = background.filter(|c| !c.is_transparent()) {
        out.push(DisplayItem::Fill { rect, color });
    }
    let edges = [
        ("top", Rect::new(rect.x, rect.y, rect.width, border.top)),
        (
            "bottom",
            Rect::new(rect.x, rect.y + rect.height - border.bottom, rect.width, border.bottom),
        ),
        ("left", Rect::new(rect.x, rect.y, border.left, rect.height)),
        (
            "right",
            Rect::new(rect.x + rect.width - border.right, rect.y, border.right, rect.height),
        ),
    ];
    for (side, edge) in edges {
        if let Some(b) = style.border(side) {
            if edge.width > 0.0 && edge.height > 0.0 && !b.color.is_transparent() {
                out.push(DisplayItem::Fill {
                    rect: edge,
                    color: b.color,
                });
            }
        }
    }
    out
}

fn first_color(value: &str) -> Option<Color> {
    Color::parse(value).or_else(|| value.split_whitespace().find_map(Color::parse))
}
