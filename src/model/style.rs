//! Inline style maps and typed CSS value accessors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CSS pixels per millimetre (96 px per inch).
pub const PX_PER_MM: f32 = 96.0 / 25.4;

/// Default font size in CSS pixels.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// A CSS property map attached to an element.
///
/// Property names are stored lower-cased; values are stored trimmed and
/// otherwise verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style {
    props: BTreeMap<String, String>,
}

impl Style {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an inline declaration block such as `color: red; margin: 0 4px`.
    ///
    /// Malformed declarations are skipped; later declarations win.
    pub fn parse(css: &str) -> Self {
        let mut style = Self::new();
        for decl in css.split(';') {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches("!important").trim();
            if name.trim().is_empty() || value.is_empty() {
                continue;
            }
            style.set(name, value);
        }
        style
    }

    /// Builder-style setter.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.props
            .insert(name.trim().to_ascii_lowercase(), value.into().trim().to_string());
    }

    /// Get a raw property value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    /// Remove a property, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.props.remove(name)
    }

    /// Check whether a property is set.
    pub fn contains(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Check if no property is declared.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Iterate over declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay every declaration of `other` on top of this style.
    pub fn merge(&mut self, other: &Style) {
        for (k, v) in &other.props {
            self.props.insert(k.clone(), v.clone());
        }
    }

    /// Serialize back to an inline declaration block.
    pub fn to_css(&self) -> String {
        self.props
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Resolve a length property to CSS pixels.
    pub fn length(&self, name: &str, font_size: f32, percent_base: f32) -> Option<f32> {
        self.get(name)
            .and_then(|v| parse_length(v, font_size, percent_base))
    }

    /// Resolve a colour property.
    pub fn color(&self, name: &str) -> Option<Color> {
        self.get(name).and_then(Color::parse)
    }

    /// The `display` mode, defaulting to `fallback` when unset or unknown.
    pub fn display(&self, fallback: Display) -> Display {
        self.get("display").and_then(Display::parse).unwrap_or(fallback)
    }

    /// Resolve the font size against the parent's computed size.
    pub fn font_size(&self, parent: f32) -> f32 {
        match self.get("font-size") {
            Some("small") => 13.0,
            Some("medium") => DEFAULT_FONT_SIZE,
            Some("large") => 18.0,
            Some("x-large") => 24.0,
            Some(v) => parse_length(v, parent, parent).unwrap_or(parent),
            None => parent,
        }
    }

    /// Check for a bold `font-weight`.
    pub fn is_bold(&self) -> Option<bool> {
        self.get("font-weight").map(|w| match w {
            "bold" | "bolder" => true,
            other => other.parse::<u16>().map(|n| n >= 600).unwrap_or(false),
        })
    }

    /// Resolve a box shorthand (`margin` or `padding`) plus its longhands.
    pub fn sides(&self, prop: &str, font_size: f32, percent_base: f32) -> Sides {
        let mut sides = Sides::default();
        if let Some(value) = self.get(prop) {
            let parts: Vec<f32> = value
                .split_whitespace()
                .map(|p| parse_length(p, font_size, percent_base).unwrap_or(0.0))
                .collect();
            sides = match parts.as_slice() {
                [a] => Sides::uniform(*a),
                [v, h] => Sides::new(*v, *h, *v, *h),
                [t, h, b] => Sides::new(*t, *h, *b, *h),
                [t, r, b, l, ..] => Sides::new(*t, *r, *b, *l),
                [] => Sides::default(),
            };
        }
        let longhand = |side: &str| self.length(&format!("{}-{}", prop, side), font_size, percent_base);
        if let Some(v) = longhand("top") {
            sides.top = v;
        }
        if let Some(v) = longhand("right") {
            sides.right = v;
        }
        if let Some(v) = longhand("bottom") {
            sides.bottom = v;
        }
        if let Some(v) = longhand("left") {
            sides.left = v;
        }
        sides
    }

    /// Resolve the border on one side (`top`, `right`, `bottom`, `left`).
    pub fn border(&self, side: &str) -> Option<Border> {
        let mut border = self.get("border").and_then(Border::parse);
        if let Some(b) = self.get(&format!("border-{}", side)).and_then(Border::parse) {
            border = Some(b);
        }
        if let Some(w) = self
            .get(&format!("border-{}-width", side))
            .and_then(|v| parse_length(v, DEFAULT_FONT_SIZE, 0.0))
        {
            border.get_or_insert(Border::default()).width = w;
        }
        if let Some(c) = self.color(&format!("border-{}-color", side)) {
            border.get_or_insert(Border::default()).color = c;
        }
        border.filter(|b| b.width > 0.0)
    }

    /// Horizontal text alignment.
    pub fn text_align(&self) -> Option<TextAlign> {
        match self.get("text-align")? {
            "center" => Some(TextAlign::Center),
            "right" | "end" => Some(TextAlign::Right),
            "left" | "start" | "justify" => Some(TextAlign::Left),
            _ => None,
        }
    }
}

/// Parse a CSS length to pixels.
///
/// Percentages resolve against `percent_base`; `em` against `font_size`.
pub fn parse_length(value: &str, font_size: f32, percent_base: f32) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f32 = number.parse().ok()?;
    let px = match unit.trim() {
        "" | "px" => number,
        "pt" => number * 96.0 / 72.0,
        "mm" => number * PX_PER_MM,
        "cm" => number * PX_PER_MM * 10.0,
        "in" => number * 96.0,
        "em" => number * font_size,
        "rem" => number * DEFAULT_FONT_SIZE,
        "%" => number * percent_base / 100.0,
        _ => return None,
    };
    Some(px)
}

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Fully transparent.
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Opaque colour from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Check if the colour paints nothing.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse `#rgb`, `#rrggbb`, `rgb()`, `rgba()` or a named colour.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() < 3 {
                return None;
            }
            let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
            let alpha = match parts.get(3) {
                Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
                None => 255,
            };
            return Some(Self {
                r: channel(parts[0])?,
                g: channel(parts[1])?,
                b: channel(parts[2])?,
                a: alpha,
            });
        }
        let named = match value.as_str() {
            "transparent" => Self::TRANSPARENT,
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "darkgray" | "darkgrey" => Self::rgb(169, 169, 169),
            "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "silver" => Self::rgb(192, 192, 192),
            "teal" => Self::rgb(0, 128, 128),
            "maroon" => Self::rgb(128, 0, 0),
            "purple" => Self::rgb(128, 0, 128),
            "orange" => Self::rgb(255, 165, 0),
            _ => return None,
        };
        Some(named)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        6 => Some(Color::rgb(pair(0)?, pair(2)?, pair(4)?)),
        8 => Some(Color {
            r: pair(0)?,
            g: pair(2)?,
            b: pair(4)?,
            a: pair(6)?,
        }),
        _ => None,
    }
}

/// CSS display modes understood by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// Block box
    Block,
    /// Inline content
    Inline,
    /// Inline-level box laid out like a block
    InlineBlock,
    /// Horizontal flex row
    Flex,
    /// List item with an outside marker
    ListItem,
    /// Not rendered
    None,
}

impl Display {
    /// Parse a `display` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "block" | "table" | "table-row" | "grid" => Some(Display::Block),
            "inline" | "contents" => Some(Display::Inline),
            "inline-block" | "inline-flex" => Some(Display::InlineBlock),
            "flex" => Some(Display::Flex),
            "list-item" => Some(Display::ListItem),
            "none" => Some(Display::None),
            _ => None,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Left aligned
    #[default]
    Left,
    /// Centered
    Center,
    /// Right aligned
    Right,
}

/// Four box edges in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sides {
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
    /// Left edge
    pub left: f32,
}

impl Sides {
    /// Edges from explicit values.
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same value on every edge.
    pub fn uniform(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Left + right.
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Top + bottom.
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// A solid border edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    /// Width in pixels
    pub width: f32,
    /// Colour
    pub color: Color,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Color::BLACK,
        }
    }
}

impl Border {
    /// Parse a `border` shorthand such as `1px solid #ccc`.
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim() == "none" || value.trim() == "0" {
            return Some(Self {
                width: 0.0,
                color: Color::TRANSPARENT,
            });
        }
        let mut border = Self::default();
        for token in value.split_whitespace() {
            if let Some(w) = parse_length(token, DEFAULT_FONT_SIZE, 0.0) {
                border.width = w;
            } else if let Some(c) = Color::parse(token) {
                border.color = c;
            } else if token == "none" || token == "hidden" {
                border.width = 0.0;
            }
        }
        Some(border)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_style() {
        let style = Style::parse("Color: #333; margin: 0 0 8px 0;; bogus; padding-left:20px !important");
        assert_eq!(style.get("color"), Some("#333"));
        assert_eq!(style.get("padding-left"), Some("20px"));
        assert_eq!(style.len(), 3);
    }

    #[test]
    fn test_length_units() {
        assert_eq!(parse_length("12px", 16.0, 0.0), Some(12.0));
        assert_eq!(parse_length("2em", 10.0, 0.0), Some(20.0));
        assert_eq!(parse_length("50%", 16.0, 300.0), Some(150.0));
        assert!((parse_length("210mm", 16.0, 0.0).unwrap() - 793.7).abs() < 0.1);
        assert_eq!(parse_length("auto", 16.0, 0.0), None);
    }

    #[test]
    fn test_box_shorthand() {
        let style = Style::parse("margin: 1px 2px 3px; margin-left: 9px");
        let sides = style.sides("margin", 16.0, 0.0);
        assert_eq!(sides, Sides::new(1.0, 2.0, 3.0, 9.0));
    }

    #[test]
    fn test_colors() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("rgb(10, 20, 30)"), Some(Color::rgb(10, 20, 30)));
        assert!(Color::parse("transparent").unwrap().is_transparent());
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn test_border_shorthand() {
        let style = Style::parse("border-bottom: 2px solid #000");
        let border = style.border("bottom").unwrap();
        assert_eq!(border.width, 2.0);
        assert_eq!(border.color, Color::BLACK);
        assert!(style.border("top").is_none());
    }

    #[test]
    fn test_to_css_round_trip() {
        let style = Style::new().with("padding-left", "20px").with("color", "red");
        assert_eq!(Style::parse(&style.to_css()), style);
    }
}
