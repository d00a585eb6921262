//! Built-in 5x7 bitmap font.
//!
//! Glyphs are stored column-major: five bytes per glyph, bit 0 is the top
//! row. Each glyph sits in a 6x10 unit cell (one blank column, three units
//! of leading) so one unit is a tenth of the font size.

use unicode_normalization::UnicodeNormalization;

/// Glyph columns per cell, including the spacing column.
pub const CELL_COLUMNS: f32 = 6.0;

/// Rows per cell, including leading.
pub const CELL_ROWS: f32 = 10.0;

/// Rows with ink.
pub const GLYPH_ROWS: usize = 7;

/// Printable ASCII, 0x20 through 0x7E.
const ASCII: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x5F, 0x00, 0x00],
    [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14],
    [0x24, 0x2A, 0x7F, 0x2A, 0x12],
    [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50],
    [0x00, 0x05, 0x03, 0x00, 0x00],
    [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00],
    [0x08, 0x2A, 0x1C, 0x2A, 0x08],
    [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00],
    [0x08, 0x08, 0x08, 0x08, 0x08],
    [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02],
    [0x3E, 0x51, 0x49, 0x45, 0x3E],
    [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46],
    [0x21, 0x41, 0x45, 0x4B, 0x31],
    [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39],
    [0x3C, 0x4A, 0x49, 0x49, 0x30],
    [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36],
    [0x06, 0x49, 0x49, 0x29, 0x1E],
    [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00],
    [0x08, 0x14, 0x22, 0x41, 0x00],
    [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08],
    [0x02, 0x01, 0x51, 0x09, 0x06],
    [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E],
    [0x7F, 0x49, 0x49, 0x49, 0x36],
    [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C],
    [0x7F, 0x49, 0x49, 0x49, 0x41],
    [0x7F, 0x09, 0x09, 0x09, 0x01],
    [0x3E, 0x41, 0x49, 0x49, 0x7A],
    [0x7F, 0x08, 0x08, 0x08, 0x7F],
    [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01],
    [0x7F, 0x08, 0x14, 0x22, 0x41],
    [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x0C, 0x02, 0x7F],
    [0x7F, 0x04, 0x08, 0x10, 0x7F],
    [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06],
    [0x3E, 0x41, 0x51, 0x21, 0x5E],
    [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31],
    [0x01, 0x01, 0x7F, 0x01, 0x01],
    [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F],
    [0x3F, 0x40, 0x38, 0x40, 0x3F],
    [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x07, 0x08, 0x70, 0x08, 0x07],
    [0x61, 0x51, 0x49, 0x45, 0x43],
    [0x00, 0x7F, 0x41, 0x41, 0x00],
    [0x02, 0x04, 0x08, 0x10, 0x20],
    [0x00, 0x41, 0x41, 0x7F, 0x00],
    [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40],
    [0x00, 0x01, 0x02, 0x04, 0x00],
    [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38],
    [0x38, 0x44, 0x44, 0x44, 0x20],
    [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18],
    [0x08, 0x7E, 0x09, 0x01, 0x02],
    [0x0C, 0x52, 0x52, 0x52, 0x3E],
    [0x7F, 0x08, 0x04, 0x04, 0x78],
    [0x00, 0x44, 0x7D, 0x40, 0x00],
    [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x7F, 0x10, 0x28, 0x44, 0x00],
    [0x00, 0x41, 0x7F, 0x40, 0x00],
    [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78],
    [0x38, 0x44, 0x44, 0x44, 0x38],
    [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C],
    [0x7C, 0x08, 0x04, 0x04, 0x08],
    [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20],
    [0x3C, 0x40, 0x40, 0x20, 0x7C],
    [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C],
    [0x44, 0x28, 0x10, 0x28, 0x44],
    [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44],
    [0x00, 0x08, 0x36, 0x41, 0x00],
    [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00],
    [0x08, 0x04, 0x08, 0x10, 0x08],
];

const BULLET: [u8; 5] = [0x00, 0x1C, 0x1C, 0x1C, 0x00];
const WHITE_BULLET: [u8; 5] = [0x00, 0x1C, 0x14, 0x1C, 0x00];
const MISSING: [u8; 5] = [0x7F, 0x41, 0x41, 0x41, 0x7F];

/// Column bitmap for a character.
///
/// Characters outside the table are folded through their compatibility
/// decomposition (`é` draws as `e`, `…` as `.`); anything left over draws as
/// an empty box.
pub fn glyph(c: char) -> [u8; 5] {
    match c {
        '•' | '●' | '▪' | '■' => return BULLET,
        '◦' | '○' | '▫' => return WHITE_BULLET,
        '–' | '—' | '‐' | '‑' | '−' => return ASCII[(b'-' - 0x20) as usize],
        '‘' | '’' | '′' => return ASCII[(b'\'' - 0x20) as usize],
        '“' | '”' | '″' => return ASCII[(b'"' - 0x20) as usize],
        '\u{a0}' | '\t' => return ASCII[0],
        _ => {}
    }
    if let Some(g) = ascii_glyph(c) {
        return g;
    }
    c.to_string()
        .nfkd()
        .find_map(ascii_glyph)
        .unwrap_or(MISSING)
}

fn ascii_glyph(c: char) -> Option<[u8; 5]> {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        Some(ASCII[(code - 0x20) as usize])
    } else {
        None
    }
}

/// Horizontal advance of one character at `font_size` CSS pixels.
pub fn advance(font_size: f32) -> f32 {
    font_size * CELL_COLUMNS / CELL_ROWS
}

/// Width of `text` on one line.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * advance(font_size)
}

/// Height of the inked glyph rows.
pub fn glyph_height(font_size: f32) -> f32 {
    font_size * GLYPH_ROWS as f32 / CELL_ROWS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_lookup() {
        assert_eq!(glyph(' '), [0; 5]);
        assert_eq!(glyph('A'), [0x7E, 0x11, 0x11, 0x11, 0x7E]);
        assert_eq!(glyph('~'), ASCII[94]);
    }

    #[test]
    fn test_folding() {
        assert_eq!(glyph('é'), glyph('e'));
        assert_eq!(glyph('Ü'), glyph('U'));
        assert_eq!(glyph('—'), glyph('-'));
        assert_eq!(glyph('…'), glyph('.'));
        assert_eq!(glyph('漢'), MISSING);
    }

    #[test]
    fn test_bullet_has_ink() {
        assert!(glyph('•').iter().any(|c| *c != 0));
    }

    #[test]
    fn test_metrics() {
        assert_eq!(advance(10.0), 6.0);
        assert_eq!(text_width("abc", 10.0), 18.0);
        assert_eq!(glyph_height(10.0), 7.0);
    }
}
