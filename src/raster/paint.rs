//! Painting a display list onto an RGB canvas.

use super::font;
use super::layout::{DisplayItem, DisplayList, Rect};
use crate::model::Color;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};

/// Paint `list` at `scale` device pixels per CSS pixel over an opaque
/// `background`.
pub fn paint(list: &DisplayList, width: u32, height: u32, scale: f32, background: Color) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([background.r, background.g, background.b]));
    for item in &list.items {
        match item {
            DisplayItem::Fill { rect, color } => fill(&mut canvas, scaled(*rect, scale), *color),
            DisplayItem::Text {
                x,
                y,
                text,
                font_size,
                color,
                bold,
            } => draw_text(&mut canvas, *x * scale, *y * scale, text, *font_size * scale, *color, *bold),
            DisplayItem::Image { rect, image } => draw_image(&mut canvas, scaled(*rect, scale), image),
        }
    }
    canvas
}

fn scaled(rect: Rect, scale: f32) -> Rect {
    Rect::new(rect.x * scale, rect.y * scale, rect.width * scale, rect.height * scale)
}

/// Pixel bounds `(x0, y0, x1, y1)` of a rect, clipped to the canvas.
fn bounds(canvas: &RgbImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    let clamp_x = |v: f32| v.round().clamp(0.0, canvas.width() as f32) as u32;
    let clamp_y = |v: f32| v.round().clamp(0.0, canvas.height() as f32) as u32;
    let x0 = clamp_x(rect.x);
    let y0 = clamp_y(rect.y);
    // hairlines keep at least one device pixel
    let x1 = clamp_x((rect.x + rect.width).max(rect.x + 1.0));
    let y1 = clamp_y((rect.y + rect.height).max(rect.y + 1.0));
    if rect.width <= 0.0 || rect.height <= 0.0 || x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

fn blend(dst: &mut Rgb<u8>, color: Color) {
    if color.a == 255 {
        *dst = Rgb([color.r, color.g, color.b]);
        return;
    }
    let a = color.a as u32;
    let mix = |d: u8, s: u8| ((s as u32 * a + d as u32 * (255 - a)) / 255) as u8;
    *dst = Rgb([mix(dst[0], color.r), mix(dst[1], color.g), mix(dst[2], color.b)]);
}

fn fill(canvas: &mut RgbImage, rect: Rect, color: Color) {
    if color.is_transparent() {
        return;
    }
    let Some((x0, y0, x1, y1)) = bounds(canvas, rect) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            blend(canvas.get_pixel_mut(x, y), color);
        }
    }
}

fn draw_text(
    canvas: &mut RgbImage,
    x: f32,
    y: f32,
    text: &str,
    font_size: f32,
    color: Color,
    bold: bool,
) {
    let unit = font_size / font::CELL_ROWS;
    let advance = font::advance(font_size);
    for (i, c) in text.chars().enumerate() {
        let columns = font::glyph(c);
        let left = x + i as f32 * advance;
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..font::GLYPH_ROWS {
                if bits & (1 << row) == 0 {
                    continue;
                }
                let width = if bold { unit * 1.6 } else { unit };
                let cell = Rect::new(left + col as f32 * unit, y + row as f32 * unit, width, unit);
                fill(canvas, cell, color);
            }
        }
    }
}

fn draw_image(canvas: &mut RgbImage, rect: Rect, image: &RgbaImage) {
    let Some((x0, y0, x1, y1)) = bounds(canvas, rect) else {
        return;
    };
    let target_w = rect.width.round().max(1.0) as u32;
    let target_h = rect.height.round().max(1.0) as u32;
    let resized = imageops::resize(image, target_w, target_h, FilterType::Triangle);
    let origin_x = rect.x.round() as i64;
    let origin_y = rect.y.round() as i64;
    for y in y0..y1 {
        for x in x0..x1 {
            let sx = x as i64 - origin_x;
            let sy = y as i64 - origin_y;
            if sx < 0 || sy < 0 || sx >= target_w as i64 || sy >= target_h as i64 {
                continue;
            }
            let p = resized.get_pixel(sx as u32, sy as u32);
            blend(
                canvas.get_pixel_mut(x, y),
                Color {
                    r: p[0],
                    g: p[1],
                    b: p[2],
                    a: p[3],
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Arc;

    fn list(items: Vec<DisplayItem>) -> DisplayList {
        DisplayList {
            width: 10.0,
            height: 10.0,
            items,
        }
    }

    #[test]
    fn test_background_is_opaque() {
        let canvas = paint(&list(vec![]), 4, 4, 1.0, Color::WHITE);
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_fill_scaled() {
        let items = vec![DisplayItem::Fill {
            rect: Rect::new(1.0, 1.0, 2.0, 2.0),
            color: Color::BLACK,
        }];
        let canvas = paint(&list(items), 10, 10, 2.0, Color::WHITE);
        assert_eq!(*canvas.get_pixel(2, 2), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(6, 6), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(1, 1), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_translucent_fill_blends() {
        let items = vec![DisplayItem::Fill {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            color: Color {
                r: 0,
                g: 0,
                b: 0,
                a: 128,
            },
        }];
        let canvas = paint(&list(items), 2, 2, 1.0, Color::WHITE);
        let v = canvas.get_pixel(0, 0)[0];
        assert!(v > 100 && v < 150);
    }

    #[test]
    fn test_text_leaves_ink() {
        let items = vec![DisplayItem::Text {
            x: 0.0,
            y: 0.0,
            text: "H".into(),
            font_size: 10.0,
            color: Color::BLACK,
            bold: false,
        }];
        let canvas = paint(&list(items), 10, 10, 1.0, Color::WHITE);
        let dark = canvas.pixels().filter(|p| p[0] == 0).count();
        assert!(dark > 0);
    }

    #[test]
    fn test_transparent_image_pixels_keep_background() {
        let image = Arc::new(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 0])));
        let items = vec![DisplayItem::Image {
            rect: Rect::new(0.0, 0.0, 4.0, 4.0),
            image,
        }];
        let canvas = paint(&list(items), 4, 4, 1.0, Color::WHITE);
        assert_eq!(*canvas.get_pixel(1, 1), Rgb([255, 255, 255]));
    }
}
