/// Rasterizer: display list -> RGBA bitmap at a magnification factor.
///
/// Text is drawn as glyph blocks on the layout's character grid (cap-height
/// blocks for capitals, digits and punctuation, x-height blocks for lower
/// case, with descenders where the letter has one). No fonts are involved,
/// so the output depends only on the document.

use crate::config::Color;
use crate::rendering::layout::{Rgba, CHAR_WIDTH, LINE_HEIGHT};
use crate::rendering::paint::PaintCommand;
use image::RgbaImage;

/// Bitmap dimensions for a CSS size at `scale`, at least 1x1
pub fn scaled_size(width_css: u32, height_css: u32, scale: f64) -> (u32, u32) {
    let w = (width_css as f64 * scale).round().max(1.0) as u32;
    let h = (height_css as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Paint `commands` onto an opaque `background` canvas
pub fn rasterize(commands: &[PaintCommand], width_css: u32, height_css: u32, scale: f64, background: Color) -> RgbaImage {
    let (w, h) = scaled_size(width_css, height_css, scale);
    let mut canvas = Canvas {
        img: RgbaImage::from_pixel(w, h, image::Rgba([background.r, background.g, background.b, 255])),
        scale,
    };
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba } => {
                canvas.fill(*x as f64, *y as f64, *width as f64, *height as f64, *rgba);
            }
            PaintCommand::StrokeRect { x, y, width, height, line_width, rgba } => {
                let (x, y, w, h, lw) = (*x as f64, *y as f64, *width as f64, *height as f64, *line_width as f64);
                canvas.fill(x, y, w, lw, *rgba);
                canvas.fill(x, y + h - lw, w, lw, *rgba);
                canvas.fill(x, y + lw, lw, (h - 2.0 * lw).max(0.0), *rgba);
                canvas.fill(x + w - lw, y + lw, lw, (h - 2.0 * lw).max(0.0), *rgba);
            }
            PaintCommand::Text { x, y, text, scale, rgba } => {
                canvas.text(*x as f64, *y as f64, text, *scale as f64, *rgba);
            }
        }
    }
    canvas.img
}

struct Canvas {
    img: RgbaImage,
    scale: f64,
}

impl Canvas {
    /// Fill a CSS-space rectangle. Both edges are rounded so adjacent
    /// rectangles share a pixel boundary.
    fn fill(&mut self, x: f64, y: f64, width: f64, height: f64, rgba: Rgba) {
        if rgba[3] == 0 || width <= 0.0 || height <= 0.0 {
            return;
        }
        let (iw, ih) = (self.img.width() as f64, self.img.height() as f64);
        let x0 = (x * self.scale).round().clamp(0.0, iw) as u32;
        let y0 = (y * self.scale).round().clamp(0.0, ih) as u32;
        let x1 = ((x + width) * self.scale).round().clamp(0.0, iw) as u32;
        let y1 = ((y + height) * self.scale).round().clamp(0.0, ih) as u32;
        for py in y0..y1 {
            for px in x0..x1 {
                let dst = self.img.get_pixel_mut(px, py);
                dst.0 = over(rgba, dst.0);
            }
        }
    }

    fn text(&mut self, x: f64, y: f64, text: &str, font_scale: f64, rgba: Rgba) {
        let cell_w = CHAR_WIDTH as f64 * font_scale;
        let line_h = LINE_HEIGHT as f64 * font_scale;
        for (row, line) in text.lines().enumerate() {
            let top = y + row as f64 * line_h;
            for (col, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let (rise, depth) = glyph_extent(ch);
                let gx = x + col as f64 * cell_w + font_scale;
                let gy = top + (11.0 - rise) * font_scale;
                self.fill(gx, gy, cell_w - 2.0 * font_scale, (rise + depth) * font_scale, rgba);
            }
        }
    }
}

/// Height above and below the baseline, in CSS px at font scale 1
fn glyph_extent(ch: char) -> (f64, f64) {
    match ch {
        'g' | 'j' | 'p' | 'q' | 'y' => (5.0, 2.0),
        'b' | 'd' | 'f' | 'h' | 'k' | 'l' | 't' => (8.0, 0.0),
        '.' | ',' | ':' | ';' | '_' => (2.0, 0.0),
        '-' | '=' | '+' | '~' => (5.0, -3.0),
        c if c.is_lowercase() => (5.0, 0.0),
        _ => (8.0, 0.0),
    }
}

/// Source-over compositing of straight-alpha colors
fn over(src: Rgba, dst: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as u32;
    if sa == 255 {
        return src;
    }
    let da = dst[3] as u32;
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        return [0, 0, 0, 0];
    }
    let mix = |s: u8, d: u8| ((s as u32 * sa + d as u32 * da * (255 - sa) / 255) / out_a) as u8;
    [mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), out_a as u8]
}
