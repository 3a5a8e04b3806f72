// src/layout.rs

//! Text layout engine.
//!
//! Turns a string and a pen origin into screen-space quads using the font's
//! metrics table. Single line, left to right, no kerning or wrapping.

use log::trace;

use crate::atlas::Font;
use crate::batch::Quad;

/// One laid-out glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedGlyph {
    pub ch: char,
    pub quad: Quad,
}

/// Lay out `text` with the pen starting at `(origin_x, origin_y)`.
///
/// `origin_y` is the top of the line; glyphs sit on a baseline
/// `line_height` below it. Characters outside the font's range are skipped
/// without moving the pen. Glyphs without a bitmap move the pen but emit no
/// quad.
pub fn layout_string(font: &Font, text: &str, origin_x: f32, origin_y: f32) -> Vec<PositionedGlyph> {
    let texture_width = font.texture_width() as f32;
    let texture_height = font.texture_height() as f32;
    let baseline = origin_y + font.line_height();

    let mut pen_x = origin_x;
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let glyph = match font.glyph(ch) {
            Ok(glyph) => glyph,
            Err(e) => {
                trace!("layout_string: skipping {}", e);
                continue;
            }
        };

        if glyph.is_visible() {
            let x0 = pen_x + glyph.bearing_x as f32;
            let y0 = baseline - glyph.bearing_y as f32;
            let quad = Quad {
                x0,
                y0,
                x1: x0 + glyph.width as f32,
                y1: y0 + glyph.height as f32,
                u0: glyph.texture_x as f32 / texture_width,
                v0: 0.0,
                u1: (glyph.texture_x + glyph.width) as f32 / texture_width,
                v1: glyph.height as f32 / texture_height,
            };
            out.push(PositionedGlyph { ch, quad });
        }
        pen_x += glyph.advance as f32;
    }
    out
}
