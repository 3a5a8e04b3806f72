//! Builds a real atlas from a TrueType font installed on the host.
//!
//! Skipped (with a warning) when none of the usual system fonts exist.

use std::path::{Path, PathBuf};

use atlas_text::atlas::{build_font, CharRange};
use atlas_text::device::{ClearColor, DrawTarget, GraphicsDevice, HeadlessDevice, SoftwareDevice};
use atlas_text::layout::layout_string;
use atlas_text::rasterizer::{GlyphSource, TtfGlyphSource};
use atlas_text::renderer::TextRenderer;

const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

fn system_font() -> Option<PathBuf> {
    let found = CANDIDATES.iter().map(Path::new).find(|p| p.exists()).map(Path::to_path_buf);
    if found.is_none() {
        log::warn!("No system font found, skipping");
    }
    found
}

#[test_log::test]
fn builds_printable_ascii_atlas() {
    let Some(path) = system_font() else { return };
    let source = TtfGlyphSource::new();
    let mut device = HeadlessDevice::new();
    let font = build_font(&source, &mut device, &path, 16.0, CharRange::PRINTABLE_ASCII).unwrap();

    assert!(font.texture_width().is_power_of_two());
    assert!(font.texture_height().is_power_of_two());
    assert!(font.line_height() >= 16.0);

    let space = font.glyph(' ').unwrap();
    assert_eq!((space.width, space.height), (0, 0));
    assert!(space.advance > 0);

    let m = font.glyph('M').unwrap();
    assert!(m.width > 0 && m.height > 0);
    assert!(m.texture_x + m.width <= font.texture_width());

    // Descenders hang below the baseline.
    let g = font.glyph('g').unwrap();
    assert!(g.bearing_y < g.height as i32);

    let pixels = device.texture_pixels(font.texture()).unwrap();
    assert!(pixels.iter().any(|&p| p == 255));
    assert!(pixels.iter().any(|&p| p > 0 && p < 255), "expected anti-aliased edges");
}

#[test_log::test]
fn rasterized_bitmaps_match_reported_size() {
    let Some(path) = system_font() else { return };
    let source = TtfGlyphSource::with_dpi(96.0);
    let face = source.open_font(&path, 12.0).unwrap();
    for ch in CharRange::PRINTABLE_ASCII.chars() {
        let glyph = source.rasterize(&face, ch).unwrap();
        assert_eq!(glyph.bitmap.len(), (glyph.width * glyph.height) as usize, "{:?}", ch);
    }
    source.close(face);
}

#[test_log::test]
fn renders_text_to_the_software_framebuffer() {
    let Some(path) = system_font() else { return };
    let mut device = SoftwareDevice::new(128, 32);
    let font = build_font(&TtfGlyphSource::new(), &mut device, &path, 16.0, CharRange::PRINTABLE_ASCII).unwrap();
    let mut renderer = TextRenderer::new(&mut device, 32).unwrap();

    device.clear(DrawTarget::Screen, ClearColor::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    let mut frame = renderer.begin_frame();
    assert_eq!(frame.draw_text(&font, "Hello", 4.0, 4.0), Ok(5));
    frame.submit(&mut device, &font, DrawTarget::Screen).unwrap();

    let lit = device.framebuffer().chunks_exact(4).filter(|px| px[0] > 128).count();
    assert!(lit > 20, "only {} lit pixels", lit);

    // Nothing is drawn left of the first glyph's box.
    let first = layout_string(&font, "Hello", 4.0, 4.0)[0].quad;
    let left_edge = first.x0.floor() as u32;
    for y in 0..32 {
        for x in 0..left_edge {
            assert_eq!(device.pixel(x, y), Some([0, 0, 0, 255]));
        }
    }
}
