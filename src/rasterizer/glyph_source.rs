//! Glyph metrics and bitmap primitives.
//!
//! This module defines the `GlyphSource` trait, the seam between the atlas
//! builder and whatever actually turns outlines into pixels (ttf-parser plus
//! our coverage rasterizer, or a fixed table in tests).

use std::path::Path;

use crate::error::{AssetLoadError, GlyphRasterizationError};

/// A glyph rendered at the face's point size.
///
/// `bitmap` holds `width * height` coverage bytes, rows top to bottom.
/// `bearing_y` is measured upward from the baseline to the top row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    pub advance: i32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub bitmap: Vec<u8>,
}

impl RasterizedGlyph {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Source of glyph metrics and coverage bitmaps at a fixed size.
///
/// Implementors handle:
/// - Opening a font file at a point size
/// - Reporting the font-wide line height
/// - Rasterizing one character at a time
pub trait GlyphSource {
    /// Open font handle. Dropped (or passed to `close`) when the atlas is done.
    type Face;

    /// Load the font at `path` and prepare it for `point_size`.
    fn open_font(&self, path: &Path, point_size: f32) -> Result<Self::Face, AssetLoadError>;

    /// Distance between baselines in pixels.
    fn line_height(&self, face: &Self::Face) -> f32;

    /// Rasterize `ch`. A character with no outline (space) is `Ok` with a
    /// zero-size bitmap and a real advance.
    fn rasterize(&self, face: &Self::Face, ch: char) -> Result<RasterizedGlyph, GlyphRasterizationError>;

    /// Release the face. The default just drops it.
    fn close(&self, face: Self::Face) {
        drop(face);
    }
}
