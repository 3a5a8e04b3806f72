//! Table-backed glyph source.
//!
//! Serves pre-made glyphs from memory instead of a font file. Used by tests
//! and by headless runs that must not depend on fonts installed on the host.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use super::glyph_source::{GlyphSource, RasterizedGlyph};
use crate::error::{AssetLoadError, GlyphRasterizationError};

/// Shape of one table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSpec {
    pub width: u32,
    pub height: u32,
    pub advance: i32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub coverage: u8,
}

impl GlyphSpec {
    /// Fully opaque box.
    pub fn solid(width: u32, height: u32, advance: i32, bearing_x: i32, bearing_y: i32) -> Self {
        Self::filled(width, height, advance, bearing_x, bearing_y, 255)
    }

    /// Box of uniform coverage.
    pub fn filled(width: u32, height: u32, advance: i32, bearing_x: i32, bearing_y: i32, coverage: u8) -> Self {
        Self {
            width,
            height,
            advance,
            bearing_x,
            bearing_y,
            coverage,
        }
    }

    /// No bitmap, only an advance (space).
    pub fn blank(advance: i32) -> Self {
        Self::filled(0, 0, advance, 0, 0, 0)
    }

    fn rasterize(&self) -> RasterizedGlyph {
        RasterizedGlyph {
            width: self.width,
            height: self.height,
            advance: self.advance,
            bearing_x: self.bearing_x,
            bearing_y: self.bearing_y,
            bitmap: vec![self.coverage; self.width as usize * self.height as usize],
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedGlyphSource {
    line_height: f32,
    glyphs: HashMap<char, GlyphSpec>,
    openable: bool,
}

/// The "face" of a fixed source is just its point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFace {
    pub point_size: f32,
}

impl FixedGlyphSource {
    pub fn new(line_height: f32) -> Self {
        Self {
            line_height,
            glyphs: HashMap::new(),
            openable: true,
        }
    }

    pub fn with(mut self, ch: char, spec: GlyphSpec) -> Self {
        self.glyphs.insert(ch, spec);
        self
    }

    /// Make `ch` fail to rasterize.
    pub fn failing(mut self, ch: char) -> Self {
        self.glyphs.remove(&ch);
        self
    }

    /// Make `open_font` fail as if the file were missing.
    pub fn unopenable(mut self) -> Self {
        self.openable = false;
        self
    }

    /// Every character in `first..=last` as a solid box of `width`x`height`,
    /// with spaces left blank.
    pub fn monospace(line_height: f32, first: char, last: char, width: u32, height: u32) -> Self {
        let advance = width as i32 + 1;
        let bearing_y = height as i32;
        (first..=last).fold(Self::new(line_height), |source, ch| {
            let spec = if ch.is_whitespace() {
                GlyphSpec::blank(advance)
            } else {
                GlyphSpec::solid(width, height, advance, 0, bearing_y)
            };
            source.with(ch, spec)
        })
    }
}

impl GlyphSource for FixedGlyphSource {
    type Face = FixedFace;

    fn open_font(&self, path: &Path, point_size: f32) -> Result<FixedFace, AssetLoadError> {
        if !self.openable {
            return Err(AssetLoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such font"),
            });
        }
        if !point_size.is_finite() || point_size <= 0.0 {
            return Err(AssetLoadError::InvalidPointSize(point_size));
        }
        debug!("FixedGlyphSource: {} glyphs at {} pt", self.glyphs.len(), point_size);
        Ok(FixedFace { point_size })
    }

    fn line_height(&self, _face: &FixedFace) -> f32 {
        self.line_height
    }

    fn rasterize(&self, _face: &FixedFace, ch: char) -> Result<RasterizedGlyph, GlyphRasterizationError> {
        self.glyphs
            .get(&ch)
            .map(GlyphSpec::rasterize)
            .ok_or(GlyphRasterizationError::MissingGlyph(ch))
    }
}
