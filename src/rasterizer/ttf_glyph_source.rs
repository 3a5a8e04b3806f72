//! TrueType/OpenType glyph source built on `ttf-parser`.
//!
//! Outlines come from ttf-parser; coverage comes from `ab_glyph_rasterizer`.
//! Metrics are scaled from font units to pixels with
//! `pixel_size = point_size * dpi / 72` and rounded to whole pixels so that
//! quads land on the pixel grid.

use std::path::{Path, PathBuf};

use ab_glyph_rasterizer::{point, Point, Rasterizer};
use log::{debug, info};
use ttf_parser::{Face, OutlineBuilder};

use super::glyph_source::{GlyphSource, RasterizedGlyph};
use crate::error::{AssetLoadError, GlyphRasterizationError};

/// Typographic points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Largest bitmap edge the rasterizer will produce for one glyph.
pub const MAX_GLYPH_DIMENSION: u32 = 1024;

/// An opened font: the raw file bytes plus the derived pixel scale.
pub struct TtfFace {
    path: PathBuf,
    data: Vec<u8>,
    scale: f32,
    line_height: f32,
}

impl TtfFace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Font units to pixels.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    // Parsing only reads the table directory, so re-parsing per glyph is cheap
    // and avoids a self-referential face.
    fn face(&self, ch: char) -> Result<Face<'_>, GlyphRasterizationError> {
        Face::parse(&self.data, 0).map_err(|_| GlyphRasterizationError::BadOutline(ch))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TtfGlyphSource {
    dpi: f32,
}

impl Default for TtfGlyphSource {
    fn default() -> Self {
        Self { dpi: POINTS_PER_INCH }
    }
}

impl TtfGlyphSource {
    /// Source where one point is one pixel.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(dpi: f32) -> Self {
        Self { dpi }
    }

    pub fn pixel_size(&self, point_size: f32) -> f32 {
        point_size * self.dpi / POINTS_PER_INCH
    }
}

impl GlyphSource for TtfGlyphSource {
    type Face = TtfFace;

    fn open_font(&self, path: &Path, point_size: f32) -> Result<TtfFace, AssetLoadError> {
        let pixel_size = self.pixel_size(point_size);
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(AssetLoadError::InvalidPointSize(point_size));
        }

        let data = std::fs::read(path).map_err(|source| AssetLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (scale, line_height) = {
            let face = Face::parse(&data, 0).map_err(|e| AssetLoadError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let units_per_em = face.units_per_em();
            if units_per_em == 0 {
                return Err(AssetLoadError::Parse {
                    path: path.to_path_buf(),
                    reason: "units_per_em is zero".to_string(),
                });
            }
            let scale = pixel_size / units_per_em as f32;
            let line_units =
                face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32;
            (scale, (line_units * scale).round())
        };

        info!(
            "TtfGlyphSource: Opened '{}' at {} pt ({} px, line height {})",
            path.display(),
            point_size,
            pixel_size,
            line_height
        );

        Ok(TtfFace {
            path: path.to_path_buf(),
            data,
            scale,
            line_height,
        })
    }

    fn line_height(&self, face: &TtfFace) -> f32 {
        face.line_height
    }

    fn rasterize(&self, face: &TtfFace, ch: char) -> Result<RasterizedGlyph, GlyphRasterizationError> {
        let parsed = face.face(ch)?;
        let glyph_id = parsed
            .glyph_index(ch)
            .ok_or(GlyphRasterizationError::MissingGlyph(ch))?;

        let scale = face.scale;
        let advance = (parsed.glyph_hor_advance(glyph_id).unwrap_or(0) as f32 * scale).round() as i32;

        let Some(bbox) = parsed.glyph_bounding_box(glyph_id) else {
            // No outline, e.g. space.
            return Ok(RasterizedGlyph {
                advance,
                ..RasterizedGlyph::default()
            });
        };

        let left = (bbox.x_min as f32 * scale).floor();
        let right = (bbox.x_max as f32 * scale).ceil();
        let bottom = (bbox.y_min as f32 * scale).floor();
        let top = (bbox.y_max as f32 * scale).ceil();
        let width = (right - left).max(0.0) as u32;
        let height = (top - bottom).max(0.0) as u32;

        if width > MAX_GLYPH_DIMENSION || height > MAX_GLYPH_DIMENSION {
            return Err(GlyphRasterizationError::TooLarge { ch, width, height });
        }
        if width == 0 || height == 0 {
            return Ok(RasterizedGlyph {
                advance,
                bearing_x: left as i32,
                bearing_y: top as i32,
                ..RasterizedGlyph::default()
            });
        }

        let mut builder = OutlineRasterizer::new(width, height, scale, left, top);
        parsed
            .outline_glyph(glyph_id, &mut builder)
            .ok_or(GlyphRasterizationError::BadOutline(ch))?;

        debug!(
            "TtfGlyphSource: '{}' (U+{:04X}) {}x{} advance={} bearing=({}, {})",
            ch, ch as u32, width, height, advance, left, top
        );

        Ok(RasterizedGlyph {
            width,
            height,
            advance,
            bearing_x: left as i32,
            bearing_y: top as i32,
            bitmap: builder.into_coverage(),
        })
    }
}

/// Feeds ttf-parser outline callbacks into an `ab_glyph_rasterizer`,
/// flipping font space (y up) into bitmap space (y down).
struct OutlineRasterizer {
    raster: Rasterizer,
    scale: f32,
    left: f32,
    top: f32,
    start: Point,
    current: Point,
}

impl OutlineRasterizer {
    fn new(width: u32, height: u32, scale: f32, left: f32, top: f32) -> Self {
        Self {
            raster: Rasterizer::new(width as usize, height as usize),
            scale,
            left,
            top,
            start: point(0.0, 0.0),
            current: point(0.0, 0.0),
        }
    }

    fn map(&self, x: f32, y: f32) -> Point {
        point(x * self.scale - self.left, self.top - y * self.scale)
    }

    fn close_contour(&mut self) {
        if self.current != self.start {
            self.raster.draw_line(self.current, self.start);
            self.current = self.start;
        }
    }

    /// Close any open contour and resolve coverage to bytes, rows top down.
    fn into_coverage(mut self) -> Vec<u8> {
        self.close_contour();
        let (width, height) = self.raster.dimensions();
        let mut bitmap = vec![0u8; width * height];
        self.raster.for_each_pixel(|index, alpha| {
            bitmap[index] = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        });
        bitmap
    }
}

impl OutlineBuilder for OutlineRasterizer {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        self.start = self.map(x, y);
        self.current = self.start;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.raster.draw_line(self.current, p);
        self.current = p;
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let c = self.map(x1, y1);
        let p = self.map(x, y);
        self.raster.draw_quad(self.current, c, p);
        self.current = p;
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c1 = self.map(x1, y1);
        let c2 = self.map(x2, y2);
        let p = self.map(x, y);
        self.raster.draw_cubic(self.current, c1, c2, p);
        self.current = p;
    }

    fn close(&mut self) {
        self.close_contour();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_an_asset_load_error() {
        let source = TtfGlyphSource::new();
        let err = source
            .open_font(Path::new("/nonexistent/font.ttf"), 16.0)
            .err()
            .unwrap();
        assert!(matches!(err, AssetLoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn garbage_bytes_are_an_asset_load_error() {
        let path = std::env::temp_dir().join(format!("atlas-text-garbage-{}.ttf", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(b"definitely not a font").unwrap();
        }
        let err = TtfGlyphSource::new().open_font(&path, 16.0).err().unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, AssetLoadError::Parse { .. }));
    }

    #[test]
    fn non_positive_point_size_is_rejected() {
        let err = TtfGlyphSource::new()
            .open_font(Path::new("/nonexistent/font.ttf"), 0.0)
            .err()
            .unwrap();
        assert!(matches!(err, AssetLoadError::InvalidPointSize(_)));
    }

    /// Run an outline given in font units through the builder at scale 1.
    fn rasterize_outline(width: u32, height: u32, top: f32, draw: impl FnOnce(&mut OutlineRasterizer)) -> Vec<u8> {
        let mut builder = OutlineRasterizer::new(width, height, 1.0, 0.0, top);
        draw(&mut builder);
        builder.into_coverage()
    }

    #[test]
    fn square_outline_fills_its_pixels() {
        // Font-space square (1,1)..(3,3) in a 4x4 box whose top is y = 4.
        let coverage = rasterize_outline(4, 4, 4.0, |b| {
            b.move_to(1.0, 1.0);
            b.line_to(3.0, 1.0);
            b.line_to(3.0, 3.0);
            b.line_to(1.0, 3.0);
            b.close();
        });
        #[rustfmt::skip]
        let expected = [
            0, 0, 0, 0,
            0, 255, 255, 0,
            0, 255, 255, 0,
            0, 0, 0, 0,
        ];
        assert_eq!(coverage, expected);
    }

    #[test]
    fn unclosed_contour_is_closed_automatically() {
        let coverage = rasterize_outline(2, 2, 2.0, |b| {
            b.move_to(0.0, 0.0);
            b.line_to(2.0, 0.0);
            b.line_to(2.0, 2.0);
            b.line_to(0.0, 2.0);
        });
        assert_eq!(coverage, vec![255; 4]);
    }

    #[test]
    fn font_y_up_maps_to_bitmap_rows_top_down() {
        // Fill only the upper half in font space; it must land in row 0.
        let coverage = rasterize_outline(2, 2, 2.0, |b| {
            b.move_to(0.0, 1.0);
            b.line_to(2.0, 1.0);
            b.line_to(2.0, 2.0);
            b.line_to(0.0, 2.0);
            b.close();
        });
        assert_eq!(coverage, vec![255, 255, 0, 0]);
    }

    #[test]
    fn curved_outline_has_partial_coverage_edges() {
        let coverage = rasterize_outline(10, 10, 10.0, |b| {
            b.move_to(0.0, 0.0);
            b.quad_to(5.0, 20.0, 10.0, 0.0);
            b.close();
        });
        assert_eq!(coverage.len(), 100);
        // Bottom row centre is inside the arch, top corners are not.
        assert!(coverage[95] > 200);
        assert_eq!(coverage[0], 0);
        assert!(coverage.iter().any(|&c| c > 0 && c < 255));
    }

    #[test]
    fn pixel_size_follows_dpi() {
        assert_eq!(TtfGlyphSource::new().pixel_size(12.0), 12.0);
        assert_eq!(TtfGlyphSource::with_dpi(144.0).pixel_size(12.0), 24.0);
    }
}
