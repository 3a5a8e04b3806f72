// src/atlas.rs

//! Font atlas builder.
//!
//! Rasterizes a fixed, contiguous character range once at startup and packs
//! every glyph into a single row of one alpha-only texture. The resulting
//! `Font` keeps only the per-character metrics and the texture handle.
//!
//! Single-row packing is enough because the character window is small and
//! never changes after startup.

use std::path::Path;

use log::{debug, info, warn};

use crate::device::memory::MAX_TEXTURE_DIMENSION;
use crate::device::{GraphicsDevice, TextureDescriptor, TextureHandle};
use crate::error::{AtlasError, DeviceError, UnsupportedCharacter};
use crate::rasterizer::{GlyphSource, RasterizedGlyph};

/// Render metadata for one character.
///
/// All-zero for characters that failed to rasterize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Glyph {
    /// Column in the atlas where this glyph's bitmap starts (row is always 0).
    pub texture_x: u32,
    pub width: u32,
    pub height: u32,
    pub advance: i32,
    pub bearing_x: i32,
    /// Distance from the baseline up to the top of the bitmap.
    pub bearing_y: i32,
}

impl Glyph {
    pub fn is_visible(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    fn from_raster(raster: &RasterizedGlyph) -> Self {
        Self {
            texture_x: 0,
            width: raster.width,
            height: raster.height,
            advance: raster.advance,
            bearing_x: raster.bearing_x,
            bearing_y: raster.bearing_y,
        }
    }
}

/// An inclusive, contiguous window of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    first: char,
    last: char,
}

impl CharRange {
    /// Printable ASCII, `' '..='~'`.
    pub const PRINTABLE_ASCII: CharRange = CharRange {
        first: ' ',
        last: '~',
    };

    pub const fn new(first: char, last: char) -> Self {
        Self { first, last }
    }

    pub fn first(&self) -> char {
        self.first
    }

    pub fn last(&self) -> char {
        self.last
    }

    /// Number of valid `char`s in the window. Surrogate code points are not
    /// characters and take no slot.
    pub fn len(&self) -> usize {
        (ordinal(self.last) + 1).saturating_sub(ordinal(self.first))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Table index of `ch`, or `None` when it falls outside the window.
    pub fn index_of(&self, ch: char) -> Option<usize> {
        if ch >= self.first && ch <= self.last {
            Some(ordinal(ch) - ordinal(self.first))
        } else {
            None
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.index_of(ch).is_some()
    }

    /// Every `char` in the window, in table order.
    pub fn chars(&self) -> impl Iterator<Item = char> {
        self.first..=self.last
    }
}

/// Dense position of `ch` among all `char`s. Code points past the surrogate
/// block shift down by its size so indices stay contiguous.
fn ordinal(ch: char) -> usize {
    let code = ch as usize;
    if code > SURROGATE_LAST {
        code - SURROGATE_COUNT
    } else {
        code
    }
}

const SURROGATE_LAST: usize = 0xDFFF;
const SURROGATE_COUNT: usize = 0x800;

impl Default for CharRange {
    fn default() -> Self {
        Self::PRINTABLE_ASCII
    }
}

/// Smallest power of two `>= value`. Zero rounds up to one, since a texture
/// edge can never be empty.
pub fn next_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// Glyph metrics plus the atlas texture that holds their bitmaps.
///
/// Immutable once built. The texture belongs to the `Font`; call
/// [`Font::release`] before dropping the device.
#[derive(Debug)]
pub struct Font {
    glyphs: Vec<Glyph>,
    range: CharRange,
    texture_width: u32,
    texture_height: u32,
    line_height: f32,
    texture: TextureHandle,
}

impl Font {
    /// Glyph for `ch`, or `UnsupportedCharacter` when it is outside the range.
    pub fn glyph(&self, ch: char) -> Result<&Glyph, UnsupportedCharacter> {
        self.range
            .index_of(ch)
            .and_then(|idx| self.glyphs.get(idx))
            .ok_or(UnsupportedCharacter(ch))
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn char_range(&self) -> CharRange {
        self.range
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn texture_width(&self) -> u32 {
        self.texture_width
    }

    pub fn texture_height(&self) -> u32 {
        self.texture_height
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Horizontal pen travel for `text`, ignoring unsupported characters.
    pub fn measure(&self, text: &str) -> i32 {
        text.chars()
            .filter_map(|ch| self.glyph(ch).ok())
            .map(|g| g.advance)
            .sum()
    }

    /// Free the atlas texture. Consumes the font.
    pub fn release<D: GraphicsDevice>(self, device: &mut D) -> Result<(), DeviceError> {
        debug!("Font: Releasing atlas texture {:?}", self.texture);
        device.destroy_texture(self.texture)
    }
}

/// Build a `Font` for `range` from the font file at `font_path`.
///
/// Glyphs that fail to rasterize are logged and stored as zero-size with a
/// zero advance; only a font that cannot be opened, or a failing device,
/// aborts the build.
pub fn build_font<S, D>(
    source: &S,
    device: &mut D,
    font_path: &Path,
    point_size: f32,
    range: CharRange,
) -> Result<Font, AtlasError>
where
    S: GlyphSource,
    D: GraphicsDevice,
{
    if range.is_empty() {
        return Err(AtlasError::EmptyRange {
            first: range.first(),
            last: range.last(),
        });
    }

    info!(
        "build_font: Building atlas for {:?}..={:?} from '{}' at {} pt",
        range.first(),
        range.last(),
        font_path.display(),
        point_size
    );

    let face = source.open_font(font_path, point_size)?;
    let line_height = source.line_height(&face);

    // Pass 1: metrics and atlas extent.
    let mut glyphs = Vec::with_capacity(range.len());
    let mut total_width: u32 = 0;
    let mut max_height: u32 = 0;
    for ch in range.chars() {
        let glyph = match source.rasterize(&face, ch) {
            Ok(raster) => Glyph::from_raster(&raster),
            Err(e) => {
                warn!("build_font: {} - storing {:?} as an empty glyph", e, ch);
                Glyph::default()
            }
        };
        if glyph.is_visible() {
            total_width += glyph.width;
            max_height = max_height.max(glyph.height);
        }
        glyphs.push(glyph);
    }

    let texture_width = next_power_of_two(total_width);
    let texture_height = next_power_of_two(max_height);
    if texture_width > MAX_TEXTURE_DIMENSION || texture_height > MAX_TEXTURE_DIMENSION {
        source.close(face);
        return Err(AtlasError::TooLarge {
            width: texture_width,
            height: texture_height,
            max: MAX_TEXTURE_DIMENSION,
        });
    }
    debug!(
        "build_font: Glyph extent {}x{} -> atlas {}x{}",
        total_width, max_height, texture_width, texture_height
    );

    // Pass 2: pack bitmaps left to right along row 0.
    let mut bitmap = vec![0u8; texture_width as usize * texture_height as usize];
    let mut cursor_x: u32 = 0;
    for (ch, glyph) in range.chars().zip(glyphs.iter_mut()) {
        if !glyph.is_visible() {
            continue;
        }
        glyph.texture_x = cursor_x;
        cursor_x += glyph.width;

        let raster = match source.rasterize(&face, ch) {
            Ok(raster) => raster,
            Err(e) => {
                warn!("build_font: {} on second pass - leaving {:?} blank", e, ch);
                continue;
            }
        };
        if raster.width != glyph.width
            || raster.height != glyph.height
            || raster.bitmap.len() != (raster.width * raster.height) as usize
        {
            warn!(
                "build_font: {:?} changed size between passes ({}x{} vs {}x{}) - leaving blank",
                ch, glyph.width, glyph.height, raster.width, raster.height
            );
            continue;
        }
        blit_row_major(
            &mut bitmap,
            texture_width as usize,
            &raster.bitmap,
            glyph.texture_x as usize,
            glyph.width as usize,
            glyph.height as usize,
        );
    }

    source.close(face);

    let texture = device.create_texture(&TextureDescriptor::alpha_atlas(texture_width, texture_height))?;
    device.upload_subregion(texture, 0, 0, texture_width, texture_height, &bitmap)?;

    info!(
        "build_font: Atlas ready ({}x{}, {} glyphs, line height {})",
        texture_width,
        texture_height,
        glyphs.len(),
        line_height
    );

    Ok(Font {
        glyphs,
        range,
        texture_width,
        texture_height,
        line_height,
        texture,
    })
}

/// Copy a `width`x`height` bitmap into `dest` at column `dest_x`, row 0.
fn blit_row_major(dest: &mut [u8], dest_stride: usize, src: &[u8], dest_x: usize, width: usize, height: usize) {
    for (row, src_row) in src.chunks_exact(width).take(height).enumerate() {
        let start = row * dest_stride + dest_x;
        dest[start..start + width].copy_from_slice(src_row);
    }
}
