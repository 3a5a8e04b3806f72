// src/error.rs

//! Error types shared by the atlas builder, layout engine, batch and devices.
//!
//! Which of these are fatal is decided by the caller: `AssetLoadError` aborts
//! startup, `GlyphRasterizationError` and `UnsupportedCharacter` are recovered
//! where they occur, and `BatchOverflowError` is handed back to whoever is
//! filling the frame.

use std::path::PathBuf;
use thiserror::Error;

use crate::device::{BufferHandle, TextureHandle};

/// The font file could not be opened or parsed.
#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("Failed to read font file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse font file '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Invalid point size {0}")]
    InvalidPointSize(f32),
}

/// A single glyph could not be rasterized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlyphRasterizationError {
    #[error("Font has no glyph for {0:?}")]
    MissingGlyph(char),
    #[error("Outline for {0:?} is malformed")]
    BadOutline(char),
    #[error("Glyph {ch:?} is {width}x{height}, larger than the rasterizer allows")]
    TooLarge { ch: char, width: u32, height: u32 },
}

/// A character fell outside the font's supported range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Character {0:?} is not in the font's character range")]
pub struct UnsupportedCharacter(pub char);

/// The batch already holds `capacity` quads.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Quad batch is full ({capacity} quads)")]
pub struct BatchOverflowError {
    pub capacity: usize,
}

/// Failures reported by a `GraphicsDevice` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("Unknown buffer {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("Texture size {width}x{height} is not allowed")]
    InvalidTextureSize { width: u32, height: u32 },
    #[error(
        "Upload of {width}x{height} at ({x}, {y}) does not fit texture {texture:?} ({tex_width}x{tex_height})"
    )]
    UploadOutOfBounds {
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        tex_width: u32,
        tex_height: u32,
    },
    #[error("Bitmap holds {actual} bytes, expected {expected}")]
    BitmapSize { expected: usize, actual: usize },
    #[error("Write of {len} bytes at offset {offset} overruns buffer {buffer:?} ({capacity} bytes)")]
    BufferOverrun {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error("Texture slot {0} is out of range")]
    InvalidSlot(u32),
    #[error("No texture bound to slot 0 for draw")]
    NoTextureBound,
    #[error("Draw of {vertex_count} vertices reads past buffer {buffer:?}")]
    DrawOutOfRange {
        buffer: BufferHandle,
        vertex_count: usize,
    },
    #[error("Texture {0:?} cannot be used as a render target")]
    InvalidTarget(TextureHandle),
}

/// Failures from `build_font`.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),
    #[error("Atlas upload failed: {0}")]
    Device(#[from] DeviceError),
    #[error("Character range {first:?}..={last:?} is empty")]
    EmptyRange { first: char, last: char },
    #[error("Atlas would be {width}x{height}, over the {max} px texture limit; lower the point size or narrow the character range")]
    TooLarge { width: u32, height: u32, max: u32 },
}
