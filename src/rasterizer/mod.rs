//! Glyph metrics sources.
//!
//! The atlas builder talks to fonts only through the `GlyphSource` trait.
//! `TtfGlyphSource` reads real font files; `FixedGlyphSource` serves a
//! fixed table for tests and font-less runs.

pub mod fixed_glyph_source;
pub mod glyph_source;
pub mod ttf_glyph_source;

pub use fixed_glyph_source::{FixedFace, FixedGlyphSource, GlyphSpec};
pub use glyph_source::{GlyphSource, RasterizedGlyph};
pub use ttf_glyph_source::{TtfFace, TtfGlyphSource};
