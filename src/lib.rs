// src/lib.rs

//! Dynamic text rendering on a minimal graphics device.
//!
//! A font is rasterized once into a single-row glyph atlas (`atlas`), strings
//! are laid out into screen-space quads (`layout`), quads are packed into one
//! vertex array per frame (`batch`) and streamed to a `GraphicsDevice` with a
//! single upload and a single draw (`renderer`).

pub mod app;
pub mod atlas;
pub mod batch;
pub mod config;
pub mod device;
pub mod error;
pub mod layout;
pub mod rasterizer;
pub mod renderer;
pub mod timing;

pub use app::{FrameLimit, FrameStatus, InputSource, TextApp};
pub use atlas::{build_font, CharRange, Font, Glyph};
pub use batch::{Quad, QuadBatch, Vertex};
pub use config::Config;
pub use device::{DrawTarget, GraphicsDevice, HeadlessDevice, SoftwareDevice};
pub use error::{
    AssetLoadError, AtlasError, BatchOverflowError, DeviceError, GlyphRasterizationError,
    UnsupportedCharacter,
};
pub use layout::{layout_string, PositionedGlyph};
pub use rasterizer::{FixedGlyphSource, GlyphSource, TtfGlyphSource};
pub use renderer::{Frame, TextRenderer};
pub use timing::FrameTimer;
