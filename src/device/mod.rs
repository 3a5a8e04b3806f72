// src/device/mod.rs

//! GraphicsDevice trait - the minimal interface the text pipeline needs from a GPU.
//!
//! The core never creates a window or a context. It asks the device for one
//! atlas texture, one dynamic vertex buffer, and then per frame issues
//! `update_buffer` → `bind_texture` → `draw_triangles`. Everything else
//! (shader programs, blend state, swap chains) is the device's business.
//!
//! ## Implementations
//! - `HeadlessDevice`: records calls and keeps CPU copies of memory (tests)
//! - `SoftwareDevice`: rasterizes triangles into RGBA framebuffers on the CPU

pub mod headless;
pub mod memory;
pub mod software;

pub use headless::{DeviceCommand, HeadlessDevice};
pub use software::SoftwareDevice;

use crate::error::DeviceError;

/// Opaque texture id handed out by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque buffer id handed out by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Pixel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// One coverage byte per pixel. Used for the glyph atlas.
    Alpha8,
    /// Four bytes per pixel, straight alpha. Usable as a render target.
    Rgba8,
}

impl TextureFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Alpha8 => 1,
            TextureFormat::Rgba8 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Everything a device needs to allocate a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl TextureDescriptor {
    /// Single-channel, linearly filtered, edge-clamped. The atlas format.
    pub const fn alpha_atlas(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Alpha8,
            filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
        }
    }

    /// An RGBA texture suitable for offscreen rendering.
    pub const fn render_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Where a draw call lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// The presentable surface.
    Screen,
    /// An offscreen RGBA texture (render-to-texture).
    Texture(TextureHandle),
}

/// Clear colour, straight alpha, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Number of texture units a device must expose.
pub const MAX_TEXTURE_SLOTS: u32 = 8;

/// Minimal GPU interface used by the atlas builder and the text renderer.
///
/// Calls are synchronous from the caller's point of view. Handles are only
/// meaningful to the device that produced them.
pub trait GraphicsDevice {
    /// Allocate a zero-initialised texture.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, DeviceError>;

    /// Copy `bitmap` (tightly packed rows, texture format) into a sub-rectangle.
    fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bitmap: &[u8],
    ) -> Result<(), DeviceError>;

    /// Allocate a buffer that will be rewritten every frame.
    fn create_dynamic_buffer(&mut self, max_bytes: usize) -> Result<BufferHandle, DeviceError>;

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError>;

    fn bind_texture(&mut self, texture: TextureHandle, slot: u32) -> Result<(), DeviceError>;

    /// Draw `vertex_count` vertices from `buffer` as a triangle list, sampling
    /// the texture bound to slot 0.
    fn draw_triangles(
        &mut self,
        buffer: BufferHandle,
        vertex_count: usize,
        target: DrawTarget,
    ) -> Result<(), DeviceError>;

    fn clear(&mut self, target: DrawTarget, color: ClearColor) -> Result<(), DeviceError>;

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), DeviceError>;

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError>;
}

/// Orthographic projection in the style of `glOrtho`, row-major.
///
/// With `bottom = height` and `top = 0` this maps pixel coordinates with a
/// top-left origin onto clip space, which is the convention the layout engine
/// produces.
pub fn ortho_projection(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> [f32; 16] {
    [
        2.0 / (right - left),
        0.0,
        0.0,
        -((right + left) / (right - left)),
        0.0,
        2.0 / (top - bottom),
        0.0,
        -((top + bottom) / (top - bottom)),
        0.0,
        0.0,
        -2.0 / (far - near),
        -((far + near) / (far - near)),
        0.0,
        0.0,
        0.0,
        1.0,
    ]
}

/// Apply a row-major 4x4 matrix to `(x, y, 0, 1)` and return clip-space `(x, y)`.
pub fn project(matrix: &[f32; 16], x: f32, y: f32) -> (f32, f32) {
    let cx = matrix[0] * x + matrix[1] * y + matrix[3];
    let cy = matrix[4] * x + matrix[5] * y + matrix[7];
    let w = matrix[12] * x + matrix[13] * y + matrix[15];
    (cx / w, cy / w)
}
