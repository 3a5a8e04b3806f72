//! CPU rasterizing device.
//!
//! Draws triangle lists into RGBA8 framebuffers the same way the fixed-function
//! text shader does on a GPU: positions go through an orthographic projection
//! and a viewport transform, the fragment colour is the text colour with the
//! alpha sampled from the texture bound to slot 0, and the result is blended
//! source-over onto the target.
//!
//! Pixel centres are sampled at `+0.5` and shared triangle edges use a
//! top-left style ownership rule, so the two triangles of a quad never blend
//! the same pixel twice.

use std::io::{self, Write};

use log::{debug, info, trace};

use super::memory::{DeviceMemory, TextureStorage};
use super::{
    ortho_projection, project, BufferHandle, ClearColor, DrawTarget, FilterMode, GraphicsDevice,
    TextureDescriptor, TextureFormat, TextureHandle, WrapMode,
};
use crate::batch::{Vertex, VERTEX_BYTES};
use crate::error::DeviceError;

/// Straight-alpha RGBA8 screen plus CPU texture and buffer memory.
#[derive(Debug)]
pub struct SoftwareDevice {
    memory: DeviceMemory,
    width: u32,
    height: u32,
    screen: Vec<u8>,
    text_color: [u8; 3],
    draw_calls: usize,
}

impl SoftwareDevice {
    pub fn new(width: u32, height: u32) -> Self {
        info!("SoftwareDevice::new({}x{})", width, height);
        Self {
            memory: DeviceMemory::new(),
            width,
            height,
            screen: vec![0; width as usize * height as usize * 4],
            text_color: [255, 255, 255],
            draw_calls: 0,
        }
    }

    /// Colour that text fragments are drawn with. White by default.
    pub fn set_text_color(&mut self, rgb: [u8; 3]) {
        self.text_color = rgb;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Screen pixels, RGBA8, rows top to bottom.
    pub fn framebuffer(&self) -> &[u8] {
        &self.screen
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.screen[i], self.screen[i + 1], self.screen[i + 2], self.screen[i + 3]])
    }

    /// Pixels of an offscreen texture.
    pub fn texture_pixels(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.memory.texture(texture).map(|t| t.pixels.as_slice())
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn live_textures(&self) -> usize {
        self.memory.texture_count()
    }

    pub fn live_buffers(&self) -> usize {
        self.memory.buffer_count()
    }

    /// Write the screen as a binary PPM (P6). Alpha is dropped.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let rgb: Vec<u8> = self
            .screen
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        out.write_all(&rgb)?;
        out.flush()
    }

    /// Dimensions of `target`, checking that it can be rendered into.
    fn target_size(&self, target: DrawTarget) -> Result<(u32, u32), DeviceError> {
        match target {
            DrawTarget::Screen => Ok((self.width, self.height)),
            DrawTarget::Texture(texture) => {
                let storage = self
                    .memory
                    .texture(texture)
                    .ok_or(DeviceError::UnknownTexture(texture))?;
                if storage.desc.format != TextureFormat::Rgba8 {
                    return Err(DeviceError::InvalidTarget(texture));
                }
                Ok((storage.desc.width, storage.desc.height))
            }
        }
    }

    fn target_pixels(&mut self, target: DrawTarget) -> Option<&mut Vec<u8>> {
        match target {
            DrawTarget::Screen => Some(&mut self.screen),
            DrawTarget::Texture(texture) => self.memory.texture_mut(texture).map(|t| &mut t.pixels),
        }
    }
}

impl GraphicsDevice for SoftwareDevice {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, DeviceError> {
        let handle = self.memory.create_texture(desc)?;
        debug!(
            "SoftwareDevice: Created texture {:?} {}x{} {:?}",
            handle, desc.width, desc.height, desc.format
        );
        Ok(handle)
    }

    fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bitmap: &[u8],
    ) -> Result<(), DeviceError> {
        self.memory.upload_subregion(texture, x, y, width, height, bitmap)
    }

    fn create_dynamic_buffer(&mut self, max_bytes: usize) -> Result<BufferHandle, DeviceError> {
        let handle = self.memory.create_buffer(max_bytes);
        debug!("SoftwareDevice: Created buffer {:?} ({} bytes)", handle, max_bytes);
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: usize, bytes: &[u8]) -> Result<(), DeviceError> {
        self.memory.update_buffer(buffer, offset, bytes)
    }

    fn bind_texture(&mut self, texture: TextureHandle, slot: u32) -> Result<(), DeviceError> {
        self.memory.bind_texture(texture, slot)
    }

    fn draw_triangles(
        &mut self,
        buffer: BufferHandle,
        vertex_count: usize,
        target: DrawTarget,
    ) -> Result<(), DeviceError> {
        let bytes = self
            .memory
            .buffer(buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        let byte_len = vertex_count * VERTEX_BYTES;
        if byte_len > bytes.len() {
            return Err(DeviceError::DrawOutOfRange { buffer, vertex_count });
        }
        // Buffer memory is byte-aligned, so read each vertex unaligned.
        let vertices: Vec<Vertex> = bytes[..byte_len]
            .chunks_exact(VERTEX_BYTES)
            .map(bytemuck::pod_read_unaligned::<Vertex>)
            .collect();

        let source = self.memory.bound_texture(0).ok_or(DeviceError::NoTextureBound)?;
        if target == DrawTarget::Texture(source) {
            return Err(DeviceError::InvalidTarget(source));
        }
        let (target_width, target_height) = self.target_size(target)?;

        // Take the target pixels out so the sampled texture can stay borrowed.
        let mut pixels = match self.target_pixels(target) {
            Some(pixels) => std::mem::take(pixels),
            None => return Err(DeviceError::NoTextureBound),
        };
        let result = match self.memory.texture(source) {
            Some(storage) => {
                let mut raster = TriangleRaster {
                    pixels: &mut pixels,
                    width: target_width,
                    height: target_height,
                    projection: ortho_projection(
                        0.0,
                        target_width as f32,
                        target_height as f32,
                        0.0,
                        -1.0,
                        1.0,
                    ),
                    sampler: Sampler { storage },
                    color: self.text_color,
                };
                for triangle in vertices.chunks_exact(3) {
                    raster.draw(triangle[0], triangle[1], triangle[2]);
                }
                Ok(())
            }
            None => Err(DeviceError::UnknownTexture(source)),
        };
        if let Some(slot) = self.target_pixels(target) {
            *slot = pixels;
        }
        result?;

        self.draw_calls += 1;
        trace!(
            "SoftwareDevice: Drew {} vertices from {:?} into {:?}",
            vertex_count,
            buffer,
            target
        );
        Ok(())
    }

    fn clear(&mut self, target: DrawTarget, color: ClearColor) -> Result<(), DeviceError> {
        self.target_size(target)?;
        let rgba = color.to_rgba8();
        if let Some(pixels) = self.target_pixels(target) {
            for px in pixels.chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), DeviceError> {
        self.memory.destroy_texture(texture)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.memory.destroy_buffer(buffer)
    }
}

/// Reads coverage from a texture with its own filter and wrap modes.
struct Sampler<'a> {
    storage: &'a TextureStorage,
}

impl Sampler<'_> {
    fn texel_alpha(&self, x: i64, y: i64) -> f32 {
        let desc = &self.storage.desc;
        let x = wrap(x, desc.width, desc.wrap);
        let y = wrap(y, desc.height, desc.wrap);
        let index = y * desc.width as usize + x;
        let byte = match desc.format {
            TextureFormat::Alpha8 => self.storage.pixels[index],
            TextureFormat::Rgba8 => self.storage.pixels[index * 4 + 3],
        };
        byte as f32 / 255.0
    }

    fn alpha(&self, u: f32, v: f32) -> f32 {
        let desc = &self.storage.desc;
        let fx = u * desc.width as f32;
        let fy = v * desc.height as f32;
        match desc.filter {
            FilterMode::Nearest => self.texel_alpha(fx.floor() as i64, fy.floor() as i64),
            FilterMode::Linear => {
                let sx = fx - 0.5;
                let sy = fy - 0.5;
                let x0 = sx.floor();
                let y0 = sy.floor();
                let tx = sx - x0;
                let ty = sy - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = self.texel_alpha(x0, y0) * (1.0 - tx) + self.texel_alpha(x0 + 1, y0) * tx;
                let bottom =
                    self.texel_alpha(x0, y0 + 1) * (1.0 - tx) + self.texel_alpha(x0 + 1, y0 + 1) * tx;
                top * (1.0 - ty) + bottom * ty
            }
        }
    }
}

fn wrap(coord: i64, size: u32, mode: WrapMode) -> usize {
    let size = size as i64;
    match mode {
        WrapMode::ClampToEdge => coord.clamp(0, size - 1) as usize,
        WrapMode::Repeat => coord.rem_euclid(size) as usize,
    }
}

/// Target pixels plus the fixed pipeline state of one draw call.
struct TriangleRaster<'a> {
    pixels: &'a mut [u8],
    width: u32,
    height: u32,
    projection: [f32; 16],
    sampler: Sampler<'a>,
    color: [u8; 3],
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    u: f32,
    v: f32,
}

fn edge(a: ScreenVertex, b: ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Whether a pixel centre lying exactly on edge `a -> b` belongs to this triangle.
fn owns_edge(a: ScreenVertex, b: ScreenVertex) -> bool {
    let dy = b.y - a.y;
    dy < 0.0 || (dy == 0.0 && b.x - a.x > 0.0)
}

fn inside(weight: f32, owned: bool) -> bool {
    weight > 0.0 || (weight == 0.0 && owned)
}

impl TriangleRaster<'_> {
    fn to_screen(&self, vertex: Vertex) -> ScreenVertex {
        let (cx, cy) = project(&self.projection, vertex.position[0], vertex.position[1]);
        ScreenVertex {
            x: (cx + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - cy) * 0.5 * self.height as f32,
            u: vertex.tex_coord[0],
            v: vertex.tex_coord[1],
        }
    }

    fn draw(&mut self, a: Vertex, b: Vertex, c: Vertex) {
        let v0 = self.to_screen(a);
        let mut v1 = self.to_screen(b);
        let mut v2 = self.to_screen(c);

        let mut area = edge(v0, v1, v2.x, v2.y);
        if area == 0.0 || !area.is_finite() {
            return;
        }
        if area < 0.0 {
            std::mem::swap(&mut v1, &mut v2);
            area = -area;
        }

        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as u32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as u32;
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil().max(0.0) as u32).min(self.width);
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil().max(0.0) as u32).min(self.height);

        let own0 = owns_edge(v1, v2);
        let own1 = owns_edge(v2, v0);
        let own2 = owns_edge(v0, v1);

        for y in min_y..max_y {
            let py = y as f32 + 0.5;
            for x in min_x..max_x {
                let px = x as f32 + 0.5;
                let w0 = edge(v1, v2, px, py);
                let w1 = edge(v2, v0, px, py);
                let w2 = edge(v0, v1, px, py);
                if !(inside(w0, own0) && inside(w1, own1) && inside(w2, own2)) {
                    continue;
                }
                let u = (w0 * v0.u + w1 * v1.u + w2 * v2.u) / area;
                let v = (w0 * v0.v + w1 * v1.v + w2 * v2.v) / area;
                let alpha = self.sampler.alpha(u, v);
                self.blend(x, y, alpha);
            }
        }
    }

    fn blend(&mut self, x: u32, y: u32, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst = &mut self.pixels[i..i + 4];
        for (channel, &src) in dst.iter_mut().take(3).zip(self.color.iter()) {
            let blended = src as f32 * alpha + *channel as f32 * (1.0 - alpha);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
        let dst_alpha = dst[3] as f32 / 255.0;
        dst[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Quad;

    fn upload_quad(device: &mut SoftwareDevice, quad: &Quad) -> BufferHandle {
        let buffer = device.create_dynamic_buffer(6 * VERTEX_BYTES).unwrap();
        let vertices = quad.vertices();
        device.update_buffer(buffer, 0, bytemuck::cast_slice(&vertices)).unwrap();
        buffer
    }

    fn solid_texture(device: &mut SoftwareDevice) -> TextureHandle {
        let desc = TextureDescriptor {
            filter: FilterMode::Nearest,
            ..TextureDescriptor::alpha_atlas(2, 2)
        };
        let texture = device.create_texture(&desc).unwrap();
        device.upload_subregion(texture, 0, 0, 2, 2, &[255; 4]).unwrap();
        texture
    }

    fn full_quad(x0: f32, y0: f32, x1: f32, y1: f32) -> Quad {
        Quad {
            x0,
            y0,
            x1,
            y1,
            u0: 0.0,
            v0: 0.0,
            u1: 1.0,
            v1: 1.0,
        }
    }

    #[test]
    fn quad_fills_exactly_its_pixels() {
        let mut device = SoftwareDevice::new(8, 8);
        device.clear(DrawTarget::Screen, ClearColor::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        let texture = solid_texture(&mut device);
        device.bind_texture(texture, 0).unwrap();
        let buffer = upload_quad(&mut device, &full_quad(2.0, 1.0, 5.0, 4.0));
        device.draw_triangles(buffer, 6, DrawTarget::Screen).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let lit = (2..5).contains(&x) && (1..4).contains(&y);
                let expected = if lit { [255, 255, 255, 255] } else { [0, 0, 0, 255] };
                assert_eq!(device.pixel(x, y), Some(expected), "pixel ({}, {})", x, y);
            }
        }
        assert_eq!(device.draw_calls(), 1);
    }

    #[test]
    fn half_coverage_blends_over_background() {
        let mut device = SoftwareDevice::new(4, 4);
        device.clear(DrawTarget::Screen, ClearColor::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        let desc = TextureDescriptor {
            filter: FilterMode::Nearest,
            ..TextureDescriptor::alpha_atlas(1, 1)
        };
        let texture = device.create_texture(&desc).unwrap();
        device.upload_subregion(texture, 0, 0, 1, 1, &[128]).unwrap();
        device.bind_texture(texture, 0).unwrap();
        let buffer = upload_quad(&mut device, &full_quad(0.0, 0.0, 1.0, 1.0));
        device.draw_triangles(buffer, 6, DrawTarget::Screen).unwrap();

        assert_eq!(device.pixel(0, 0), Some([128, 128, 128, 255]));
        assert_eq!(device.pixel(1, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn empty_draw_leaves_screen_untouched() {
        let mut device = SoftwareDevice::new(4, 4);
        device.clear(DrawTarget::Screen, ClearColor::new(0.2, 0.2, 0.2, 1.0)).unwrap();
        let before = device.framebuffer().to_vec();
        let texture = solid_texture(&mut device);
        device.bind_texture(texture, 0).unwrap();
        let buffer = device.create_dynamic_buffer(96).unwrap();
        device.draw_triangles(buffer, 0, DrawTarget::Screen).unwrap();
        assert_eq!(device.framebuffer(), before.as_slice());
    }

    #[test]
    fn renders_into_offscreen_texture() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device.create_texture(&TextureDescriptor::render_target(4, 4)).unwrap();
        let texture = solid_texture(&mut device);
        device.bind_texture(texture, 0).unwrap();
        let buffer = upload_quad(&mut device, &full_quad(0.0, 0.0, 2.0, 2.0));
        device.draw_triangles(buffer, 6, DrawTarget::Texture(target)).unwrap();

        let pixels = device.texture_pixels(target).unwrap();
        assert_eq!(&pixels[0..4], &[255, 255, 255, 255]);
        assert_eq!(&pixels[8..12], &[0, 0, 0, 0]);
        // Screen is untouched.
        assert!(device.framebuffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn alpha_texture_is_not_a_render_target() {
        let mut device = SoftwareDevice::new(4, 4);
        let texture = solid_texture(&mut device);
        let other = solid_texture(&mut device);
        device.bind_texture(texture, 0).unwrap();
        let buffer = device.create_dynamic_buffer(96).unwrap();
        assert_eq!(
            device.draw_triangles(buffer, 0, DrawTarget::Texture(other)),
            Err(DeviceError::InvalidTarget(other))
        );
        assert_eq!(
            device.draw_triangles(buffer, 0, DrawTarget::Texture(texture)),
            Err(DeviceError::InvalidTarget(texture))
        );
    }

    #[test]
    fn linear_filter_interpolates_between_texels() {
        let storage = TextureStorage {
            desc: TextureDescriptor::alpha_atlas(2, 1),
            pixels: vec![0, 255],
        };
        let sampler = Sampler { storage: &storage };
        let mid = sampler.alpha(0.5, 0.5);
        assert!((mid - 0.5).abs() < 1e-6);
        // Texel centres sample exactly, and clamping holds the edges.
        assert_eq!(sampler.alpha(0.25, 0.5), 0.0);
        assert_eq!(sampler.alpha(0.75, 0.5), 1.0);
        assert_eq!(sampler.alpha(1.0, 0.5), 1.0);
    }

    #[test]
    fn ppm_has_header_and_rgb_payload() {
        let mut device = SoftwareDevice::new(2, 1);
        device.clear(DrawTarget::Screen, ClearColor::new(1.0, 0.0, 0.0, 1.0)).unwrap();
        let mut out = Vec::new();
        device.write_ppm(&mut out).unwrap();
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[255, 0, 0, 255, 0, 0]);
    }
}
