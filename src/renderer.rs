// src/renderer.rs

//! Per-frame text pipeline.
//!
//! `TextRenderer` owns the quad batch and the device buffer it is streamed
//! into. A frame is a `Frame` guard: it is created by `begin_frame` (which
//! resets the batch), collects quads, and is consumed by `submit`, which
//! uploads the whole batch once and issues one draw. Uploading twice or
//! drawing before the upload cannot be expressed.

use log::{debug, trace};

use crate::atlas::Font;
use crate::batch::{Quad, QuadBatch};
use crate::device::{BufferHandle, DrawTarget, GraphicsDevice, TextureHandle};
use crate::error::{BatchOverflowError, DeviceError};
use crate::layout::layout_string;

/// Slot the atlas texture is bound to for drawing.
pub const ATLAS_TEXTURE_SLOT: u32 = 0;

#[derive(Debug)]
pub struct TextRenderer {
    batch: QuadBatch,
    buffer: BufferHandle,
}

impl TextRenderer {
    /// Allocate a batch for `max_quads` quads and a device buffer that holds it.
    pub fn new<D: GraphicsDevice>(device: &mut D, max_quads: usize) -> Result<Self, DeviceError> {
        let batch = QuadBatch::new(max_quads);
        let buffer = device.create_dynamic_buffer(batch.byte_capacity())?;
        debug!(
            "TextRenderer: {} quads, {} byte vertex buffer {:?}",
            max_quads,
            batch.byte_capacity(),
            buffer
        );
        Ok(Self { batch, buffer })
    }

    pub fn max_quads(&self) -> usize {
        self.batch.capacity()
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Start a frame with an empty batch.
    pub fn begin_frame(&mut self) -> Frame<'_> {
        self.batch.reset();
        Frame { renderer: self }
    }

    /// Free the vertex buffer.
    pub fn release<D: GraphicsDevice>(self, device: &mut D) -> Result<(), DeviceError> {
        debug!("TextRenderer: Releasing buffer {:?}", self.buffer);
        device.destroy_buffer(self.buffer)
    }
}

/// Quads collected for one frame.
#[derive(Debug)]
#[must_use = "a frame draws nothing until it is submitted"]
pub struct Frame<'a> {
    renderer: &'a mut TextRenderer,
}

impl Frame<'_> {
    /// Lay out `text` and append its quads.
    ///
    /// On overflow the quads that fit stay in the batch, so the string is
    /// truncated rather than dropped. Returns the number of quads added.
    pub fn draw_text(&mut self, font: &Font, text: &str, x: f32, y: f32) -> Result<usize, BatchOverflowError> {
        let mut added = 0;
        for glyph in layout_string(font, text, x, y) {
            self.renderer.batch.push_quad(&glyph.quad)?;
            added += 1;
        }
        trace!("Frame: {:?} -> {} quads", text, added);
        Ok(added)
    }

    pub fn push_quad(&mut self, quad: &Quad) -> Result<(), BatchOverflowError> {
        self.renderer.batch.push_quad(quad)
    }

    pub fn quad_count(&self) -> usize {
        self.renderer.batch.quad_count()
    }

    pub fn is_full(&self) -> bool {
        self.renderer.batch.is_full()
    }

    /// Upload the batch, bind the font's atlas and draw everything in one call.
    ///
    /// An empty frame still uploads and draws (zero vertices). Returns the
    /// number of quads drawn.
    pub fn submit<D: GraphicsDevice>(self, device: &mut D, font: &Font, target: DrawTarget) -> Result<usize, DeviceError> {
        self.submit_with_texture(device, font.texture(), target)
    }

    /// Like `submit`, but samples an arbitrary texture instead of a font atlas.
    pub fn submit_with_texture<D: GraphicsDevice>(
        self,
        device: &mut D,
        texture: TextureHandle,
        target: DrawTarget,
    ) -> Result<usize, DeviceError> {
        let renderer = self.renderer;
        let batch = &renderer.batch;
        device.update_buffer(renderer.buffer, 0, batch.as_bytes())?;
        device.bind_texture(texture, ATLAS_TEXTURE_SLOT)?;
        device.draw_triangles(renderer.buffer, batch.vertex_count(), target)?;
        trace!("Frame: Submitted {} quads to {:?}", batch.quad_count(), target);
        Ok(batch.quad_count())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::atlas::{build_font, CharRange};
    use crate::batch::{QUAD_BYTES, QUAD_VERTICES, VERTEX_BYTES};
    use crate::device::{DeviceCommand, HeadlessDevice};
    use crate::rasterizer::{FixedGlyphSource, GlyphSpec};

    fn setup(max_quads: usize) -> (HeadlessDevice, Font, TextRenderer) {
        let source = FixedGlyphSource::new(16.0)
            .with('A', GlyphSpec::solid(10, 14, 12, 1, 12))
            .with('B', GlyphSpec::solid(11, 14, 13, 1, 12))
            .with(' ', GlyphSpec::blank(5));
        let mut device = HeadlessDevice::new();
        let font = build_font(&source, &mut device, Path::new("mock"), 16.0, CharRange::new(' ', 'B')).unwrap();
        let renderer = TextRenderer::new(&mut device, max_quads).unwrap();
        device.take_commands();
        (device, font, renderer)
    }

    #[test]
    fn buffer_is_sized_for_capacity() {
        let mut device = HeadlessDevice::new();
        let _renderer = TextRenderer::new(&mut device, 10).unwrap();
        assert!(matches!(
            device.commands()[0],
            DeviceCommand::CreateDynamicBuffer(_, bytes) if bytes == 10 * QUAD_BYTES
        ));
    }

    #[test_log::test]
    fn frame_uploads_then_binds_then_draws() {
        let (mut device, font, mut renderer) = setup(16);
        let mut frame = renderer.begin_frame();
        assert_eq!(frame.draw_text(&font, "AB", 0.0, 0.0), Ok(2));
        assert_eq!(frame.submit(&mut device, &font, DrawTarget::Screen), Ok(2));

        let buffer = renderer.buffer();
        assert_eq!(
            device.commands(),
            &[
                DeviceCommand::UpdateBuffer {
                    buffer,
                    offset: 0,
                    len: 2 * QUAD_BYTES
                },
                DeviceCommand::BindTexture(font.texture(), ATLAS_TEXTURE_SLOT),
                DeviceCommand::DrawTriangles {
                    buffer,
                    vertex_count: 2 * QUAD_VERTICES,
                    target: DrawTarget::Screen
                },
            ]
        );
    }

    #[test]
    fn uploaded_vertices_match_layout() {
        let (mut device, font, mut renderer) = setup(4);
        let mut frame = renderer.begin_frame();
        frame.draw_text(&font, "A", 0.0, 0.0).unwrap();
        frame.submit(&mut device, &font, DrawTarget::Screen).unwrap();

        let bytes = device.buffer_contents(renderer.buffer()).unwrap();
        let first: [f32; 4] = bytemuck::pod_read_unaligned(&bytes[..VERTEX_BYTES]);
        // Bottom-right corner of 'A' at (1,4) 10x14.
        assert_eq!((first[0], first[1]), (11.0, 18.0));
    }

    #[test]
    fn empty_frame_still_submits() {
        let (mut device, font, mut renderer) = setup(4);
        let frame = renderer.begin_frame();
        assert_eq!(frame.submit(&mut device, &font, DrawTarget::Screen), Ok(0));
        let commands = device.commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], DeviceCommand::UpdateBuffer { len: 0, .. }));
        assert!(matches!(commands[2], DeviceCommand::DrawTriangles { vertex_count: 0, .. }));
    }

    #[test]
    fn each_frame_starts_empty() {
        let (mut device, font, mut renderer) = setup(8);
        for _ in 0..3 {
            let mut frame = renderer.begin_frame();
            assert_eq!(frame.quad_count(), 0);
            frame.draw_text(&font, "ABBA", 0.0, 0.0).unwrap();
            assert_eq!(frame.quad_count(), 4);
            frame.submit(&mut device, &font, DrawTarget::Screen).unwrap();
        }
        let draws = device
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::DrawTriangles { vertex_count: 24, .. }))
            .count();
        assert_eq!(draws, 3);
    }

    #[test]
    fn overflow_truncates_and_reports() {
        let (mut device, font, mut renderer) = setup(3);
        let mut frame = renderer.begin_frame();
        assert_eq!(
            frame.draw_text(&font, "ABAB", 0.0, 0.0),
            Err(BatchOverflowError { capacity: 3 })
        );
        assert_eq!(frame.quad_count(), 3);
        assert!(frame.is_full());
        assert_eq!(frame.submit(&mut device, &font, DrawTarget::Screen), Ok(3));
    }

    #[test]
    fn release_frees_the_buffer() {
        let (mut device, font, renderer) = setup(2);
        assert_eq!(device.live_buffers(), 1);
        renderer.release(&mut device).unwrap();
        font.release(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_textures(), 0);
    }
}
