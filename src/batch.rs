// src/batch.rs

//! Quad batch accumulator.
//!
//! Collects every quad drawn in a frame into one flat vertex array that can be
//! uploaded with a single buffer write. Each quad expands to six vertices (two
//! triangles). The vertex array is allocated once for the full capacity and
//! only ever cleared, never regrown.

use bytemuck::{Pod, Zeroable};
use log::trace;

use crate::error::BatchOverflowError;

/// Vertices emitted per quad (two triangles, no index buffer).
pub const QUAD_VERTICES: usize = 6;

/// Byte stride of one `Vertex`. The device reads the buffer with this stride.
pub const VERTEX_BYTES: usize = std::mem::size_of::<Vertex>();

/// Bytes one quad occupies in the vertex buffer.
pub const QUAD_BYTES: usize = QUAD_VERTICES * VERTEX_BYTES;

/// One vertex as laid out in the GPU buffer: position then texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// A screen-space rectangle plus the atlas rectangle it samples.
///
/// Positions are in pixels with a top-left origin and `y` growing downward.
/// Texture coordinates are normalised, `v = 0` being the top row of the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl Quad {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Two counter-clockwise triangles (in a y-down frame) covering the quad.
    pub fn vertices(&self) -> [Vertex; QUAD_VERTICES] {
        let top_left = Vertex {
            position: [self.x0, self.y0],
            tex_coord: [self.u0, self.v0],
        };
        let top_right = Vertex {
            position: [self.x1, self.y0],
            tex_coord: [self.u1, self.v0],
        };
        let bottom_left = Vertex {
            position: [self.x0, self.y1],
            tex_coord: [self.u0, self.v1],
        };
        let bottom_right = Vertex {
            position: [self.x1, self.y1],
            tex_coord: [self.u1, self.v1],
        };
        [
            bottom_right,
            bottom_left,
            top_left,
            bottom_right,
            top_left,
            top_right,
        ]
    }
}

/// Fixed-capacity per-frame vertex storage.
#[derive(Debug, Clone)]
pub struct QuadBatch {
    vertices: Vec<Vertex>,
    max_quads: usize,
}

impl QuadBatch {
    pub fn new(max_quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_quads * QUAD_VERTICES),
            max_quads,
        }
    }

    /// Drop all quads. Keeps the allocation.
    pub fn reset(&mut self) {
        self.vertices.clear();
    }

    /// Append one quad, or report overflow without touching the batch.
    pub fn push_quad(&mut self, quad: &Quad) -> Result<(), BatchOverflowError> {
        if self.is_full() {
            trace!("QuadBatch: overflow at {} quads", self.max_quads);
            return Err(BatchOverflowError {
                capacity: self.max_quads,
            });
        }
        self.vertices.extend_from_slice(&quad.vertices());
        Ok(())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The packed vertex data, ready for `update_buffer`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / QUAD_VERTICES
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_quads
    }

    /// Bytes needed to hold a full batch on the device.
    pub fn byte_capacity(&self) -> usize {
        self.max_quads * QUAD_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.quad_count() >= self.max_quads
    }
}
