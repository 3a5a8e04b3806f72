// src/device/memory.rs

//! CPU-side storage for textures and buffers, shared by the in-process devices.
//!
//! Both `HeadlessDevice` and `SoftwareDevice` keep their "GPU" memory in
//! ordinary vectors. This module owns the handle allocation and the bounds
//! checks so the two devices report identical `DeviceError`s.

use std::collections::HashMap;

use super::{BufferHandle, TextureDescriptor, TextureHandle, MAX_TEXTURE_SLOTS};
use crate::error::DeviceError;

/// Largest texture edge accepted, matching common GLES2 limits.
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

#[derive(Debug, Clone)]
pub struct TextureStorage {
    pub desc: TextureDescriptor,
    pub pixels: Vec<u8>,
}

impl TextureStorage {
    pub fn row_stride(&self) -> usize {
        self.desc.width as usize * self.desc.format.bytes_per_pixel()
    }
}

#[derive(Debug, Default)]
pub struct DeviceMemory {
    next_id: u32,
    textures: HashMap<TextureHandle, TextureStorage>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    slots: [Option<TextureHandle>; MAX_TEXTURE_SLOTS as usize],
}

impl DeviceMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        // Zero is never handed out, mirroring GL object names.
        self.next_id += 1;
        self.next_id
    }

    pub fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, DeviceError> {
        if desc.width == 0
            || desc.height == 0
            || desc.width > MAX_TEXTURE_DIMENSION
            || desc.height > MAX_TEXTURE_DIMENSION
        {
            return Err(DeviceError::InvalidTextureSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let handle = TextureHandle(self.next_id());
        self.textures.insert(
            handle,
            TextureStorage {
                desc: *desc,
                pixels: vec![0; desc.byte_len()],
            },
        );
        Ok(handle)
    }

    pub fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bitmap: &[u8],
    ) -> Result<(), DeviceError> {
        let storage = self
            .textures
            .get_mut(&texture)
            .ok_or(DeviceError::UnknownTexture(texture))?;

        let tex_width = storage.desc.width;
        let tex_height = storage.desc.height;
        let fits = x.checked_add(width).is_some_and(|r| r <= tex_width)
            && y.checked_add(height).is_some_and(|b| b <= tex_height);
        if !fits {
            return Err(DeviceError::UploadOutOfBounds {
                texture,
                x,
                y,
                width,
                height,
                tex_width,
                tex_height,
            });
        }

        let bpp = storage.desc.format.bytes_per_pixel();
        let src_stride = width as usize * bpp;
        let expected = src_stride * height as usize;
        if bitmap.len() != expected {
            return Err(DeviceError::BitmapSize {
                expected,
                actual: bitmap.len(),
            });
        }

        let dst_stride = storage.row_stride();
        for (row, src) in bitmap.chunks_exact(src_stride.max(1)).enumerate() {
            if src_stride == 0 {
                break;
            }
            let start = (y as usize + row) * dst_stride + x as usize * bpp;
            storage.pixels[start..start + src_stride].copy_from_slice(src);
        }
        Ok(())
    }

    pub fn create_buffer(&mut self, max_bytes: usize) -> BufferHandle {
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, vec![0; max_bytes]);
        handle
    }

    pub fn update_buffer(&mut self, buffer: BufferHandle, offset: usize, bytes: &[u8]) -> Result<(), DeviceError> {
        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        let end = offset.checked_add(bytes.len());
        match end {
            Some(end) if end <= storage.len() => {
                storage[offset..end].copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(DeviceError::BufferOverrun {
                buffer,
                offset,
                len: bytes.len(),
                capacity: storage.len(),
            }),
        }
    }

    pub fn bind_texture(&mut self, texture: TextureHandle, slot: u32) -> Result<(), DeviceError> {
        if slot >= MAX_TEXTURE_SLOTS {
            return Err(DeviceError::InvalidSlot(slot));
        }
        if !self.textures.contains_key(&texture) {
            return Err(DeviceError::UnknownTexture(texture));
        }
        self.slots[slot as usize] = Some(texture);
        Ok(())
    }

    pub fn bound_texture(&self, slot: u32) -> Option<TextureHandle> {
        self.slots.get(slot as usize).copied().flatten()
    }

    pub fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), DeviceError> {
        self.textures
            .remove(&texture)
            .ok_or(DeviceError::UnknownTexture(texture))?;
        for slot in self.slots.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
        Ok(())
    }

    pub fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.buffers
            .remove(&buffer)
            .map(|_| ())
            .ok_or(DeviceError::UnknownBuffer(buffer))
    }

    pub fn texture(&self, texture: TextureHandle) -> Option<&TextureStorage> {
        self.textures.get(&texture)
    }

    pub fn texture_mut(&mut self, texture: TextureHandle) -> Option<&mut TextureStorage> {
        self.textures.get_mut(&texture)
    }

    pub fn buffer(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}
