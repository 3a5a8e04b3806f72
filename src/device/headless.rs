//! Headless recording device.
//!
//! Every call is appended to a command log and memory is kept on the CPU, so
//! tests can assert on call order and inspect atlas pixels or uploaded vertices.

use log::{info, trace};

use super::memory::DeviceMemory;
use super::{
    BufferHandle, ClearColor, DrawTarget, GraphicsDevice, TextureDescriptor, TextureHandle,
};
use crate::error::DeviceError;

/// One recorded device call. Payloads are summarised, not copied.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateTexture(TextureHandle, TextureDescriptor),
    UploadSubregion {
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    CreateDynamicBuffer(BufferHandle, usize),
    UpdateBuffer {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
    },
    BindTexture(TextureHandle, u32),
    DrawTriangles {
        buffer: BufferHandle,
        vertex_count: usize,
        target: DrawTarget,
    },
    Clear(DrawTarget, ClearColor),
    DestroyTexture(TextureHandle),
    DestroyBuffer(BufferHandle),
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    memory: DeviceMemory,
    commands: Vec<DeviceCommand>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        info!("HeadlessDevice::new()");
        Self::default()
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the command log, e.g. between frames.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn texture_pixels(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.memory.texture(texture).map(|t| t.pixels.as_slice())
    }

    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.memory.texture(texture).map(|t| t.desc)
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.memory.buffer(buffer)
    }

    pub fn live_textures(&self) -> usize {
        self.memory.texture_count()
    }

    pub fn live_buffers(&self) -> usize {
        self.memory.buffer_count()
    }

    fn record(&mut self, command: DeviceCommand) {
        trace!("HeadlessDevice: {:?}", command);
        self.commands.push(command);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, DeviceError> {
        let handle = self.memory.create_texture(desc)?;
        self.record(DeviceCommand::CreateTexture(handle, *desc));
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
        self.memory
            .upload_subregion(texture, x, y, width, height, bitmap)?;
        self.record(DeviceCommand::UploadSubregion {
            texture,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn create_dynamic_buffer(&mut self, max_bytes: usize) -> Result<BufferHandle, DeviceError> {
        let handle = self.memory.create_buffer(max_bytes);
        self.record(DeviceCommand::CreateDynamicBuffer(handle, max_bytes));
        Ok(handle)
    }

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        self.memory.update_buffer(buffer, offset, bytes)?;
        self.record(DeviceCommand::UpdateBuffer {
            buffer,
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn bind_texture(&mut self, texture: TextureHandle, slot: u32) -> Result<(), DeviceError> {
        self.memory.bind_texture(texture, slot)?;
        self.record(DeviceCommand::BindTexture(texture, slot));
        Ok(())
    }

    fn draw_triangles(
        &mut self,
        buffer: BufferHandle,
        vertex_count: usize,
        target: DrawTarget,
    ) -> Result<(), DeviceError> {
        let capacity = self
            .memory
            .buffer(buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?
            .len();
        if vertex_count * crate::batch::VERTEX_BYTES > capacity {
            return Err(DeviceError::DrawOutOfRange {
                buffer,
                vertex_count,
            });
        }
        if self.memory.bound_texture(0).is_none() {
            return Err(DeviceError::NoTextureBound);
        }
        if let DrawTarget::Texture(texture) = target {
            if self.memory.texture(texture).is_none() {
                return Err(DeviceError::UnknownTexture(texture));
            }
        }
        self.record(DeviceCommand::DrawTriangles {
            buffer,
            vertex_count,
            target,
        });
        Ok(())
    }

    fn clear(&mut self, target: DrawTarget, color: ClearColor) -> Result<(), DeviceError> {
        if let DrawTarget::Texture(texture) = target {
            if self.memory.texture(texture).is_none() {
                return Err(DeviceError::UnknownTexture(texture));
            }
        }
        self.record(DeviceCommand::Clear(target, color));
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<(), DeviceError> {
        self.memory.destroy_texture(texture)?;
        self.record(DeviceCommand::DestroyTexture(texture));
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.memory.destroy_buffer(buffer)?;
        self.record(DeviceCommand::DestroyBuffer(buffer));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut device = HeadlessDevice::new();
        let tex = device
            .create_texture(&TextureDescriptor::alpha_atlas(2, 2))
            .unwrap();
        let buf = device.create_dynamic_buffer(96).unwrap();
        device.update_buffer(buf, 0, &[0; 96]).unwrap();
        device.bind_texture(tex, 0).unwrap();
        device.draw_triangles(buf, 6, DrawTarget::Screen).unwrap();

        let commands = device.commands();
        assert_eq!(commands.len(), 5);
        assert!(matches!(commands[0], DeviceCommand::CreateTexture(h, _) if h == tex));
        assert_eq!(commands[1], DeviceCommand::CreateDynamicBuffer(buf, 96));
        assert_eq!(
            commands[2],
            DeviceCommand::UpdateBuffer {
                buffer: buf,
                offset: 0,
                len: 96
            }
        );
        assert_eq!(commands[3], DeviceCommand::BindTexture(tex, 0));
        assert_eq!(
            commands[4],
            DeviceCommand::DrawTriangles {
                buffer: buf,
                vertex_count: 6,
                target: DrawTarget::Screen
            }
        );
    }

    #[test]
    fn draw_without_bound_texture_fails() {
        let mut device = HeadlessDevice::new();
        let buf = device.create_dynamic_buffer(96).unwrap();
        assert_eq!(
            device.draw_triangles(buf, 6, DrawTarget::Screen),
            Err(DeviceError::NoTextureBound)
        );
    }

    #[test]
    fn draw_past_buffer_end_fails() {
        let mut device = HeadlessDevice::new();
        let tex = device
            .create_texture(&TextureDescriptor::alpha_atlas(2, 2))
            .unwrap();
        device.bind_texture(tex, 0).unwrap();
        let buf = device.create_dynamic_buffer(96).unwrap();
        assert!(matches!(
            device.draw_triangles(buf, 7, DrawTarget::Screen),
            Err(DeviceError::DrawOutOfRange { vertex_count: 7, .. })
        ));
    }

    #[test]
    fn failed_calls_are_not_recorded() {
        let mut device = HeadlessDevice::new();
        let _ = device.bind_texture(TextureHandle(42), 0);
        assert!(device.commands().is_empty());
    }
}
