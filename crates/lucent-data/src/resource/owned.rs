// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Buffers and textures that destroy themselves when dropped.

use lucent_core::renderer::{
    BufferDescriptor, BufferId, RenderDevice, ResourceError, TextureDescriptor, TextureFormat,
    TextureId,
};
use std::fmt;
use std::sync::Arc;

/// A device buffer released when the last owner drops it.
///
/// Wrap it in an `Arc` and [`retain`](crate::sync::FenceEvent::retain) it on
/// the event of any submission that reads it, so it outlives in-flight work.
pub struct OwnedBuffer {
    device: Arc<dyn RenderDevice>,
    id: BufferId,
    size: u64,
    label: String,
}

impl OwnedBuffer {
    /// Creates the buffer described by `descriptor`.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        descriptor: &BufferDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_buffer(descriptor)?;
        Ok(Self {
            device,
            id,
            size: descriptor.size,
            label: descriptor.label.as_deref().unwrap_or("buffer").to_owned(),
        })
    }

    /// The device handle.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// GPU virtual address of the first byte.
    pub fn gpu_address(&self) -> Result<u64, ResourceError> {
        self.device.buffer_gpu_address(self.id)
    }

    /// Writes `data` at `offset` through the buffer's mapped memory.
    /// Only upload-heap buffers are CPU-writable.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        self.device.write_buffer(self.id, offset, data)
    }

    /// Reads `len` bytes at `offset` back.
    pub fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>, ResourceError> {
        self.device.read_buffer(self.id, offset, len)
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        if let Err(err) = self.device.destroy_buffer(self.id) {
            log::warn!("OwnedBuffer({}): destroy failed: {err}", self.label);
        }
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("label", &self.label)
            .finish()
    }
}

/// A device texture released when the last owner drops it.
pub struct OwnedTexture {
    device: Arc<dyn RenderDevice>,
    id: TextureId,
    width: u32,
    height: u32,
    format: TextureFormat,
    label: String,
}

impl OwnedTexture {
    /// Creates the texture described by `descriptor`.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        descriptor: &TextureDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_texture(descriptor)?;
        Ok(Self {
            device,
            id,
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            label: descriptor.label.as_deref().unwrap_or("texture").to_owned(),
        })
    }

    /// The device handle.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// `(width, height)` of mip 0.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for OwnedTexture {
    fn drop(&mut self) {
        if let Err(err) = self.device.destroy_texture(self.id) {
            log::warn!("OwnedTexture({}): destroy failed: {err}", self.label);
        }
    }
}

impl fmt::Debug for OwnedTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedTexture")
            .field("id", &self.id)
            .field("extent", &self.extent())
            .field("format", &self.format)
            .field("label", &self.label)
            .finish()
    }
}
