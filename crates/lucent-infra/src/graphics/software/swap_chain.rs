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

use super::device::SoftwareDevice;
use super::executor::QueueOp;
use lucent_core::renderer::{
    PresentFlags, QueueId, RenderDevice, RenderError, ResourceError, SwapChain,
    TextureDescriptor, TextureFormat, TextureId, TextureUsage,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

const BACK_BUFFER_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

#[derive(Debug)]
struct BackBuffers {
    textures: Vec<TextureId>,
    width: u32,
    height: u32,
}

/// A flip-model swap chain whose back buffers are device textures.
///
/// `present` enqueues the flip on the graphics queue, behind every list
/// submitted before it, and advances the current back buffer index.
#[derive(Debug)]
pub struct SoftwareSwapChain {
    device: SoftwareDevice,
    queue: QueueId,
    buffers: RwLock<BackBuffers>,
    current: AtomicU32,
}

impl SoftwareSwapChain {
    pub(crate) fn new(
        device: SoftwareDevice,
        queue: QueueId,
        buffer_count: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let textures = Self::create_back_buffers(&device, buffer_count, width, height)?;
        log::info!("SoftwareSwapChain: {buffer_count} back buffers of {width}x{height}");
        Ok(Self {
            device,
            queue,
            buffers: RwLock::new(BackBuffers {
                textures,
                width,
                height,
            }),
            current: AtomicU32::new(0),
        })
    }

    fn create_back_buffers(
        device: &SoftwareDevice,
        count: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<TextureId>, RenderError> {
        if count < 2 {
            return Err(RenderError::InitializationFailed(format!(
                "a flip-model swap chain needs at least 2 buffers, got {count}"
            )));
        }
        (0..count)
            .map(|index| {
                let label = format!("back_buffer_{index}");
                device
                    .create_texture(&TextureDescriptor::new_2d(
                        &label,
                        width,
                        height,
                        BACK_BUFFER_FORMAT,
                        TextureUsage::RENDER_TARGET,
                    ))
                    .map_err(RenderError::from)
            })
            .collect()
    }

    fn destroy_back_buffers(&self, textures: &[TextureId]) {
        for texture in textures {
            if let Err(err) = self.device.destroy_texture(*texture) {
                log::warn!("SoftwareSwapChain: failed to destroy {texture:?}: {err}");
            }
        }
    }
}

impl SwapChain for SoftwareSwapChain {
    fn current_back_buffer_index(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    fn buffer_count(&self) -> u32 {
        self.buffers.read().textures.len() as u32
    }

    fn back_buffer(&self, index: u32) -> Result<TextureId, ResourceError> {
        self.buffers
            .read()
            .textures
            .get(index as usize)
            .copied()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn extent(&self) -> (u32, u32) {
        let buffers = self.buffers.read();
        (buffers.width, buffers.height)
    }

    fn present(&self, sync_interval: u32, flags: PresentFlags) -> Result<(), RenderError> {
        if self.device.is_removed() {
            return Err(RenderError::DeviceLost);
        }
        if flags.allow_tearing && sync_interval != 0 {
            return Err(RenderError::PresentFailed(
                "tearing requires a sync interval of 0".into(),
            ));
        }
        let index = self.current_back_buffer_index();
        self.device.internal().send(
            self.queue,
            QueueOp::Present {
                back_buffer_index: index,
            },
        )?;
        self.current
            .store((index + 1) % self.buffer_count(), Ordering::Release);
        Ok(())
    }

    fn resize_buffers(&self, buffer_count: u32, width: u32, height: u32) -> Result<(), RenderError> {
        let mut buffers = self.buffers.write();
        let textures = Self::create_back_buffers(&self.device, buffer_count, width, height)?;
        let old = std::mem::replace(&mut buffers.textures, textures);
        self.destroy_back_buffers(&old);
        buffers.width = width;
        buffers.height = height;
        self.current.store(0, Ordering::Release);
        log::info!("SoftwareSwapChain: resized to {buffer_count} buffers of {width}x{height}");
        Ok(())
    }
}

impl Drop for SoftwareSwapChain {
    fn drop(&mut self) {
        let textures = std::mem::take(&mut self.buffers.get_mut().textures);
        self.destroy_back_buffers(&textures);
    }
}
