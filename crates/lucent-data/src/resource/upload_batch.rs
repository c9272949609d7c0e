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

//! Staging of buffer and texture data through an upload heap.
//!
//! An [`UploadBatch`] owns one copy command list and one staging buffer whose
//! size is a bounded fraction of device memory. Every `add_*` call
//! sub-allocates the staging buffer, writes the bytes through its mapped
//! memory and records a copy. When staging space runs out the batch flushes:
//! it submits, blocks until the GPU is done, clears the staging allocator and
//! reopens the list. Requests larger than the whole staging buffer are split
//! into chunks that fit.
//!
//! The CPU only waits at flush boundaries. [`UploadBatch::finish`] submits
//! the last chunk without waiting and returns the event to wait on.

use crate::memory::{VirtualAllocation, VirtualBlock};
use crate::resource::OwnedBuffer;
use crate::sync::{CommandQueue, FenceEvent};
use lucent_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, CommandList, DeviceCapabilities, RenderError,
    ResourceError, TextureFormat, TextureId, TextureRegion,
};
use lucent_core::Stopwatch;
use std::sync::Arc;

/// Staging offsets of buffer copies are kept 4-byte aligned.
const BUFFER_COPY_ALIGNMENT: u64 = 4;

/// Sizing policy of the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadConfig {
    /// Fraction of the device's video memory used for staging.
    pub memory_fraction: f64,
    /// Absolute ceiling of the staging buffer, in bytes.
    pub max_staging_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            memory_fraction: 1.0 / 16.0,
            max_staging_bytes: 64 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    /// Staging size for a device with `capabilities`.
    pub fn staging_size(&self, capabilities: &DeviceCapabilities) -> u64 {
        let budget = (capabilities.dedicated_video_memory as f64 * self.memory_fraction) as u64;
        budget
            .min(self.max_staging_bytes)
            .max(capabilities.texture_placement_alignment)
    }
}

/// Counters describing what a batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Copy commands recorded.
    pub chunks: u32,
    /// Flushes forced by a full staging buffer.
    pub flushes: u32,
    /// Submissions to the queue, including the final one.
    pub submissions: u32,
    /// Bytes written to staging memory, row padding included.
    pub bytes_staged: u64,
}

/// What [`UploadBatch::finish`] hands back.
#[derive(Debug)]
pub struct UploadReceipt {
    /// Reached once every recorded copy has executed. Keeps the staging
    /// buffer alive until then.
    pub event: FenceEvent,
    /// Final counters.
    pub stats: UploadStats,
}

/// A batch of copies through one staging buffer on one queue.
pub struct UploadBatch<'q> {
    queue: &'q CommandQueue,
    list: Box<dyn CommandList>,
    staging: Arc<OwnedBuffer>,
    block: VirtualBlock,
    row_pitch_alignment: u64,
    placement_alignment: u64,
    stats: UploadStats,
    timer: Stopwatch,
}

impl<'q> UploadBatch<'q> {
    /// Opens a copy list on `queue` and creates the staging buffer.
    pub fn begin(
        queue: &'q CommandQueue,
        capabilities: &DeviceCapabilities,
        config: &UploadConfig,
    ) -> Result<Self, RenderError> {
        let device = queue.device();
        let staging_size = config.staging_size(capabilities);
        let staging = OwnedBuffer::new(
            Arc::clone(device),
            &BufferDescriptor::upload("upload_staging", staging_size, BufferUsage::COPY_SRC),
        )?;
        let list = device.create_command_list(queue.kind(), Some("upload_batch"))?;
        log::debug!(
            "UploadBatch: begin on {} queue with {staging_size} staging bytes",
            queue.kind().name()
        );
        Ok(Self {
            queue,
            list,
            staging: Arc::new(staging),
            block: VirtualBlock::new(staging_size),
            row_pitch_alignment: capabilities.texture_row_pitch_alignment.max(1),
            placement_alignment: capabilities.texture_placement_alignment.max(1),
            stats: UploadStats::default(),
            timer: Stopwatch::new(),
        })
    }

    /// Total size of the staging buffer.
    pub fn staging_capacity(&self) -> u64 {
        self.block.size()
    }

    /// Counters so far.
    pub fn stats(&self) -> UploadStats {
        self.stats
    }

    /// Stages `data` and records its copy to `destination` at `destination_offset`.
    pub fn add_buffer(
        &mut self,
        destination: BufferId,
        destination_offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        if data.is_empty() {
            return Ok(());
        }
        // Requests larger than the staging buffer go through in staging-sized
        // chunks, in order.
        let capacity = self.staging_capacity() as usize;
        let mut offset = destination_offset;
        for chunk in data.chunks(capacity) {
            self.stage_buffer_chunk(destination, offset, chunk)?;
            offset += chunk.len() as u64;
        }
        Ok(())
    }

    fn stage_buffer_chunk(
        &mut self,
        destination: BufferId,
        destination_offset: u64,
        chunk: &[u8],
    ) -> Result<(), RenderError> {
        let range = self.allocate_staging(chunk.len() as u64, BUFFER_COPY_ALIGNMENT)?;
        self.staging.write(range.offset(), chunk)?;
        self.list.copy_buffer_region(
            destination,
            destination_offset,
            self.staging.id(),
            range.offset(),
            range.size(),
        );
        self.stats.chunks += 1;
        self.stats.bytes_staged += range.size();
        Ok(())
    }

    /// Stages tightly packed texel rows and records their copy into `region`
    /// of `destination`. Rows are padded to the device's row pitch alignment.
    pub fn add_texture(
        &mut self,
        destination: TextureId,
        format: TextureFormat,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let row_bytes = region.width as u64 * format.bytes_per_pixel() as u64;
        let expected = row_bytes * region.height as u64;
        if data.len() as u64 != expected {
            return Err(ResourceError::InvalidDescription(format!(
                "texture upload expects {expected} bytes for {}x{} texels, got {}",
                region.width,
                region.height,
                data.len()
            ))
            .into());
        }
        if expected == 0 {
            return Ok(());
        }

        let pitch = row_bytes.div_ceil(self.row_pitch_alignment) * self.row_pitch_alignment;
        let rows_per_chunk = self.staging_capacity() / pitch;
        if rows_per_chunk == 0 {
            return Err(ResourceError::InvalidDescription(format!(
                "one texture row of {pitch} bytes exceeds the {} byte staging buffer",
                self.staging_capacity()
            ))
            .into());
        }
        // Taller regions go through in bands of whole rows, top to bottom.
        let band_bytes = (row_bytes * rows_per_chunk) as usize;
        let mut first_row = 0u32;
        for band in data.chunks(band_bytes) {
            let band_rows = (band.len() as u64 / row_bytes) as u32;
            let band_region = region.rows(first_row, band_rows);
            self.stage_texture_band(destination, band_region, row_bytes, pitch, band)?;
            first_row += band_rows;
        }
        Ok(())
    }

    fn stage_texture_band(
        &mut self,
        destination: TextureId,
        region: TextureRegion,
        row_bytes: u64,
        pitch: u64,
        band: &[u8],
    ) -> Result<(), RenderError> {
        let staged_size = pitch * region.height as u64;
        let range = self.allocate_staging(staged_size, self.placement_alignment)?;
        let mut padded = vec![0u8; staged_size as usize];
        for (row, texels) in band.chunks_exact(row_bytes as usize).enumerate() {
            let start = row * pitch as usize;
            padded[start..start + texels.len()].copy_from_slice(texels);
        }
        self.staging.write(range.offset(), &padded)?;
        self.list
            .copy_buffer_to_texture(self.staging.id(), range.offset(), pitch, destination, region);
        self.stats.chunks += 1;
        self.stats.bytes_staged += staged_size;
        Ok(())
    }

    /// Reserves staging space, flushing once if it is full. The retry cannot
    /// fail because no request is larger than the staging buffer.
    fn allocate_staging(
        &mut self,
        size: u64,
        alignment: u64,
    ) -> Result<VirtualAllocation, RenderError> {
        if let Some(range) = self.block.allocate(size, alignment) {
            return Ok(range);
        }
        self.flush()?;
        self.block.allocate(size, alignment).ok_or_else(|| {
            RenderError::Internal(format!(
                "UploadBatch: {size} bytes do not fit an empty {} byte staging buffer",
                self.block.size()
            ))
        })
    }

    fn submit(&mut self) -> Result<FenceEvent, RenderError> {
        self.list.close()?;
        let event = self.queue.execute_and_signal(&[&*self.list], &[])?;
        self.stats.submissions += 1;
        Ok(event)
    }

    /// Submits everything recorded so far, waits for the GPU, clears the
    /// staging allocator and reopens the list.
    pub fn flush(&mut self) -> Result<(), RenderError> {
        let event = self.submit()?;
        event.wait()?;
        self.block.clear();
        self.list.reset()?;
        self.stats.flushes += 1;
        log::trace!("UploadBatch: flush #{} completed", self.stats.flushes);
        Ok(())
    }

    /// Submits the remaining copies and closes recording.
    ///
    /// Does not wait: the returned event is reached once every copy executed.
    pub fn finish(mut self) -> Result<UploadReceipt, RenderError> {
        let event = self.submit()?;
        let event = event.retain(self.staging.clone());
        log::debug!(
            "UploadBatch: finished {} chunks ({} bytes, {} flushes) in {:.2} ms",
            self.stats.chunks,
            self.stats.bytes_staged,
            self.stats.flushes,
            self.timer.elapsed_ms()
        );
        Ok(UploadReceipt {
            event,
            stats: self.stats,
        })
    }
}
