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

//! One thread per hardware queue, replaying submitted work in order.

use super::command::Command;
use super::state::{DeviceShared, StatCounters};
use super::timeline::{ExecutionRecord, TimelineEvent};
use crossbeam_channel::Receiver;
use lucent_core::renderer::{
    BufferId, CommandBufferId, FenceId, QueueId, QueueKind, ResourceError, TextureFormat,
    TextureId, TextureRegion, ViewDescriptor,
};
use std::sync::Arc;
use std::thread;

/// A command list as submitted: an immutable copy of its commands.
#[derive(Debug, Clone)]
pub(crate) struct RecordedList {
    pub(crate) id: CommandBufferId,
    pub(crate) label: String,
    pub(crate) commands: Arc<[Command]>,
}

#[derive(Debug)]
pub(crate) enum QueueOp {
    Execute(Vec<RecordedList>),
    Signal { fence: FenceId, value: u64 },
    Wait { fence: FenceId, value: u64 },
    Present { back_buffer_index: u32 },
    Shutdown,
}

pub(crate) struct QueueExecutor {
    queue: QueueId,
    kind: QueueKind,
    shared: Arc<DeviceShared>,
    receiver: Receiver<QueueOp>,
}

impl QueueExecutor {
    pub(crate) fn new(
        queue: QueueId,
        kind: QueueKind,
        shared: Arc<DeviceShared>,
        receiver: Receiver<QueueOp>,
    ) -> Self {
        Self {
            queue,
            kind,
            shared,
            receiver,
        }
    }

    pub(crate) fn run(self) {
        log::trace!("{} queue executor {:?} started", self.kind.name(), self.queue);
        while let Ok(op) = self.receiver.recv() {
            match op {
                QueueOp::Execute(lists) => {
                    for list in lists {
                        self.execute(list);
                    }
                }
                QueueOp::Signal { fence, value } => self.signal(fence, value),
                QueueOp::Wait { fence, value } => {
                    if !self.wait(fence, value) {
                        break;
                    }
                }
                QueueOp::Present { back_buffer_index } => self.present(back_buffer_index),
                QueueOp::Shutdown => break,
            }
        }
        log::trace!("{} queue executor {:?} stopped", self.kind.name(), self.queue);
    }

    fn record(&self, event: TimelineEvent, started: u64) {
        let finished = self.shared.timeline.tick();
        self.shared.timeline.push(ExecutionRecord {
            queue: self.queue,
            queue_kind: self.kind,
            event,
            started,
            finished,
        });
    }

    fn signal(&self, fence: FenceId, value: u64) {
        let started = self.shared.timeline.tick();
        match self.shared.fence(fence) {
            Some(entry) => entry.signal(value),
            None => log::warn!("signal of destroyed fence {fence:?} ignored"),
        }
        self.record(TimelineEvent::Signal { fence, value }, started);
    }

    /// Returns `false` when the wait was abandoned because the device is going away.
    fn wait(&self, fence: FenceId, value: u64) -> bool {
        let started = self.shared.timeline.tick();
        let Some(entry) = self.shared.fence(fence) else {
            log::warn!("wait on destroyed fence {fence:?} skipped");
            return true;
        };
        let shared = &self.shared;
        let reached = entry.wait(value, || shared.is_removed() || shared.is_shutting_down());
        if reached {
            self.record(TimelineEvent::Wait { fence, value }, started);
        }
        reached || !self.shared.is_shutting_down()
    }

    fn present(&self, back_buffer_index: u32) {
        let started = self.shared.timeline.tick();
        StatCounters::add(&self.shared.stats.presents, 1);
        self.record(TimelineEvent::Present { back_buffer_index }, started);
    }

    fn execute(&self, list: RecordedList) {
        if self.shared.is_removed() {
            return;
        }
        let started = self.shared.timeline.tick();
        let latency = self.shared.list_latency();
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        let mut state = ReplayState::default();
        let mut markers = Vec::new();
        for command in list.commands.iter() {
            if let Err(err) = self.apply(command, &mut state, &mut markers) {
                StatCounters::add(&self.shared.stats.validation_errors, 1);
                log::warn!("'{}': {command:?} rejected: {err}", list.label);
            }
        }

        StatCounters::add(&self.shared.stats.lists_executed, 1);
        self.record(
            TimelineEvent::CommandList {
                id: list.id,
                label: list.label,
                markers,
            },
            started,
        );
    }

    fn apply(
        &self,
        command: &Command,
        state: &mut ReplayState,
        markers: &mut Vec<String>,
    ) -> Result<(), ResourceError> {
        let stats = &self.shared.stats;
        match command {
            Command::CopyBufferRegion {
                destination,
                destination_offset,
                source,
                source_offset,
                size,
            } => {
                let mut buffers = self.shared.buffers.lock();
                let bytes = {
                    let src = buffers.get(source).ok_or(ResourceError::NotFound)?;
                    let range = byte_range(*source_offset, *size, src.data.len())?;
                    src.data[range].to_vec()
                };
                let dst = buffers.get_mut(destination).ok_or(ResourceError::NotFound)?;
                let range = byte_range(*destination_offset, *size, dst.data.len())?;
                dst.data[range].copy_from_slice(&bytes);
                StatCounters::add(&stats.copies, 1);
                StatCounters::add(&stats.bytes_copied, *size);
            }
            Command::CopyBufferToTexture {
                source,
                source_offset,
                row_pitch,
                destination,
                region,
            } => {
                let copied =
                    self.copy_rows(*source, *source_offset, *row_pitch, *destination, region)?;
                StatCounters::add(&stats.copies, 1);
                StatCounters::add(&stats.bytes_copied, copied);
            }
            Command::SetPipeline(pipeline) => state.pipeline = Some(pipeline.0),
            Command::SetRenderTargets { colors, depth } => {
                for target in colors {
                    self.render_target(target.0)?;
                }
                if let Some(depth) = depth {
                    self.depth_target(depth.0)?;
                }
                state.targets_bound = !colors.is_empty() || depth.is_some();
            }
            Command::SetIndexBuffer { buffer, .. } => {
                self.require_buffer(*buffer)?;
                state.index_buffer_bound = true;
            }
            Command::SetVertexBuffer { buffer, .. } => self.require_buffer(*buffer)?,
            Command::ClearRenderTarget { target, color } => {
                let texture = self.render_target(target.0)?;
                self.fill(texture, |format| encode_color(format, *color))?;
                StatCounters::add(&stats.clears, 1);
            }
            Command::ClearDepthStencil { target, depth } => {
                let texture = self.depth_target(target.0)?;
                self.fill(texture, |_| depth.to_le_bytes().to_vec())?;
                StatCounters::add(&stats.clears, 1);
            }
            Command::DrawIndexed { .. } => {
                state.require_draw_state()?;
                if !state.index_buffer_bound {
                    return Err(ResourceError::InvalidDescription(
                        "indexed draw without an index buffer".into(),
                    ));
                }
                StatCounters::add(&stats.draws, 1);
            }
            Command::Draw { .. } => {
                state.require_draw_state()?;
                StatCounters::add(&stats.draws, 1);
            }
            Command::Dispatch { .. } => {
                if state.pipeline.is_none() {
                    return Err(ResourceError::InvalidDescription(
                        "dispatch without a pipeline".into(),
                    ));
                }
                StatCounters::add(&stats.dispatches, 1);
            }
            Command::Marker(label) => markers.push(label.clone()),
            Command::Barrier(_)
            | Command::SetDescriptorHeaps(_)
            | Command::SetRootDescriptorTable { .. }
            | Command::SetRootConstantBuffer { .. } => {}
        }
        Ok(())
    }

    fn require_buffer(&self, buffer: BufferId) -> Result<(), ResourceError> {
        if self.shared.buffers.lock().contains_key(&buffer) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn render_target(&self, address: u64) -> Result<TextureId, ResourceError> {
        match self.shared.resolve_descriptor(address)? {
            ViewDescriptor::RenderTarget { texture } => Ok(texture),
            _ => Err(ResourceError::InvalidHandle),
        }
    }

    fn depth_target(&self, address: u64) -> Result<TextureId, ResourceError> {
        match self.shared.resolve_descriptor(address)? {
            ViewDescriptor::DepthStencil { texture } => Ok(texture),
            _ => Err(ResourceError::InvalidHandle),
        }
    }

    /// Writes one encoded texel over mip 0 of every layer.
    fn fill(
        &self,
        texture: TextureId,
        encode: impl Fn(TextureFormat) -> Vec<u8>,
    ) -> Result<(), ResourceError> {
        let mut textures = self.shared.textures.lock();
        let entry = textures.get_mut(&texture).ok_or(ResourceError::NotFound)?;
        let texel = encode(entry.format);
        for layer in 0..entry.array_layers {
            if let Some(data) = entry.subresource_mut(0, layer) {
                for chunk in data.chunks_exact_mut(texel.len()) {
                    chunk.copy_from_slice(&texel);
                }
            }
        }
        Ok(())
    }

    fn copy_rows(
        &self,
        source: BufferId,
        source_offset: u64,
        row_pitch: u64,
        destination: TextureId,
        region: &TextureRegion,
    ) -> Result<u64, ResourceError> {
        let buffers = self.shared.buffers.lock();
        let src = buffers.get(&source).ok_or(ResourceError::NotFound)?;
        let mut textures = self.shared.textures.lock();
        let entry = textures
            .get_mut(&destination)
            .ok_or(ResourceError::NotFound)?;

        let bpp = entry.format.bytes_per_pixel() as u64;
        let (mip_width, mip_height) = entry.mip_extent(region.mip_level);
        if region.x + region.width > mip_width || region.y + region.height > mip_height {
            return Err(ResourceError::OutOfBounds);
        }
        let row_bytes = region.width as u64 * bpp;
        let data = entry
            .subresource_mut(region.mip_level, region.array_layer)
            .ok_or(ResourceError::OutOfBounds)?;
        for row in 0..region.height as u64 {
            let from = byte_range(source_offset + row * row_pitch, row_bytes, src.data.len())?;
            let start = ((region.y as u64 + row) * mip_width as u64 + region.x as u64) * bpp;
            let to = byte_range(start, row_bytes, data.len())?;
            data[to].copy_from_slice(&src.data[from]);
        }
        Ok(row_bytes * region.height as u64)
    }
}

#[derive(Debug, Default)]
struct ReplayState {
    pipeline: Option<&'static str>,
    targets_bound: bool,
    index_buffer_bound: bool,
}

impl ReplayState {
    fn require_draw_state(&self) -> Result<(), ResourceError> {
        if self.pipeline.is_none() {
            return Err(ResourceError::InvalidDescription(
                "draw without a pipeline".into(),
            ));
        }
        if !self.targets_bound {
            return Err(ResourceError::InvalidDescription(
                "draw without render targets".into(),
            ));
        }
        Ok(())
    }
}

fn byte_range(offset: u64, size: u64, len: usize) -> Result<std::ops::Range<usize>, ResourceError> {
    let end = offset.checked_add(size).ok_or(ResourceError::OutOfBounds)?;
    if end > len as u64 {
        return Err(ResourceError::OutOfBounds);
    }
    Ok(offset as usize..end as usize)
}

/// Encodes a clear color as one texel of `format`.
pub(crate) fn encode_color(format: TextureFormat, color: [f32; 4]) -> Vec<u8> {
    match format {
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => color
            .iter()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
        TextureFormat::Rgba16Float => color
            .iter()
            .flat_map(|c| half::f16::from_f32(*c).to_le_bytes())
            .collect(),
        TextureFormat::Rgba32Float => color.iter().flat_map(|c| c.to_le_bytes()).collect(),
        TextureFormat::R32Float | TextureFormat::Depth32Float => color[0].to_le_bytes().to_vec(),
    }
}
