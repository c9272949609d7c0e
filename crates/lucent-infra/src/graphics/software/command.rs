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

use lucent_core::renderer::{
    BufferId, CommandBufferId, CommandList, CpuDescriptorHandle, DescriptorHeapId,
    GpuDescriptorHandle, IndexFormat, PipelineKey, QueueKind, RenderError, ResourceBarrier,
    TextureId, TextureRegion,
};
use std::any::Any;
use std::sync::Arc;

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// State transitions.
    Barrier(Vec<ResourceBarrier>),
    /// Buffer to buffer copy.
    CopyBufferRegion {
        /// Destination buffer.
        destination: BufferId,
        /// Destination byte offset.
        destination_offset: u64,
        /// Source buffer.
        source: BufferId,
        /// Source byte offset.
        source_offset: u64,
        /// Bytes copied.
        size: u64,
    },
    /// Buffer rows to texture region copy.
    CopyBufferToTexture {
        /// Source buffer.
        source: BufferId,
        /// Source byte offset of the first row.
        source_offset: u64,
        /// Byte distance between rows in the source.
        row_pitch: u64,
        /// Destination texture.
        destination: TextureId,
        /// Destination region.
        region: TextureRegion,
    },
    /// Program selection.
    SetPipeline(PipelineKey),
    /// Shader-visible heaps.
    SetDescriptorHeaps(Vec<DescriptorHeapId>),
    /// Root descriptor table.
    SetRootDescriptorTable {
        /// Root slot.
        slot: u32,
        /// First descriptor of the table.
        table: GpuDescriptorHandle,
    },
    /// Root constant buffer.
    SetRootConstantBuffer {
        /// Root slot.
        slot: u32,
        /// GPU address of the constants.
        gpu_address: u64,
    },
    /// Output targets.
    SetRenderTargets {
        /// Color targets.
        colors: Vec<CpuDescriptorHandle>,
        /// Depth target.
        depth: Option<CpuDescriptorHandle>,
    },
    /// Color clear.
    ClearRenderTarget {
        /// Target view.
        target: CpuDescriptorHandle,
        /// Clear color.
        color: [f32; 4],
    },
    /// Depth clear.
    ClearDepthStencil {
        /// Target view.
        target: CpuDescriptorHandle,
        /// Clear depth.
        depth: f32,
    },
    /// Vertex buffer binding.
    SetVertexBuffer {
        /// Input slot.
        slot: u32,
        /// Buffer.
        buffer: BufferId,
        /// Byte offset.
        offset: u64,
        /// Vertex stride.
        stride: u32,
    },
    /// Index buffer binding.
    SetIndexBuffer {
        /// Buffer.
        buffer: BufferId,
        /// Byte offset.
        offset: u64,
        /// Index width.
        format: IndexFormat,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Indices per instance.
        index_count: u32,
        /// Instances.
        instance_count: u32,
        /// First index.
        first_index: u32,
        /// Added to every index.
        base_vertex: i32,
    },
    /// Non-indexed draw.
    Draw {
        /// Vertices per instance.
        vertex_count: u32,
        /// Instances.
        instance_count: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Groups along x.
        x: u32,
        /// Groups along y.
        y: u32,
        /// Groups along z.
        z: u32,
    },
    /// Debug marker.
    Marker(String),
}

/// A command list recorded into memory and replayed by a queue executor.
#[derive(Debug)]
pub struct SoftwareCommandList {
    id: CommandBufferId,
    kind: QueueKind,
    label: String,
    recording: bool,
    recorded_while_closed: bool,
    commands: Vec<Command>,
}

impl SoftwareCommandList {
    pub(crate) fn new(id: CommandBufferId, kind: QueueKind, label: Option<&str>) -> Self {
        Self {
            id,
            kind,
            label: label.unwrap_or("command_list").to_owned(),
            recording: true,
            recorded_while_closed: false,
            commands: Vec::new(),
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The commands recorded since the last reset.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub(crate) fn snapshot(&self) -> Arc<[Command]> {
        self.commands.as_slice().into()
    }

    fn push(&mut self, command: Command) {
        if !self.recording {
            self.recorded_while_closed = true;
            return;
        }
        self.commands.push(command);
    }
}

impl CommandList for SoftwareCommandList {
    fn id(&self) -> CommandBufferId {
        self.id
    }

    fn queue_kind(&self) -> QueueKind {
        self.kind
    }

    fn reset(&mut self) -> Result<(), RenderError> {
        self.commands.clear();
        self.recording = true;
        self.recorded_while_closed = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if !self.recording {
            return Err(RenderError::Internal(format!(
                "command list '{}' is already closed",
                self.label
            )));
        }
        self.recording = false;
        if self.recorded_while_closed {
            return Err(RenderError::Internal(format!(
                "commands were recorded into '{}' while it was closed",
                self.label
            )));
        }
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) {
        self.push(Command::Barrier(barriers.to_vec()));
    }

    fn copy_buffer_region(
        &mut self,
        destination: BufferId,
        destination_offset: u64,
        source: BufferId,
        source_offset: u64,
        size: u64,
    ) {
        self.push(Command::CopyBufferRegion {
            destination,
            destination_offset,
            source,
            source_offset,
            size,
        });
    }

    fn copy_buffer_to_texture(
        &mut self,
        source: BufferId,
        source_offset: u64,
        row_pitch: u64,
        destination: TextureId,
        region: TextureRegion,
    ) {
        self.push(Command::CopyBufferToTexture {
            source,
            source_offset,
            row_pitch,
            destination,
            region,
        });
    }

    fn set_pipeline(&mut self, pipeline: PipelineKey) {
        self.push(Command::SetPipeline(pipeline));
    }

    fn set_descriptor_heaps(&mut self, heaps: &[DescriptorHeapId]) {
        self.push(Command::SetDescriptorHeaps(heaps.to_vec()));
    }

    fn set_root_descriptor_table(&mut self, slot: u32, table: GpuDescriptorHandle) {
        self.push(Command::SetRootDescriptorTable { slot, table });
    }

    fn set_root_constant_buffer(&mut self, slot: u32, gpu_address: u64) {
        self.push(Command::SetRootConstantBuffer { slot, gpu_address });
    }

    fn set_render_targets(
        &mut self,
        colors: &[CpuDescriptorHandle],
        depth: Option<CpuDescriptorHandle>,
    ) {
        self.push(Command::SetRenderTargets {
            colors: colors.to_vec(),
            depth,
        });
    }

    fn clear_render_target(&mut self, target: CpuDescriptorHandle, color: [f32; 4]) {
        self.push(Command::ClearRenderTarget { target, color });
    }

    fn clear_depth_stencil(&mut self, target: CpuDescriptorHandle, depth: f32) {
        self.push(Command::ClearDepthStencil { target, depth });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64, stride: u32) {
        self.push(Command::SetVertexBuffer {
            slot,
            buffer,
            offset,
            stride,
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat) {
        self.push(Command::SetIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
    ) {
        self.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            base_vertex,
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.push(Command::Dispatch { x, y, z });
    }

    fn insert_marker(&mut self, label: &str) {
        self.push(Command::Marker(label.to_owned()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> SoftwareCommandList {
        SoftwareCommandList::new(CommandBufferId(1), QueueKind::Graphics, Some("test"))
    }

    #[test]
    fn lists_start_open_and_close_once() {
        let mut list = list();
        assert!(list.is_recording());
        list.draw(3, 1);
        assert!(list.close().is_ok());
        assert!(!list.is_recording());
        assert!(list.close().is_err());
    }

    #[test]
    fn recording_into_a_closed_list_is_reported() {
        let mut list = list();
        list.close().unwrap();
        list.reset().unwrap();
        list.close().unwrap();
        list.dispatch(1, 1, 1);
        assert!(list.commands().is_empty());
        list.reset().unwrap();
        assert!(list.close().is_ok());
    }

    #[test]
    fn reset_clears_recorded_commands() {
        let mut list = list();
        list.insert_marker("frame");
        list.close().unwrap();
        assert_eq!(list.commands(), &[Command::Marker("frame".into())]);
        list.reset().unwrap();
        assert!(list.commands().is_empty());
        assert!(list.is_recording());
    }
}
