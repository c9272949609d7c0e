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

use crate::renderer::api::*;
use crate::renderer::error::RenderError;
use std::any::Any;

/// A private command buffer plus its allocator.
///
/// A list is created open. Recording methods are infallible; recording into
/// a closed list is remembered and reported by the next [`close`](Self::close).
/// A closed list can be submitted any number of times until it is
/// [`reset`](Self::reset), which reopens it for the next frame.
pub trait CommandList: Send + 'static {
    /// The stable id of this list.
    fn id(&self) -> CommandBufferId;

    /// The queue family this list can be submitted to.
    fn queue_kind(&self) -> QueueKind;

    /// Resets the allocator and reopens the list for recording.
    fn reset(&mut self) -> Result<(), RenderError>;

    /// Finishes recording.
    /// ## Errors
    /// * `RenderError::Internal` - If the list was already closed, or commands
    ///   were recorded while it was closed.
    fn close(&mut self) -> Result<(), RenderError>;

    /// Returns `true` between `reset` and `close`.
    fn is_recording(&self) -> bool;

    /// Transitions resources between states.
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]);

    /// Copies `size` bytes between buffers.
    fn copy_buffer_region(
        &mut self,
        destination: BufferId,
        destination_offset: u64,
        source: BufferId,
        source_offset: u64,
        size: u64,
    );

    /// Copies rows laid out with `row_pitch` bytes each from a buffer into a texture region.
    fn copy_buffer_to_texture(
        &mut self,
        source: BufferId,
        source_offset: u64,
        row_pitch: u64,
        destination: TextureId,
        region: TextureRegion,
    );

    /// Selects the program used by subsequent draws and dispatches.
    fn set_pipeline(&mut self, pipeline: PipelineKey);

    /// Binds the shader-visible descriptor heaps.
    fn set_descriptor_heaps(&mut self, heaps: &[DescriptorHeapId]);

    /// Binds a descriptor table to a root slot.
    fn set_root_descriptor_table(&mut self, slot: u32, table: GpuDescriptorHandle);

    /// Binds a constant buffer GPU address to a root slot.
    fn set_root_constant_buffer(&mut self, slot: u32, gpu_address: u64);

    /// Binds color and depth targets.
    fn set_render_targets(
        &mut self,
        colors: &[CpuDescriptorHandle],
        depth: Option<CpuDescriptorHandle>,
    );

    /// Clears a color target.
    fn clear_render_target(&mut self, target: CpuDescriptorHandle, color: [f32; 4]);

    /// Clears a depth target.
    fn clear_depth_stencil(&mut self, target: CpuDescriptorHandle, depth: f32);

    /// Binds a vertex buffer to a slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64, stride: u32);

    /// Binds an index buffer.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat);

    /// Records an indexed draw call.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
    );

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    /// Records a compute dispatch.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Inserts a debug marker.
    fn insert_marker(&mut self, label: &str);

    /// Returns the underlying list as `Any` so the owning backend can downcast it.
    fn as_any(&self) -> &dyn Any;
}
