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
use crate::renderer::capabilities::DeviceCapabilities;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::CommandList;
use std::fmt::Debug;

/// The device handle: the only way the renderer core creates GPU objects.
///
/// Every object is referenced by an opaque id. Methods take `&self`; an
/// implementation is shared between the main thread, the asset loader and the
/// pass workers behind an `Arc`.
pub trait RenderDevice: Send + Sync + Debug + 'static {
    /// Returns the immutable capability object queried at device creation.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Creates a hardware queue of the given kind.
    /// ## Errors
    /// * `RenderError::InitializationFailed` - If the queue cannot be created.
    fn create_queue(&self, kind: QueueKind) -> Result<QueueId, RenderError>;

    /// Creates a fence whose completed value starts at `initial_value`.
    fn create_fence(&self, initial_value: u64) -> Result<FenceId, ResourceError>;

    /// Returns the last value the GPU signaled on `fence`.
    ///
    /// After device removal every fence reports `u64::MAX`, which makes every
    /// CPU wait return instead of blocking forever.
    fn fence_completed_value(&self, fence: FenceId) -> u64;

    /// Blocks the calling thread until `fence` reaches `value`.
    ///
    /// There is no timeout: a hung device blocks indefinitely. After device
    /// removal the wait returns immediately.
    fn wait_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError>;

    /// Destroys a fence.
    fn destroy_fence(&self, fence: FenceId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` at `offset` into the persistently mapped memory of an
    /// upload-heap buffer.
    /// ## Errors
    /// * `ResourceError::InvalidDescription` - If the buffer is not CPU-writable.
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads `len` bytes at `offset` back from a buffer.
    fn read_buffer(&self, id: BufferId, offset: u64, len: u64) -> Result<Vec<u8>, ResourceError>;

    /// Returns the GPU virtual address of the first byte of a buffer.
    fn buffer_gpu_address(&self, id: BufferId) -> Result<u64, ResourceError>;

    /// Creates a new GPU texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a GPU texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Reads one subresource back, tightly packed.
    fn read_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        array_layer: u32,
    ) -> Result<Vec<u8>, ResourceError>;

    /// Creates a descriptor heap with a fixed number of slots.
    fn create_descriptor_heap(
        &self,
        descriptor: &DescriptorHeapDescriptor,
    ) -> Result<DescriptorHeapId, ResourceError>;

    /// Returns the CPU and (for shader-visible heaps) GPU address of slot 0.
    fn descriptor_heap_bases(&self, id: DescriptorHeapId)
        -> Result<DescriptorHeapBases, ResourceError>;

    /// Writes a view into the descriptor slot at `handle`.
    fn write_descriptor(
        &self,
        handle: CpuDescriptorHandle,
        view: &ViewDescriptor,
    ) -> Result<(), ResourceError>;

    /// Destroys a descriptor heap.
    fn destroy_descriptor_heap(&self, id: DescriptorHeapId) -> Result<(), ResourceError>;

    /// Creates a command list (and its allocator) for queues of `kind`.
    /// The list is returned open for recording.
    fn create_command_list(
        &self,
        kind: QueueKind,
        label: Option<&str>,
    ) -> Result<Box<dyn CommandList>, RenderError>;

    /// Submits closed command lists to `queue`, to execute in order after
    /// everything previously submitted to it.
    ///
    /// Queue submission is not thread-safe; callers serialize it per queue.
    /// ## Errors
    /// * `RenderError::SubmissionFailed` - If a list is still open or belongs to another queue kind.
    /// * `RenderError::DeviceLost` - If the device was removed.
    fn execute_command_lists(
        &self,
        queue: QueueId,
        lists: &[&dyn CommandList],
    ) -> Result<(), RenderError>;

    /// Enqueues a GPU-side signal of `fence` to `value` on `queue`.
    fn queue_signal(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), RenderError>;

    /// Enqueues a GPU-side wait: work submitted to `queue` afterwards does not
    /// start before `fence` reaches `value`.
    fn queue_wait(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), RenderError>;
}
