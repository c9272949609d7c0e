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

//! The software implementation of [`RenderDevice`].

use super::command::SoftwareCommandList;
use super::executor::{QueueExecutor, QueueOp, RecordedList};
use super::state::{
    BufferEntry, DeviceShared, FenceEntry, HeapEntry, SoftwareDeviceStats, TextureEntry,
};
use super::swap_chain::SoftwareSwapChain;
use super::timeline::ExecutionRecord;
use crate::platform::HostMemoryProbe;
use crossbeam_channel::Sender;
use lucent_core::renderer::{
    align_up, BufferDescriptor, BufferId, CommandBufferId, CommandList, CpuDescriptorHandle,
    DescriptorHeapBases, DescriptorHeapDescriptor, DescriptorHeapId, DescriptorIncrements,
    DeviceCapabilities, FenceId, GpuDescriptorHandle, HeapType, QueueId, QueueKind, RenderDevice,
    RenderError, ResourceError, TextureDescriptor, TextureId, ViewDescriptor,
    CONSTANT_BUFFER_ALIGNMENT,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// GPU virtual addresses of buffers are placed on 64 KiB boundaries.
const RESOURCE_PLACEMENT: u64 = 64 * 1024;
const GPU_ADDRESS_BASE: u64 = 0x0000_0001_0000_0000;
const CPU_DESCRIPTOR_BASE: u64 = 0x0000_0000_0010_0000;
const GPU_DESCRIPTOR_BASE: u64 = 0x0000_0800_0000_0000;

/// Construction parameters of a [`SoftwareDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareDeviceConfig {
    /// Reported adapter name.
    pub adapter_name: String,
    /// Time every command list takes to execute. Zero runs lists as fast as
    /// the executor can replay them.
    pub list_latency: Duration,
    /// Reported video memory. `None` reports a quarter of host memory.
    pub video_memory: Option<u64>,
}

impl Default for SoftwareDeviceConfig {
    fn default() -> Self {
        Self {
            adapter_name: "Lucent Software Adapter".to_owned(),
            list_latency: Duration::ZERO,
            video_memory: None,
        }
    }
}

#[derive(Debug)]
struct QueueEntry {
    kind: QueueKind,
    sender: Sender<QueueOp>,
    thread: Option<JoinHandle<()>>,
}

/// The internal, non-clonable state of the [`SoftwareDevice`].
#[derive(Debug)]
pub(crate) struct SoftwareDeviceInternal {
    shared: Arc<DeviceShared>,
    queues: Mutex<HashMap<QueueId, QueueEntry>>,

    next_queue_id: AtomicUsize,
    next_fence_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_heap_id: AtomicUsize,
    next_list_id: AtomicU64,
    next_gpu_address: AtomicU64,
    next_cpu_descriptor: AtomicU64,
    next_gpu_descriptor: AtomicU64,
}

impl SoftwareDeviceInternal {
    pub(crate) fn send(&self, queue: QueueId, op: QueueOp) -> Result<(), RenderError> {
        let queues = self.queues.lock();
        let entry = queues.get(&queue).ok_or(ResourceError::NotFound)?;
        entry.sender.send(op).map_err(|_| {
            log::error!("executor of {queue:?} is gone");
            RenderError::DeviceLost
        })
    }

    fn queue_kind(&self, queue: QueueId) -> Result<QueueKind, RenderError> {
        let queues = self.queues.lock();
        let entry = queues.get(&queue).ok_or(ResourceError::NotFound)?;
        Ok(entry.kind)
    }
}

impl Drop for SoftwareDeviceInternal {
    fn drop(&mut self) {
        self.shared.shutting_down.store(true, Ordering::Release);
        self.shared.wake_all_fences();
        let mut queues = self.queues.lock();
        for (id, entry) in queues.iter_mut() {
            let _ = entry.sender.send(QueueOp::Shutdown);
            if let Some(thread) = entry.thread.take() {
                if thread.join().is_err() {
                    log::error!("executor of {id:?} panicked");
                }
            }
        }
        log::debug!("SoftwareDevice destroyed");
    }
}

/// A device whose queues are CPU threads.
///
/// Buffers and textures are byte vectors, descriptor heaps are arrays of
/// views addressed like hardware heaps, and fences are counters that
/// executors bump when they reach a signal. Cloning the handle is cheap.
#[derive(Clone, Debug)]
pub struct SoftwareDevice {
    internal: Arc<SoftwareDeviceInternal>,
}

impl SoftwareDevice {
    /// Creates a device and queries its capabilities.
    pub fn new(config: SoftwareDeviceConfig) -> Self {
        let video_memory = config
            .video_memory
            .unwrap_or_else(|| HostMemoryProbe::new().total_memory() / 4);
        let capabilities = DeviceCapabilities {
            adapter_name: config.adapter_name,
            descriptor_increments: DescriptorIncrements {
                cbv_srv_uav: 32,
                sampler: 16,
                render_target: 32,
                depth_stencil: 8,
            },
            constant_buffer_alignment: CONSTANT_BUFFER_ALIGNMENT,
            texture_row_pitch_alignment: 256,
            texture_placement_alignment: 512,
            dedicated_video_memory: video_memory,
        };
        log::info!(
            "SoftwareDevice: '{}' with {} MiB of video memory",
            capabilities.adapter_name,
            video_memory / (1024 * 1024)
        );

        Self {
            internal: Arc::new(SoftwareDeviceInternal {
                shared: Arc::new(DeviceShared::new(capabilities, config.list_latency)),
                queues: Mutex::new(HashMap::new()),
                next_queue_id: AtomicUsize::new(0),
                next_fence_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_heap_id: AtomicUsize::new(0),
                next_list_id: AtomicU64::new(0),
                next_gpu_address: AtomicU64::new(GPU_ADDRESS_BASE),
                next_cpu_descriptor: AtomicU64::new(CPU_DESCRIPTOR_BASE),
                next_gpu_descriptor: AtomicU64::new(GPU_DESCRIPTOR_BASE),
            }),
        }
    }

    /// Creates a swap chain presenting on `queue`, which must be a graphics queue.
    pub fn create_swap_chain(
        &self,
        queue: QueueId,
        buffer_count: u32,
        width: u32,
        height: u32,
    ) -> Result<SoftwareSwapChain, RenderError> {
        if self.internal.queue_kind(queue)? != QueueKind::Graphics {
            return Err(RenderError::InitializationFailed(
                "a swap chain presents on a graphics queue".into(),
            ));
        }
        SoftwareSwapChain::new(self.clone(), queue, buffer_count, width, height)
    }

    pub(crate) fn internal(&self) -> &SoftwareDeviceInternal {
        &self.internal
    }

    /// Marks the device as removed. Fences complete, waits return, and every
    /// later submission or presentation fails with [`RenderError::DeviceLost`].
    pub fn simulate_device_removal(&self) {
        log::error!("SoftwareDevice: device removed");
        self.internal.shared.removed.store(true, Ordering::Release);
        self.internal.shared.wake_all_fences();
    }

    /// Returns `true` once the device was removed.
    pub fn is_removed(&self) -> bool {
        self.internal.shared.is_removed()
    }

    /// Changes the execution time of every command list submitted afterwards.
    pub fn set_list_latency(&self, latency: Duration) {
        self.internal
            .shared
            .list_latency_nanos
            .store(latency.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Everything the executors did so far, in completion order.
    pub fn timeline(&self) -> Vec<ExecutionRecord> {
        self.internal.shared.timeline.snapshot()
    }

    /// Forgets the recorded timeline.
    pub fn clear_timeline(&self) {
        self.internal.shared.timeline.clear();
    }

    /// Work counters.
    pub fn stats(&self) -> SoftwareDeviceStats {
        self.internal.shared.stats.snapshot()
    }

    /// Number of buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.internal.shared.buffers.lock().len()
    }

    /// Number of textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.internal.shared.textures.lock().len()
    }

    /// Number of descriptor heaps currently alive.
    pub fn live_descriptor_heaps(&self) -> usize {
        self.internal.shared.heaps.lock().len()
    }

    /// Number of fences currently alive.
    pub fn live_fences(&self) -> usize {
        self.internal.shared.fences.lock().len()
    }

    fn validate_view(&self, view: &ViewDescriptor) -> Result<(), ResourceError> {
        let shared = &self.internal.shared;
        let require_texture = |texture: TextureId,
                               depth: Option<bool>|
         -> Result<(), ResourceError> {
            let textures = shared.textures.lock();
            let entry = textures.get(&texture).ok_or(ResourceError::NotFound)?;
            match depth {
                Some(expected) if entry.format.is_depth() != expected => {
                    Err(ResourceError::InvalidDescription(format!(
                        "texture '{}' has format {:?}",
                        entry.label, entry.format
                    )))
                }
                _ => Ok(()),
            }
        };

        match view {
            ViewDescriptor::ConstantBuffer {
                buffer,
                offset,
                size,
            } => {
                let alignment = shared.capabilities.constant_buffer_alignment;
                if offset % alignment != 0 || size % alignment != 0 || *size == 0 {
                    return Err(ResourceError::InvalidDescription(format!(
                        "constant buffer view {offset}+{size} is not {alignment}-byte aligned"
                    )));
                }
                let buffers = shared.buffers.lock();
                let entry = buffers.get(buffer).ok_or(ResourceError::NotFound)?;
                if offset + size > entry.data.len() as u64 {
                    return Err(ResourceError::OutOfBounds);
                }
                Ok(())
            }
            ViewDescriptor::ShaderResource { texture, .. }
            | ViewDescriptor::UnorderedAccess { texture, .. } => require_texture(*texture, None),
            ViewDescriptor::RenderTarget { texture } => require_texture(*texture, Some(false)),
            ViewDescriptor::DepthStencil { texture } => require_texture(*texture, Some(true)),
            ViewDescriptor::Sampler { .. } => Ok(()),
        }
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new(SoftwareDeviceConfig::default())
    }
}

impl RenderDevice for SoftwareDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.internal.shared.capabilities
    }

    fn create_queue(&self, kind: QueueKind) -> Result<QueueId, RenderError> {
        let id = QueueId(self.internal.next_queue_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = crossbeam_channel::unbounded();
        let executor = QueueExecutor::new(id, kind, Arc::clone(&self.internal.shared), receiver);
        let thread = thread::Builder::new()
            .name(format!("lucent-{}-queue-{}", kind.name().to_lowercase(), id.0))
            .spawn(move || executor.run())
            .map_err(|err| RenderError::InitializationFailed(err.to_string()))?;

        self.internal.queues.lock().insert(
            id,
            QueueEntry {
                kind,
                sender,
                thread: Some(thread),
            },
        );
        log::debug!("SoftwareDevice: {} queue {id:?} created", kind.name());
        Ok(id)
    }

    fn create_fence(&self, initial_value: u64) -> Result<FenceId, ResourceError> {
        let id = FenceId(self.internal.next_fence_id.fetch_add(1, Ordering::Relaxed));
        self.internal
            .shared
            .fences
            .lock()
            .insert(id, Arc::new(FenceEntry::new(initial_value)));
        Ok(id)
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        let shared = &self.internal.shared;
        if shared.is_removed() {
            return u64::MAX;
        }
        match shared.fence(fence) {
            Some(entry) => entry.value(),
            None => {
                log::warn!("completed value of unknown fence {fence:?} requested");
                0
            }
        }
    }

    fn wait_fence(&self, fence: FenceId, value: u64) -> Result<(), RenderError> {
        let shared = &self.internal.shared;
        let entry = shared.fence(fence).ok_or(ResourceError::NotFound)?;
        entry.wait(value, || shared.is_removed());
        Ok(())
    }

    fn destroy_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        match self.internal.shared.fences.lock().remove(&fence) {
            Some(entry) => {
                entry.wake_all();
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if descriptor.size == 0 {
            return Err(ResourceError::InvalidDescription(
                "buffers must not be empty".into(),
            ));
        }
        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let gpu_address = self.internal.next_gpu_address.fetch_add(
            align_up(descriptor.size, RESOURCE_PLACEMENT),
            Ordering::Relaxed,
        );
        let label = descriptor
            .label
            .as_deref()
            .unwrap_or("buffer")
            .to_owned();
        log::trace!(
            "SoftwareDevice: buffer '{label}' ({} bytes, {:?} heap) -> {id:?}",
            descriptor.size,
            descriptor.heap
        );
        self.internal.shared.buffers.lock().insert(
            id,
            BufferEntry {
                data: vec![0; descriptor.size as usize],
                heap: descriptor.heap,
                gpu_address,
                label,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = self
            .internal
            .shared
            .buffers
            .lock()
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        log::trace!("SoftwareDevice: buffer '{}' destroyed", entry.label);
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.internal.shared.buffers.lock();
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if entry.heap != HeapType::Upload {
            return Err(ResourceError::InvalidDescription(format!(
                "buffer '{}' is not CPU-writable",
                entry.label
            )));
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(ResourceError::OutOfBounds)?;
        if end > entry.data.len() as u64 {
            return Err(ResourceError::OutOfBounds);
        }
        entry.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, len: u64) -> Result<Vec<u8>, ResourceError> {
        let buffers = self.internal.shared.buffers.lock();
        let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;
        let end = offset.checked_add(len).ok_or(ResourceError::OutOfBounds)?;
        if end > entry.data.len() as u64 {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(entry.data[offset as usize..end as usize].to_vec())
    }

    fn buffer_gpu_address(&self, id: BufferId) -> Result<u64, ResourceError> {
        let buffers = self.internal.shared.buffers.lock();
        buffers
            .get(&id)
            .map(|entry| entry.gpu_address)
            .ok_or(ResourceError::NotFound)
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.mip_levels == 0
            || descriptor.array_layers == 0
        {
            return Err(ResourceError::InvalidDescription(format!(
                "texture {}x{} with {} mips and {} layers",
                descriptor.width, descriptor.height, descriptor.mip_levels, descriptor.array_layers
            )));
        }
        let id = TextureId(self.internal.next_texture_id.fetch_add(1, Ordering::Relaxed));
        let bpp = descriptor.format.bytes_per_pixel() as usize;
        let mut subresources = Vec::with_capacity(descriptor.subresource_count() as usize);
        for _layer in 0..descriptor.array_layers {
            for mip in 0..descriptor.mip_levels {
                let (width, height) = descriptor.mip_extent(mip);
                subresources.push(vec![0; width as usize * height as usize * bpp]);
            }
        }
        let label = descriptor
            .label
            .as_deref()
            .unwrap_or("texture")
            .to_owned();
        log::trace!(
            "SoftwareDevice: texture '{label}' {}x{} {:?} -> {id:?}",
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        self.internal.shared.textures.lock().insert(
            id,
            TextureEntry {
                width: descriptor.width,
                height: descriptor.height,
                mip_levels: descriptor.mip_levels,
                array_layers: descriptor.array_layers,
                format: descriptor.format,
                subresources,
                label,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = self
            .internal
            .shared
            .textures
            .lock()
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        log::trace!("SoftwareDevice: texture '{}' destroyed", entry.label);
        Ok(())
    }

    fn read_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        array_layer: u32,
    ) -> Result<Vec<u8>, ResourceError> {
        let textures = self.internal.shared.textures.lock();
        let entry = textures.get(&id).ok_or(ResourceError::NotFound)?;
        entry
            .subresource(mip_level, array_layer)
            .cloned()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn create_descriptor_heap(
        &self,
        descriptor: &DescriptorHeapDescriptor,
    ) -> Result<DescriptorHeapId, ResourceError> {
        if descriptor.capacity == 0 {
            return Err(ResourceError::InvalidDescription(
                "descriptor heaps need at least one slot".into(),
            ));
        }
        if descriptor.shader_visible && !descriptor.kind.can_be_shader_visible() {
            return Err(ResourceError::InvalidDescription(format!(
                "{} heaps cannot be shader-visible",
                descriptor.kind.name()
            )));
        }
        let increment = self.capabilities().increment(descriptor.kind) as u64;
        let span = align_up(descriptor.capacity as u64 * increment, RESOURCE_PLACEMENT);
        let cpu_base = self
            .internal
            .next_cpu_descriptor
            .fetch_add(span, Ordering::Relaxed);
        let gpu_base = descriptor.shader_visible.then(|| {
            self.internal
                .next_gpu_descriptor
                .fetch_add(span, Ordering::Relaxed)
        });
        let id = DescriptorHeapId(self.internal.next_heap_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "SoftwareDevice: {} heap '{}' with {} slots -> {id:?}",
            descriptor.kind.name(),
            descriptor.label.unwrap_or("descriptor_heap"),
            descriptor.capacity
        );
        self.internal.shared.heaps.lock().insert(
            id,
            HeapEntry {
                kind: descriptor.kind,
                increment,
                cpu_base,
                gpu_base,
                slots: vec![None; descriptor.capacity as usize],
            },
        );
        Ok(id)
    }

    fn descriptor_heap_bases(
        &self,
        id: DescriptorHeapId,
    ) -> Result<DescriptorHeapBases, ResourceError> {
        let heaps = self.internal.shared.heaps.lock();
        let entry = heaps.get(&id).ok_or(ResourceError::NotFound)?;
        Ok(DescriptorHeapBases {
            cpu: CpuDescriptorHandle(entry.cpu_base),
            gpu: entry.gpu_base.map(GpuDescriptorHandle),
        })
    }

    fn write_descriptor(
        &self,
        handle: CpuDescriptorHandle,
        view: &ViewDescriptor,
    ) -> Result<(), ResourceError> {
        self.validate_view(view)?;
        self.internal
            .shared
            .store_descriptor(handle.0, view.clone())
    }

    fn destroy_descriptor_heap(&self, id: DescriptorHeapId) -> Result<(), ResourceError> {
        self.internal
            .shared
            .heaps
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_command_list(
        &self,
        kind: QueueKind,
        label: Option<&str>,
    ) -> Result<Box<dyn CommandList>, RenderError> {
        if self.is_removed() {
            return Err(RenderError::DeviceLost);
        }
        let id = CommandBufferId(self.internal.next_list_id.fetch_add(1, Ordering::Relaxed));
        Ok(Box::new(SoftwareCommandList::new(id, kind, label)))
    }

    fn execute_command_lists(
        &self,
        queue: QueueId,
        lists: &[&dyn CommandList],
    ) -> Result<(), RenderError> {
        if self.is_removed() {
            return Err(RenderError::DeviceLost);
        }
        let kind = self.internal.queue_kind(queue)?;
        let mut recorded = Vec::with_capacity(lists.len());
        for list in lists {
            let list = list
                .as_any()
                .downcast_ref::<SoftwareCommandList>()
                .ok_or_else(|| {
                    RenderError::SubmissionFailed(
                        "command list was not created by this device".into(),
                    )
                })?;
            if list.is_recording() {
                return Err(RenderError::SubmissionFailed(format!(
                    "command list '{}' is still open",
                    list.label()
                )));
            }
            if list.queue_kind() != kind {
                return Err(RenderError::SubmissionFailed(format!(
                    "{} list '{}' submitted to a {} queue",
                    list.queue_kind().name(),
                    list.label(),
                    kind.name()
                )));
            }
            recorded.push(RecordedList {
                id: list.id(),
                label: list.label().to_owned(),
                commands: list.snapshot(),
            });
        }
        if recorded.is_empty() {
            return Ok(());
        }
        self.internal.send(queue, QueueOp::Execute(recorded))
    }

    fn queue_signal(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), RenderError> {
        if self.is_removed() {
            // Fences of a removed device all read as complete.
            return Ok(());
        }
        self.internal.send(queue, QueueOp::Signal { fence, value })
    }

    fn queue_wait(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), RenderError> {
        if self.is_removed() {
            return Ok(());
        }
        self.internal.send(queue, QueueOp::Wait { fence, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucent_core::renderer::{
        BufferUsage, DescriptorHeapKind, TextureFormat, TextureRegion, TextureUsage,
    };
    use std::time::Instant;

    fn device() -> SoftwareDevice {
        let _ = env_logger::builder().is_test(true).try_init();
        SoftwareDevice::new(SoftwareDeviceConfig {
            video_memory: Some(256 * 1024 * 1024),
            ..Default::default()
        })
    }

    fn submit_and_wait(device: &SoftwareDevice, queue: QueueId, list: &dyn CommandList) {
        let fence = device.create_fence(0).unwrap();
        device.execute_command_lists(queue, &[list]).unwrap();
        device.queue_signal(queue, fence, 1).unwrap();
        device.wait_fence(fence, 1).unwrap();
        device.destroy_fence(fence).unwrap();
    }

    #[test]
    fn capabilities_report_configured_memory() {
        let device = device();
        let caps = device.capabilities();
        assert_eq!(caps.dedicated_video_memory, 256 * 1024 * 1024);
        assert_eq!(caps.constant_buffer_alignment, 256);
        assert_eq!(caps.increment(DescriptorHeapKind::CbvSrvUav), 32);
    }

    #[test]
    fn only_upload_buffers_are_cpu_writable() {
        let device = device();
        let upload = device
            .create_buffer(&BufferDescriptor::upload("up", 16, BufferUsage::COPY_SRC))
            .unwrap();
        let local = device
            .create_buffer(&BufferDescriptor::gpu_local("local", 16, BufferUsage::VERTEX))
            .unwrap();
        device.write_buffer(upload, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.read_buffer(upload, 4, 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(matches!(
            device.write_buffer(local, 0, &[1]),
            Err(ResourceError::InvalidDescription(_))
        ));
        assert_eq!(
            device.write_buffer(upload, 14, &[0; 4]),
            Err(ResourceError::OutOfBounds)
        );
    }

    #[test]
    fn gpu_addresses_do_not_overlap() {
        let device = device();
        let a = device
            .create_buffer(&BufferDescriptor::upload("a", 100_000, BufferUsage::CONSTANT))
            .unwrap();
        let b = device
            .create_buffer(&BufferDescriptor::upload("b", 16, BufferUsage::CONSTANT))
            .unwrap();
        let a_addr = device.buffer_gpu_address(a).unwrap();
        let b_addr = device.buffer_gpu_address(b).unwrap();
        assert!(b_addr >= a_addr + 100_000);
        assert_eq!(a_addr % RESOURCE_PLACEMENT, 0);
    }

    #[test]
    fn copies_execute_on_the_queue() {
        let device = device();
        let queue = device.create_queue(QueueKind::Copy).unwrap();
        let src = device
            .create_buffer(&BufferDescriptor::upload("src", 8, BufferUsage::COPY_SRC))
            .unwrap();
        let dst = device
            .create_buffer(&BufferDescriptor::gpu_local("dst", 8, BufferUsage::COPY_DST))
            .unwrap();
        device.write_buffer(src, 0, &[9, 8, 7, 6, 5, 4, 3, 2]).unwrap();

        let mut list = device.create_command_list(QueueKind::Copy, Some("copy")).unwrap();
        list.copy_buffer_region(dst, 2, src, 0, 4);
        list.close().unwrap();
        submit_and_wait(&device, queue, &*list);

        assert_eq!(
            device.read_buffer(dst, 0, 8).unwrap(),
            vec![0, 0, 9, 8, 7, 6, 0, 0]
        );
        let stats = device.stats();
        assert_eq!(stats.copies, 1);
        assert_eq!(stats.bytes_copied, 4);
    }

    #[test]
    fn texture_copies_honor_row_pitch() {
        let device = device();
        let queue = device.create_queue(QueueKind::Copy).unwrap();
        let src = device
            .create_buffer(&BufferDescriptor::upload("rows", 512, BufferUsage::COPY_SRC))
            .unwrap();
        device.write_buffer(src, 0, &[1; 8]).unwrap();
        device.write_buffer(src, 256, &[2; 8]).unwrap();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                "tex",
                2,
                2,
                TextureFormat::Rgba8Unorm,
                TextureUsage::COPY_DST,
            ))
            .unwrap();

        let mut list = device.create_command_list(QueueKind::Copy, None).unwrap();
        list.copy_buffer_to_texture(src, 0, 256, texture, TextureRegion::full(2, 2));
        list.close().unwrap();
        submit_and_wait(&device, queue, &*list);

        let texels = device.read_texture(texture, 0, 0).unwrap();
        assert_eq!(&texels[..8], &[1; 8]);
        assert_eq!(&texels[8..], &[2; 8]);
    }

    #[test]
    fn clears_write_encoded_texels() {
        let device = device();
        let queue = device.create_queue(QueueKind::Graphics).unwrap();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                "target",
                4,
                4,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET,
            ))
            .unwrap();
        let heap = device
            .create_descriptor_heap(&DescriptorHeapDescriptor {
                label: Some("rtv"),
                kind: DescriptorHeapKind::RenderTarget,
                capacity: 4,
                shader_visible: false,
            })
            .unwrap();
        let rtv = device.descriptor_heap_bases(heap).unwrap().cpu.offset(1, 32);
        device
            .write_descriptor(rtv, &ViewDescriptor::RenderTarget { texture })
            .unwrap();

        let mut list = device.create_command_list(QueueKind::Graphics, None).unwrap();
        list.clear_render_target(rtv, [1.0, 0.0, 0.0, 1.0]);
        list.close().unwrap();
        submit_and_wait(&device, queue, &*list);

        let texels = device.read_texture(texture, 0, 0).unwrap();
        assert!(texels.chunks(4).all(|t| t == [255, 0, 0, 255]));
        assert_eq!(device.stats().clears, 1);
    }

    #[test]
    fn descriptor_writes_are_validated() {
        let device = device();
        let heap = device
            .create_descriptor_heap(&DescriptorHeapDescriptor {
                label: None,
                kind: DescriptorHeapKind::CbvSrvUav,
                capacity: 2,
                shader_visible: true,
            })
            .unwrap();
        let bases = device.descriptor_heap_bases(heap).unwrap();
        assert!(bases.gpu.is_some());
        let buffer = device
            .create_buffer(&BufferDescriptor::upload("cb", 512, BufferUsage::CONSTANT))
            .unwrap();

        let misaligned = ViewDescriptor::ConstantBuffer {
            buffer,
            offset: 16,
            size: 256,
        };
        assert!(device.write_descriptor(bases.cpu, &misaligned).is_err());
        let sampler = ViewDescriptor::Sampler {
            linear: true,
            wrap: true,
        };
        assert!(device.write_descriptor(bases.cpu, &sampler).is_err());
        let past_end = bases.cpu.offset(2, 32);
        let view = ViewDescriptor::ConstantBuffer {
            buffer,
            offset: 256,
            size: 256,
        };
        assert_eq!(
            device.write_descriptor(past_end, &view),
            Err(ResourceError::InvalidHandle)
        );
        assert!(device.write_descriptor(bases.cpu.offset(1, 32), &view).is_ok());
    }

    #[test]
    fn rtv_heaps_cannot_be_shader_visible() {
        let device = device();
        let result = device.create_descriptor_heap(&DescriptorHeapDescriptor {
            label: None,
            kind: DescriptorHeapKind::RenderTarget,
            capacity: 2,
            shader_visible: true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn open_or_mismatched_lists_are_rejected() {
        let device = device();
        let graphics = device.create_queue(QueueKind::Graphics).unwrap();
        let mut open = device.create_command_list(QueueKind::Graphics, None).unwrap();
        assert!(matches!(
            device.execute_command_lists(graphics, &[&*open]),
            Err(RenderError::SubmissionFailed(_))
        ));
        open.close().unwrap();

        let mut copy = device.create_command_list(QueueKind::Copy, None).unwrap();
        copy.close().unwrap();
        assert!(matches!(
            device.execute_command_lists(graphics, &[&*copy]),
            Err(RenderError::SubmissionFailed(_))
        ));
        assert!(device.execute_command_lists(graphics, &[&*open]).is_ok());
    }

    #[test]
    fn draws_without_state_count_as_validation_errors() {
        let device = device();
        let queue = device.create_queue(QueueKind::Graphics).unwrap();
        let mut list = device.create_command_list(QueueKind::Graphics, None).unwrap();
        list.draw(3, 1);
        list.close().unwrap();
        submit_and_wait(&device, queue, &*list);
        let stats = device.stats();
        assert_eq!(stats.draws, 0);
        assert_eq!(stats.validation_errors, 1);
    }

    #[test]
    fn gpu_waits_order_work_across_queues() {
        let device = device();
        device.set_list_latency(Duration::from_millis(20));
        let copy = device.create_queue(QueueKind::Copy).unwrap();
        let graphics = device.create_queue(QueueKind::Graphics).unwrap();
        let fence = device.create_fence(0).unwrap();
        let done = device.create_fence(0).unwrap();

        let mut upload = device.create_command_list(QueueKind::Copy, Some("upload")).unwrap();
        upload.close().unwrap();
        let mut render = device
            .create_command_list(QueueKind::Graphics, Some("render"))
            .unwrap();
        render.close().unwrap();

        device.queue_wait(graphics, fence, 1).unwrap();
        device.execute_command_lists(graphics, &[&*render]).unwrap();
        device.queue_signal(graphics, done, 1).unwrap();
        device.execute_command_lists(copy, &[&*upload]).unwrap();
        device.queue_signal(copy, fence, 1).unwrap();
        device.wait_fence(done, 1).unwrap();

        let timeline = device.timeline();
        let find = |label: &str| {
            timeline
                .iter()
                .find(|record| record.list_label() == Some(label))
                .cloned()
                .unwrap()
        };
        assert!(find("upload").happened_before(&find("render")));
    }

    #[test]
    fn removal_releases_waiters() {
        let device = device();
        let fence = device.create_fence(0).unwrap();
        let waiter = {
            let device = device.clone();
            thread::spawn(move || device.wait_fence(fence, 10))
        };
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        device.simulate_device_removal();
        assert!(waiter.join().unwrap().is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(device.fence_completed_value(fence), u64::MAX);

        let queue = device.create_queue(QueueKind::Graphics).unwrap();
        let mut list = SoftwareCommandList::new(CommandBufferId(99), QueueKind::Graphics, None);
        list.close().unwrap();
        assert_eq!(
            device.execute_command_lists(queue, &[&list]),
            Err(RenderError::DeviceLost)
        );
    }

    #[test]
    fn dropping_the_device_stops_blocked_executors() {
        let device = device();
        let queue = device.create_queue(QueueKind::Graphics).unwrap();
        let fence = device.create_fence(0).unwrap();
        device.queue_wait(queue, fence, 1).unwrap();
        drop(device);
    }
}
