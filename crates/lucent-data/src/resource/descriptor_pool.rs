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

//! Contiguous descriptor ranges inside one fixed-size descriptor heap.
//!
//! Slot `i` of the heap lives at `base + i * increment` on both the CPU and
//! the GPU timeline. Ranges are reserved with a [`VirtualBlock`] of the same
//! extent as the heap; freed ranges go back to the block for reuse by any
//! later allocation. There is no compaction.
//!
//! Running out of descriptors is a capacity-planning bug, so
//! [`DescriptorPool::allocate_descriptors`] aborts loudly. Use
//! [`DescriptorPool::try_allocate_descriptors`] to check capacity instead.

use crate::memory::{VirtualAllocation, VirtualBlock};
use lucent_core::renderer::{
    CpuDescriptorHandle, DescriptorHeapBases, DescriptorHeapDescriptor, DescriptorHeapId,
    DescriptorHeapKind, DeviceCapabilities, GpuDescriptorHandle, RenderDevice, ResourceError,
    ViewDescriptor,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A reserved range of descriptor slots.
///
/// Not `Clone`: it must be handed back to [`DescriptorPool::free_descriptors`]
/// exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct DescriptorAllocation {
    range: VirtualAllocation,
}

impl DescriptorAllocation {
    /// Heap index of the first slot.
    pub fn index(&self) -> u32 {
        self.range.offset() as u32
    }

    /// Number of slots.
    pub fn count(&self) -> u32 {
        self.range.size() as u32
    }
}

/// Manages a fixed-size descriptor heap.
pub struct DescriptorPool {
    device: Arc<dyn RenderDevice>,
    heap: DescriptorHeapId,
    kind: DescriptorHeapKind,
    capacity: u32,
    increment: u32,
    bases: DescriptorHeapBases,
    block: Mutex<VirtualBlock>,
    label: String,
}

impl DescriptorPool {
    /// Creates a heap of `capacity` slots and a matching range allocator.
    ///
    /// The descriptor stride comes from `capabilities`.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        capabilities: &DeviceCapabilities,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
        label: &str,
    ) -> Result<Arc<Self>, ResourceError> {
        if capacity == 0 {
            return Err(ResourceError::InvalidDescription(format!(
                "descriptor pool '{label}' needs a non-zero capacity"
            )));
        }
        if shader_visible && !kind.can_be_shader_visible() {
            return Err(ResourceError::InvalidDescription(format!(
                "{} heaps cannot be shader visible",
                kind.name()
            )));
        }

        let heap = device.create_descriptor_heap(&DescriptorHeapDescriptor {
            label: Some(label),
            kind,
            capacity,
            shader_visible,
        })?;
        let bases = device.descriptor_heap_bases(heap)?;
        let increment = capabilities.increment(kind);

        log::info!(
            "DescriptorPool({label}): {capacity} {} descriptors, stride {increment}",
            kind.name()
        );

        Ok(Arc::new(Self {
            device,
            heap,
            kind,
            capacity,
            increment,
            bases,
            block: Mutex::new(VirtualBlock::new(capacity as u64)),
            label: label.to_owned(),
        }))
    }

    /// Reserves `count` contiguous slots.
    pub fn try_allocate_descriptors(
        &self,
        count: u32,
    ) -> Result<DescriptorAllocation, ResourceError> {
        if count == 0 {
            return Err(ResourceError::InvalidDescription(format!(
                "DescriptorPool({}): cannot allocate zero descriptors",
                self.label
            )));
        }
        let mut block = self.block.lock();
        match block.allocate(count as u64, 1) {
            Some(range) => {
                log::trace!(
                    "DescriptorPool({}): allocated [{}, {})",
                    self.label,
                    range.offset(),
                    range.end()
                );
                Ok(DescriptorAllocation { range })
            }
            None => Err(ResourceError::DescriptorHeapExhausted {
                kind: self.kind,
                requested: count,
                available: block.available() as u32,
            }),
        }
    }

    /// Reserves `count` contiguous slots.
    ///
    /// # Panics
    /// Panics when no contiguous range of `count` slots is free.
    pub fn allocate_descriptors(&self, count: u32) -> DescriptorAllocation {
        match self.try_allocate_descriptors(count) {
            Ok(allocation) => allocation,
            Err(err) => {
                log::error!("DescriptorPool({}): {err}", self.label);
                panic!("DescriptorPool({}): {err}", self.label);
            }
        }
    }

    /// Returns a range to the pool.
    pub fn free_descriptors(&self, allocation: DescriptorAllocation) {
        let (index, count) = (allocation.index(), allocation.count());
        if !self.block.lock().free(allocation.range) {
            log::warn!(
                "DescriptorPool({}): range [{index}, {}) was not allocated here",
                self.label,
                index + count
            );
        }
    }

    /// Reserves `count` contiguous slots owned by a lease that frees them on drop.
    ///
    /// # Panics
    /// Panics when no contiguous range of `count` slots is free.
    pub fn allocate_descriptors_unique(self: &Arc<Self>, count: u32) -> DescriptorLease {
        let allocation = self.allocate_descriptors(count);
        DescriptorLease {
            pool: Arc::clone(self),
            allocation: Some(allocation),
        }
    }

    /// Fallible variant of [`allocate_descriptors_unique`](Self::allocate_descriptors_unique).
    pub fn try_allocate_descriptors_unique(
        self: &Arc<Self>,
        count: u32,
    ) -> Result<DescriptorLease, ResourceError> {
        let allocation = self.try_allocate_descriptors(count)?;
        Ok(DescriptorLease {
            pool: Arc::clone(self),
            allocation: Some(allocation),
        })
    }

    /// A non-owning view over `allocation`.
    pub fn view<'a>(&'a self, allocation: &'a DescriptorAllocation) -> DescriptorView<'a> {
        DescriptorView {
            pool: self,
            index: allocation.index(),
            count: allocation.count(),
        }
    }

    /// The CPU address of heap slot `index`.
    pub fn cpu_handle(&self, index: u32) -> CpuDescriptorHandle {
        self.bases.cpu.offset(index, self.increment)
    }

    /// The GPU address of heap slot `index`, if the heap is shader visible.
    pub fn gpu_handle(&self, index: u32) -> Option<GpuDescriptorHandle> {
        self.bases.gpu.map(|base| base.offset(index, self.increment))
    }

    /// Writes `view` into heap slot `index`.
    pub fn write_view(&self, index: u32, view: &ViewDescriptor) -> Result<(), ResourceError> {
        if view.heap_kind() != self.kind {
            return Err(ResourceError::InvalidDescription(format!(
                "cannot write a {} view into the {} heap",
                view.heap_kind().name(),
                self.kind.name()
            )));
        }
        if index >= self.capacity {
            return Err(ResourceError::OutOfBounds);
        }
        self.device.write_descriptor(self.cpu_handle(index), view)
    }

    /// The device heap.
    pub fn heap_id(&self) -> DescriptorHeapId {
        self.heap
    }

    /// The heap kind.
    pub fn kind(&self) -> DescriptorHeapKind {
        self.kind
    }

    /// Total slots.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Byte stride between slots.
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// Slots currently reserved.
    pub fn used(&self) -> u32 {
        self.block.lock().used() as u32
    }

    /// Slots currently free, possibly fragmented.
    pub fn available(&self) -> u32 {
        self.block.lock().available() as u32
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        let outstanding = self.block.get_mut().allocation_count();
        if outstanding > 0 {
            log::warn!(
                "DescriptorPool({}): dropped with {outstanding} live allocations",
                self.label
            );
        }
        if let Err(err) = self.device.destroy_descriptor_heap(self.heap) {
            log::warn!("DescriptorPool({}): heap destroy failed: {err}", self.label);
        }
    }
}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPool")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}

/// A scope-owned descriptor range, freed when dropped.
///
/// The index is stable for the lease's lifetime. Views derived from it borrow
/// the lease, so it always outlives them.
pub struct DescriptorLease {
    pool: Arc<DescriptorPool>,
    allocation: Option<DescriptorAllocation>,
}

impl DescriptorLease {
    fn allocation(&self) -> &DescriptorAllocation {
        match &self.allocation {
            Some(allocation) => allocation,
            None => unreachable!("lease allocation is only taken on drop"),
        }
    }

    /// Heap index of the first slot.
    pub fn index(&self) -> u32 {
        self.allocation().index()
    }

    /// Number of slots.
    pub fn count(&self) -> u32 {
        self.allocation().count()
    }

    /// The pool the range belongs to.
    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    /// A view over the whole range.
    pub fn view(&self) -> DescriptorView<'_> {
        self.pool.view(self.allocation())
    }

    /// Writes `view` into slot `n` of the range.
    ///
    /// # Panics
    /// Panics if `n` is outside the range.
    pub fn write(&self, n: u32, view: &ViewDescriptor) -> Result<(), ResourceError> {
        self.view().offset(n).write(view)
    }
}

impl Drop for DescriptorLease {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.pool.free_descriptors(allocation);
        }
    }
}

impl fmt::Debug for DescriptorLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorLease")
            .field("pool", &self.pool.label)
            .field("index", &self.index())
            .field("count", &self.count())
            .finish()
    }
}

/// A non-owning reference to a run of slots: an index, a count and the stride.
#[derive(Clone, Copy)]
pub struct DescriptorView<'a> {
    pool: &'a DescriptorPool,
    index: u32,
    count: u32,
}

impl<'a> DescriptorView<'a> {
    /// The view starting `n` slots further.
    ///
    /// # Panics
    /// Panics if `n` is not inside the reserved range.
    pub fn offset(&self, n: u32) -> DescriptorView<'a> {
        if n >= self.count {
            log::error!(
                "DescriptorPool({}): offset {n} past a range of {} descriptors",
                self.pool.label,
                self.count
            );
            panic!(
                "descriptor offset {n} is outside a range of {} descriptors",
                self.count
            );
        }
        DescriptorView {
            pool: self.pool,
            index: self.index + n,
            count: self.count - n,
        }
    }

    /// Heap index of the first slot.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slots remaining from the first one to the end of the range.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// CPU address of the first slot.
    pub fn cpu_handle(&self) -> CpuDescriptorHandle {
        self.pool.cpu_handle(self.index)
    }

    /// GPU address of the first slot, or `None` for a CPU-only heap.
    pub fn try_gpu_handle(&self) -> Option<GpuDescriptorHandle> {
        self.pool.gpu_handle(self.index)
    }

    /// GPU address of the first slot.
    ///
    /// # Panics
    /// Panics if the heap is not shader visible.
    pub fn gpu_handle(&self) -> GpuDescriptorHandle {
        match self.try_gpu_handle() {
            Some(handle) => handle,
            None => panic!(
                "DescriptorPool({}) is not shader visible",
                self.pool.label
            ),
        }
    }

    /// Writes `view` into the first slot.
    pub fn write(&self, view: &ViewDescriptor) -> Result<(), ResourceError> {
        self.pool.write_view(self.index, view)
    }
}

impl fmt::Debug for DescriptorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorView")
            .field("pool", &self.pool.label)
            .field("index", &self.index)
            .field("count", &self.count)
            .finish()
    }
}
