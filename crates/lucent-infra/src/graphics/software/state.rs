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

//! Resource tables shared between the device handle and the queue executors.

use super::timeline::Timeline;
use lucent_core::renderer::{
    BufferId, DescriptorHeapId, DescriptorHeapKind, DeviceCapabilities, FenceId, HeapType,
    ResourceError, TextureFormat, TextureId, ViewDescriptor,
};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct BufferEntry {
    pub(crate) data: Vec<u8>,
    pub(crate) heap: HeapType,
    pub(crate) gpu_address: u64,
    pub(crate) label: String,
}

#[derive(Debug)]
pub(crate) struct TextureEntry {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) mip_levels: u32,
    pub(crate) array_layers: u32,
    pub(crate) format: TextureFormat,
    /// Indexed by `mip + layer * mip_levels`, tightly packed.
    pub(crate) subresources: Vec<Vec<u8>>,
    pub(crate) label: String,
}

impl TextureEntry {
    pub(crate) fn mip_extent(&self, mip: u32) -> (u32, u32) {
        ((self.width >> mip).max(1), (self.height >> mip).max(1))
    }

    pub(crate) fn subresource_mut(&mut self, mip: u32, layer: u32) -> Option<&mut Vec<u8>> {
        if mip >= self.mip_levels || layer >= self.array_layers {
            return None;
        }
        let index = (mip + layer * self.mip_levels) as usize;
        self.subresources.get_mut(index)
    }

    pub(crate) fn subresource(&self, mip: u32, layer: u32) -> Option<&Vec<u8>> {
        if mip >= self.mip_levels || layer >= self.array_layers {
            return None;
        }
        self.subresources
            .get((mip + layer * self.mip_levels) as usize)
    }
}

#[derive(Debug)]
pub(crate) struct HeapEntry {
    pub(crate) kind: DescriptorHeapKind,
    pub(crate) increment: u64,
    pub(crate) cpu_base: u64,
    pub(crate) gpu_base: Option<u64>,
    pub(crate) slots: Vec<Option<ViewDescriptor>>,
}

impl HeapEntry {
    fn slot_of(&self, address: u64) -> Option<usize> {
        let end = self.cpu_base + self.slots.len() as u64 * self.increment;
        if address < self.cpu_base || address >= end {
            return None;
        }
        let offset = address - self.cpu_base;
        (offset % self.increment == 0).then_some((offset / self.increment) as usize)
    }
}

/// A fence counter with an OS wait.
#[derive(Debug)]
pub(crate) struct FenceEntry {
    value: Mutex<u64>,
    signaled: Condvar,
}

impl FenceEntry {
    pub(crate) fn new(initial_value: u64) -> Self {
        Self {
            value: Mutex::new(initial_value),
            signaled: Condvar::new(),
        }
    }

    pub(crate) fn value(&self) -> u64 {
        *self.value.lock()
    }

    pub(crate) fn signal(&self, value: u64) {
        *self.value.lock() = value;
        self.signaled.notify_all();
    }

    /// Wakes every waiter so it can re-check its exit condition.
    pub(crate) fn wake_all(&self) {
        let _guard = self.value.lock();
        self.signaled.notify_all();
    }

    /// Blocks until the fence reaches `value` or `abort` returns `true`.
    /// Returns `false` on abort.
    pub(crate) fn wait(&self, value: u64, abort: impl Fn() -> bool) -> bool {
        let mut current = self.value.lock();
        while *current < value {
            if abort() {
                return false;
            }
            self.signaled.wait(&mut current);
        }
        true
    }
}

/// Work counters of a [`SoftwareDevice`](super::SoftwareDevice).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareDeviceStats {
    /// Command lists executed.
    pub lists_executed: u64,
    /// Draw calls, indexed or not.
    pub draws: u64,
    /// Compute dispatches.
    pub dispatches: u64,
    /// Copy commands.
    pub copies: u64,
    /// Bytes moved by copy commands.
    pub bytes_copied: u64,
    /// Render target and depth clears.
    pub clears: u64,
    /// Back buffer flips.
    pub presents: u64,
    /// Commands that referenced missing state or resources.
    pub validation_errors: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub(crate) lists_executed: AtomicU64,
    pub(crate) draws: AtomicU64,
    pub(crate) dispatches: AtomicU64,
    pub(crate) copies: AtomicU64,
    pub(crate) bytes_copied: AtomicU64,
    pub(crate) clears: AtomicU64,
    pub(crate) presents: AtomicU64,
    pub(crate) validation_errors: AtomicU64,
}

impl StatCounters {
    pub(crate) fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SoftwareDeviceStats {
        SoftwareDeviceStats {
            lists_executed: self.lists_executed.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            presents: self.presents.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
        }
    }
}

/// State reachable from the device handle and from every executor thread.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    pub(crate) capabilities: DeviceCapabilities,
    pub(crate) buffers: Mutex<HashMap<BufferId, BufferEntry>>,
    pub(crate) textures: Mutex<HashMap<TextureId, TextureEntry>>,
    pub(crate) heaps: Mutex<HashMap<DescriptorHeapId, HeapEntry>>,
    pub(crate) fences: Mutex<HashMap<FenceId, Arc<FenceEntry>>>,
    pub(crate) removed: AtomicBool,
    pub(crate) shutting_down: AtomicBool,
    pub(crate) list_latency_nanos: AtomicU64,
    pub(crate) timeline: Timeline,
    pub(crate) stats: StatCounters,
}

impl DeviceShared {
    pub(crate) fn new(capabilities: DeviceCapabilities, list_latency: Duration) -> Self {
        Self {
            capabilities,
            buffers: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            heaps: Mutex::new(HashMap::new()),
            fences: Mutex::new(HashMap::new()),
            removed: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            list_latency_nanos: AtomicU64::new(list_latency.as_nanos() as u64),
            timeline: Timeline::default(),
            stats: StatCounters::default(),
        }
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub(crate) fn list_latency(&self) -> Duration {
        Duration::from_nanos(self.list_latency_nanos.load(Ordering::Relaxed))
    }

    pub(crate) fn fence(&self, id: FenceId) -> Option<Arc<FenceEntry>> {
        self.fences.lock().get(&id).cloned()
    }

    pub(crate) fn wake_all_fences(&self) {
        for fence in self.fences.lock().values() {
            fence.wake_all();
        }
    }

    /// Finds the view stored at a CPU descriptor address.
    pub(crate) fn resolve_descriptor(&self, address: u64) -> Result<ViewDescriptor, ResourceError> {
        let heaps = self.heaps.lock();
        for heap in heaps.values() {
            if let Some(slot) = heap.slot_of(address) {
                return heap.slots[slot].clone().ok_or(ResourceError::InvalidHandle);
            }
        }
        Err(ResourceError::NotFound)
    }

    /// Stores a view at a CPU descriptor address.
    pub(crate) fn store_descriptor(
        &self,
        address: u64,
        view: ViewDescriptor,
    ) -> Result<(), ResourceError> {
        let mut heaps = self.heaps.lock();
        for heap in heaps.values_mut() {
            if let Some(slot) = heap.slot_of(address) {
                if heap.kind != view.heap_kind() {
                    return Err(ResourceError::InvalidDescription(format!(
                        "a {} view cannot be written into a {} heap",
                        view.heap_kind().name(),
                        heap.kind.name()
                    )));
                }
                heap.slots[slot] = Some(view);
                return Ok(());
            }
        }
        Err(ResourceError::InvalidHandle)
    }
}
