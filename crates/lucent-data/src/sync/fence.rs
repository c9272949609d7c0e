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

//! Monotonic fences and the events captured from them.

use lucent_core::renderer::{FenceId, QueueId, RenderDevice, RenderError, ResourceError};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct FenceCounters {
    /// Last value a signal was requested for.
    target: u64,
    /// Next value to hand out. Always `target + 1`.
    next: u64,
}

/// A monotonically increasing counter advanced by the GPU.
///
/// Each signal request reserves the next value; the fence is finished once the
/// GPU-completed value reaches the last requested one.
pub struct Fence {
    device: Arc<dyn RenderDevice>,
    id: FenceId,
    counters: Mutex<FenceCounters>,
}

impl Fence {
    /// Creates a fence with nothing signaled yet.
    pub fn new(device: Arc<dyn RenderDevice>) -> Result<Arc<Self>, ResourceError> {
        let id = device.create_fence(0)?;
        Ok(Arc::new(Self {
            device,
            id,
            counters: Mutex::new(FenceCounters { target: 0, next: 1 }),
        }))
    }

    /// The device fence this wraps.
    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Enqueues a GPU signal of the next value on `queue`.
    ///
    /// The caller serializes this with the submissions it must follow.
    pub(crate) fn signal_on(self: &Arc<Self>, queue: QueueId) -> Result<FenceEvent, RenderError> {
        let mut counters = self.counters.lock();
        let value = counters.next;
        self.device.queue_signal(queue, self.id, value)?;
        counters.target = value;
        counters.next = value + 1;
        Ok(FenceEvent {
            fence: Arc::clone(self),
            value,
            retained: Vec::new(),
        })
    }

    /// The last value the GPU completed.
    pub fn completed_value(&self) -> u64 {
        self.device.fence_completed_value(self.id)
    }

    /// The last value a signal was requested for.
    pub fn target_value(&self) -> u64 {
        self.counters.lock().target
    }

    /// Returns `true` once every requested signal has completed.
    pub fn is_finished(&self) -> bool {
        self.completed_value() >= self.target_value()
    }

    /// Blocks until the GPU completed `value`.
    pub fn wait_for(&self, value: u64) -> Result<(), RenderError> {
        if self.completed_value() >= value {
            return Ok(());
        }
        self.device.wait_fence(self.id, value)
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        if let Err(err) = self.device.destroy_fence(self.id) {
            log::warn!("Fence: failed to destroy {:?}: {err}", self.id);
        }
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fence")
            .field("id", &self.id)
            .field("counters", &*self.counters.lock())
            .finish()
    }
}

/// A point on a fence's timeline: "this fence reached `value`".
///
/// Cloning is cheap. An event can keep GPU resources alive until the value is
/// reached, for example the staging buffer of an upload or the per-frame
/// objects of a presented frame.
#[derive(Clone)]
pub struct FenceEvent {
    fence: Arc<Fence>,
    value: u64,
    retained: Vec<Arc<dyn Any + Send + Sync>>,
}

impl FenceEvent {
    /// The fence this event belongs to.
    pub fn fence(&self) -> &Arc<Fence> {
        &self.fence
    }

    /// The id of the fence this event belongs to.
    pub fn fence_id(&self) -> FenceId {
        self.fence.id
    }

    /// The value the fence must reach.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Keeps `resource` alive for as long as this event (or a clone) exists.
    pub fn retain(mut self, resource: Arc<dyn Any + Send + Sync>) -> Self {
        self.retained.push(resource);
        self
    }

    /// Number of resources kept alive by this event.
    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    /// Non-blocking poll.
    pub fn is_finished(&self) -> bool {
        self.fence.completed_value() >= self.value
    }

    /// Blocks the calling thread until the GPU reaches the event.
    pub fn wait(&self) -> Result<(), RenderError> {
        self.fence.wait_for(self.value)
    }
}

impl fmt::Debug for FenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FenceEvent")
            .field("fence", &self.fence.id)
            .field("value", &self.value)
            .field("retained", &self.retained.len())
            .finish()
    }
}
