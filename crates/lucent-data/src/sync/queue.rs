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

//! Serialized submission to one hardware queue.

use crate::sync::{Fence, FenceEvent};
use lucent_core::renderer::{
    CommandList, PresentFlags, QueueId, QueueKind, RenderDevice, RenderError, SwapChain,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Wraps a hardware queue and the fence that tracks its progress.
///
/// Queue submission is not thread-safe, so every operation that enqueues work
/// (waits, command lists, signals, presentation) runs under one submission
/// lock. Each submission is paired with a fence signal whose [`FenceEvent`] is
/// returned to the caller.
pub struct CommandQueue {
    device: Arc<dyn RenderDevice>,
    id: QueueId,
    kind: QueueKind,
    fence: Arc<Fence>,
    submit_lock: Mutex<()>,
}

impl CommandQueue {
    /// Creates the hardware queue and its fence.
    pub fn new(device: Arc<dyn RenderDevice>, kind: QueueKind) -> Result<Self, RenderError> {
        let id = device.create_queue(kind)?;
        let fence = Fence::new(Arc::clone(&device))?;
        log::debug!("CommandQueue({}): created {id:?}", kind.name());
        Ok(Self {
            device,
            id,
            kind,
            fence,
            submit_lock: Mutex::new(()),
        })
    }

    /// The device queue handle.
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// The queue family.
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// The device this queue belongs to.
    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    /// The fence signaled after every submission.
    pub fn fence(&self) -> &Arc<Fence> {
        &self.fence
    }

    /// Requests the next fence value after everything submitted so far.
    pub fn signal(&self) -> Result<FenceEvent, RenderError> {
        let _guard = self.submit_lock.lock();
        self.fence.signal_on(self.id)
    }

    /// Blocks the calling thread until `event` is reached.
    pub fn wait(&self, event: &FenceEvent) -> Result<(), RenderError> {
        event.wait()
    }

    /// Non-blocking poll of `event`.
    pub fn is_finished(&self, event: &FenceEvent) -> bool {
        event.is_finished()
    }

    /// Makes work submitted to this queue afterwards wait on the GPU for `event`.
    pub fn gpu_wait(&self, event: &FenceEvent) -> Result<(), RenderError> {
        let _guard = self.submit_lock.lock();
        self.insert_wait(event)
    }

    fn insert_wait(&self, event: &FenceEvent) -> Result<(), RenderError> {
        // Work on one queue already executes in submission order.
        if event.fence_id() == self.fence.id() {
            return Ok(());
        }
        self.device
            .queue_wait(self.id, event.fence_id(), event.value())
    }

    /// Submits `lists` after GPU-side waits on `wait_events`, then signals.
    pub fn execute_and_signal(
        &self,
        lists: &[&dyn CommandList],
        wait_events: &[FenceEvent],
    ) -> Result<FenceEvent, RenderError> {
        let _guard = self.submit_lock.lock();
        for event in wait_events {
            self.insert_wait(event)?;
        }
        self.device.execute_command_lists(self.id, lists)?;
        self.fence.signal_on(self.id)
    }

    /// Submits `lists`, presents `swap_chain` and signals, as one critical
    /// section, so the flip is sequenced exactly after the frame's work and
    /// before the next signal.
    ///
    /// A presentation failure is returned as a device-loss class error and is
    /// never retried; no signal is issued for the failed frame.
    pub fn execute_and_present(
        &self,
        lists: &[&dyn CommandList],
        wait_events: &[FenceEvent],
        swap_chain: &dyn SwapChain,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> Result<FenceEvent, RenderError> {
        let _guard = self.submit_lock.lock();
        for event in wait_events {
            self.insert_wait(event)?;
        }
        self.device.execute_command_lists(self.id, lists)?;
        swap_chain
            .present(sync_interval, flags)
            .map_err(|err| {
                log::error!("CommandQueue({}): present failed: {err}", self.kind.name());
                if err.is_device_loss() {
                    err
                } else {
                    RenderError::PresentFailed(err.to_string())
                }
            })?;
        self.fence.signal_on(self.id)
    }

    /// Signals and blocks until the queue drained everything submitted so far.
    pub fn flush(&self) -> Result<(), RenderError> {
        self.signal()?.wait()
    }
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("fence", &self.fence)
            .finish()
    }
}
