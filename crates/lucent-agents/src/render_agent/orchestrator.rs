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

//! The per-frame sequence: record, submit in pass order, present, advance.

use super::{FrameBegin, PassDispatcher, RecordedPass};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, PresentFlags, QueueKind, RecordingThread, RenderDevice,
    RenderError, RenderPass, SwapChain,
};
use lucent_core::Stopwatch;
use lucent_data::sync::{CommandQueue, FenceEvent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How pass command lists are chained on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// The CPU waits for every pass to complete before submitting the next.
    #[default]
    Blocking,
    /// No CPU waits between passes: each submission waits on the GPU for the
    /// previous pass's fence event.
    Pipelined,
}

/// Presentation and submission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOrchestratorConfig {
    /// How passes are chained.
    pub submission_mode: SubmissionMode,
    /// Vertical blanks to wait for when presenting.
    pub sync_interval: u32,
    /// Presentation flags.
    pub present_flags: PresentFlags,
}

/// One command queue per family.
#[derive(Debug, Clone)]
pub struct FrameQueues {
    /// Graphics queue, also used for presentation.
    pub graphics: Arc<CommandQueue>,
    /// Async compute queue.
    pub compute: Arc<CommandQueue>,
    /// Copy queue.
    pub copy: Arc<CommandQueue>,
}

impl FrameQueues {
    /// Creates the three queues.
    pub fn new(device: &Arc<dyn RenderDevice>) -> Result<Self, RenderError> {
        Ok(Self {
            graphics: Arc::new(CommandQueue::new(Arc::clone(device), QueueKind::Graphics)?),
            compute: Arc::new(CommandQueue::new(Arc::clone(device), QueueKind::Compute)?),
            copy: Arc::new(CommandQueue::new(Arc::clone(device), QueueKind::Copy)?),
        })
    }

    /// The queue of `kind`.
    pub fn get(&self, kind: QueueKind) -> &Arc<CommandQueue> {
        match kind {
            QueueKind::Graphics => &self.graphics,
            QueueKind::Compute => &self.compute,
            QueueKind::Copy => &self.copy,
        }
    }

    /// Blocks until every queue drained its work.
    pub fn wait_idle(&self) -> Result<(), RenderError> {
        self.graphics.flush()?;
        self.compute.flush()?;
        self.copy.flush()
    }
}

/// What one frame cost.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    /// The frame counter.
    pub frame_index: u64,
    /// The back buffer presented.
    pub back_buffer_index: u32,
    /// CPU time from submission start to present, recording included.
    pub cpu_time: Duration,
    /// Recording time of each worker pass, in submission order.
    pub pass_times: Vec<(PassId, Duration)>,
    /// Queue submissions, the primary list included.
    pub submissions: u32,
    /// Draw items in the frame.
    pub draws: usize,
    /// Light items in the frame.
    pub lights: usize,
}

// Per back buffer: lists reused every time this buffer comes around, and the
// event that says the GPU is done with them.
struct FrameSlot {
    primary: Option<Box<dyn CommandList>>,
    pass_lists: Vec<Box<dyn CommandList>>,
    in_flight: Option<FenceEvent>,
}

/// Drives frames: wakes the recording workers, records the main-thread
/// passes into the primary list, submits everything in pass order and
/// presents.
///
/// A device-loss class failure stops the orchestrator for good: every later
/// call returns [`RenderError::Stopped`].
pub struct FrameOrchestrator {
    device: Arc<dyn RenderDevice>,
    queues: FrameQueues,
    swap_chain: Arc<dyn SwapChain>,
    dispatcher: PassDispatcher,
    main_passes: Vec<Arc<dyn RenderPass>>,
    slots: Vec<FrameSlot>,
    config: FrameOrchestratorConfig,
    frame_index: u64,
    running: AtomicBool,
    previous_frame: Option<FenceEvent>,
}

impl FrameOrchestrator {
    /// Spawns the recording workers of `passes` and creates the per back
    /// buffer command lists.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        queues: FrameQueues,
        swap_chain: Arc<dyn SwapChain>,
        passes: &[Arc<dyn RenderPass>],
        config: FrameOrchestratorConfig,
    ) -> Result<Self, RenderError> {
        let dispatcher = PassDispatcher::new(passes)?;
        let mut main_passes: Vec<Arc<dyn RenderPass>> = passes
            .iter()
            .filter(|pass| pass.recording_thread() == RecordingThread::Main)
            .cloned()
            .collect();
        main_passes.sort_by_key(|pass| pass.pass_id());

        let mut orchestrator = Self {
            device,
            queues,
            swap_chain,
            dispatcher,
            main_passes,
            slots: Vec::new(),
            config,
            frame_index: 0,
            running: AtomicBool::new(true),
            previous_frame: None,
        };
        orchestrator.create_slots()?;
        log::info!(
            "FrameOrchestrator: {} worker passes, {} main passes, {:?} submission",
            orchestrator.dispatcher.worker_count(),
            orchestrator.main_passes.len(),
            config.submission_mode
        );
        Ok(orchestrator)
    }

    fn create_slots(&mut self) -> Result<(), RenderError> {
        self.slots = (0..self.swap_chain.buffer_count())
            .map(|index| {
                let label = format!("primary_{index}");
                Ok(FrameSlot {
                    primary: Some(
                        self.device
                            .create_command_list(QueueKind::Graphics, Some(&label))?,
                    ),
                    pass_lists: self
                        .dispatcher
                        .create_lists(self.device.as_ref(), &index.to_string())?,
                    in_flight: None,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        Ok(())
    }

    /// Whether frames can still be issued.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The next frame counter.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The queues frames are submitted to.
    pub fn queues(&self) -> &FrameQueues {
        &self.queues
    }

    /// Submission and presentation policy.
    pub fn config(&self) -> &FrameOrchestratorConfig {
        &self.config
    }

    /// Recording threads of the worker passes still alive. Drops to zero once
    /// the loop stops.
    pub fn live_workers(&self) -> usize {
        self.dispatcher.live_workers()
    }

    fn stop(&mut self, err: &RenderError) {
        if self.running.swap(false, Ordering::AcqRel) {
            log::error!("FrameOrchestrator: stopping the frame loop: {err}");
        }
        self.dispatcher.shutdown();
    }

    fn check_running(&self) -> Result<(), RenderError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(RenderError::Stopped)
        }
    }

    /// Picks the back buffer of the next frame and blocks until the GPU is
    /// done with the resources last used with it, and with the previous
    /// frame, whose constants extraction is about to overwrite.
    pub fn begin_frame(&mut self) -> Result<FrameBegin, RenderError> {
        self.check_running()?;
        let result = self.wait_for_slot();
        if let Err(err) = &result {
            if err.is_device_loss() {
                self.stop(err);
            }
        }
        result
    }

    fn wait_for_slot(&mut self) -> Result<FrameBegin, RenderError> {
        let back_buffer_index = self.swap_chain.current_back_buffer_index();
        let slot = self
            .slots
            .get_mut(back_buffer_index as usize)
            .ok_or_else(|| {
                RenderError::Internal(format!("no frame slot for back buffer {back_buffer_index}"))
            })?;

        if let Some(event) = slot.in_flight.take() {
            if !event.is_finished() {
                log::trace!("FrameOrchestrator: waiting for back buffer {back_buffer_index}");
            }
            event.wait()?;
        }
        if let Some(event) = self.previous_frame.take() {
            event.wait()?;
        }
        Ok(FrameBegin {
            frame_index: self.frame_index,
            back_buffer_index,
        })
    }

    /// Records, submits and presents `frame`.
    ///
    /// Worker passes are submitted in pass order to their own queue, then the
    /// primary list is submitted and presented as one critical section.
    pub fn submit_frame(&mut self, frame: FrameState) -> Result<FrameStats, RenderError> {
        self.check_running()?;
        let index = frame.back_buffer_index as usize;
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            RenderError::Internal(format!("no frame slot for back buffer {index}"))
        })?;
        let mut primary = slot.primary.take().ok_or_else(|| {
            RenderError::Internal(format!("the primary list of back buffer {index} is missing"))
        })?;
        let lists = std::mem::take(&mut slot.pass_lists);

        let mut returned = Vec::new();
        let result = self.run_frame(Arc::new(frame), primary.as_mut(), lists, &mut returned);

        let slot = &mut self.slots[index];
        slot.primary = Some(primary);
        slot.pass_lists = returned;
        match result {
            Ok((event, stats)) => {
                slot.in_flight = Some(event.clone());
                self.previous_frame = Some(event);
                self.frame_index += 1;
                Ok(stats)
            }
            Err(err) => {
                let workers_lost = slot.pass_lists.len() != self.dispatcher.worker_count();
                if err.is_device_loss() || workers_lost {
                    self.stop(&err);
                }
                Err(err)
            }
        }
    }

    fn run_frame(
        &self,
        frame: Arc<FrameState>,
        primary: &mut dyn CommandList,
        lists: Vec<Box<dyn CommandList>>,
        returned: &mut Vec<Box<dyn CommandList>>,
    ) -> Result<(FenceEvent, FrameStats), RenderError> {
        let timer = Stopwatch::new();
        primary.reset()?;
        let recorded = self.dispatcher.record(&frame, lists)?;
        let outcome = self.submit_recorded(&frame, primary, &recorded);
        let pass_times = recorded
            .iter()
            .map(|pass| (pass.pass_id, pass.elapsed))
            .collect();
        returned.extend(recorded.into_iter().map(|pass| pass.list));

        let (event, submissions) = outcome?;
        let stats = FrameStats {
            frame_index: frame.frame_index,
            back_buffer_index: frame.back_buffer_index,
            cpu_time: timer.elapsed(),
            pass_times,
            submissions,
            draws: frame.draws.len(),
            lights: frame.lights.len(),
        };
        log::trace!(
            "FrameOrchestrator: frame {} presented in {:.2} ms",
            stats.frame_index,
            stats.cpu_time.as_secs_f64() * 1000.0
        );
        Ok((event, stats))
    }

    fn submit_recorded(
        &self,
        frame: &FrameState,
        primary: &mut dyn CommandList,
        recorded: &[RecordedPass],
    ) -> Result<(FenceEvent, u32), RenderError> {
        for pass in recorded {
            if let Err(err) = &pass.outcome {
                return Err(err.clone());
            }
        }
        for pass in &self.main_passes {
            pass.record(frame, primary)?;
        }
        primary.close()?;

        let pipelined = self.config.submission_mode == SubmissionMode::Pipelined;
        let mut previous: Option<FenceEvent> = None;
        let mut submissions = 0;
        for pass in recorded {
            let waits: Vec<FenceEvent> = match (&previous, pipelined) {
                (Some(event), true) => vec![event.clone()],
                _ => Vec::new(),
            };
            let queue = self.queues.get(pass.queue_kind);
            let event = queue.execute_and_signal(&[pass.list.as_ref()], &waits)?;
            submissions += 1;
            if !pipelined {
                event.wait()?;
            }
            previous = Some(event);
        }

        let waits: Vec<FenceEvent> = previous.into_iter().filter(|_| pipelined).collect();
        let event = self.queues.graphics.execute_and_present(
            &[&*primary],
            &waits,
            self.swap_chain.as_ref(),
            self.config.sync_interval,
            self.config.present_flags,
        )?;
        Ok((event, submissions + 1))
    }

    /// Blocks until the GPU finished every submitted frame.
    pub fn wait_idle(&mut self) -> Result<(), RenderError> {
        self.queues.wait_idle()?;
        for slot in &mut self.slots {
            slot.in_flight = None;
        }
        self.previous_frame = None;
        Ok(())
    }

    /// Rebuilds the per back buffer lists after the swap chain changed its
    /// buffer count. Waits for the GPU first.
    pub fn on_swap_chain_resized(&mut self) -> Result<(), RenderError> {
        self.check_running()?;
        self.wait_idle()?;
        self.create_slots()
    }

    /// Drains the GPU and joins the recording threads.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.wait_idle() {
            log::warn!("FrameOrchestrator: wait_idle failed during shutdown: {err}");
        }
        self.dispatcher.shutdown();
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameOrchestrator")
            .field("frame_index", &self.frame_index)
            .field("slots", &self.slots.len())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}
