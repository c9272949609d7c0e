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

//! One recording thread per worker pass.
//!
//! Each worker is a small state machine, `Idle -> Recording -> Idle`. A
//! frame's job hands the worker its command list and the shared
//! [`FrameState`]; the worker resets the list, records its pass, closes the
//! list and hands it back on its completion channel. The dispatcher returns
//! only once every worker has handed its list back.

use crossbeam_channel::{Receiver, Sender};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, QueueKind, RecordingThread, RenderDevice, RenderError,
    RenderPass,
};
use lucent_core::Stopwatch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct RecordJob {
    frame: Arc<FrameState>,
    list: Box<dyn CommandList>,
}

/// A pass list handed back by its worker.
pub struct RecordedPass {
    /// The pass that recorded the list.
    pub pass_id: PassId,
    /// The queue the list must be submitted to.
    pub queue_kind: QueueKind,
    /// The closed list, or the list as it was when recording failed.
    pub list: Box<dyn CommandList>,
    /// Whether recording and closing succeeded.
    pub outcome: Result<(), RenderError>,
    /// Wall time spent recording.
    pub elapsed: Duration,
}

impl std::fmt::Debug for RecordedPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordedPass")
            .field("pass_id", &self.pass_id)
            .field("queue_kind", &self.queue_kind)
            .field("list", &self.list.id())
            .field("outcome", &self.outcome)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

struct PassWorker {
    pass_id: PassId,
    queue_kind: QueueKind,
    // Closing the job channel is the shutdown signal.
    jobs: Option<Sender<RecordJob>>,
    done: Receiver<RecordedPass>,
    thread: Option<JoinHandle<()>>,
}

/// Owns the recording threads of every worker pass.
pub struct PassDispatcher {
    workers: Vec<PassWorker>,
    running: Arc<AtomicBool>,
}

impl PassDispatcher {
    /// Spawns one thread per pass with [`RecordingThread::Worker`]. Passes
    /// recorded on the main thread are ignored.
    pub fn new(passes: &[Arc<dyn RenderPass>]) -> Result<Self, RenderError> {
        let running = Arc::new(AtomicBool::new(true));
        let mut worker_passes: Vec<&Arc<dyn RenderPass>> = passes
            .iter()
            .filter(|pass| pass.recording_thread() == RecordingThread::Worker)
            .collect();
        worker_passes.sort_by_key(|pass| pass.pass_id());

        let mut workers = Vec::with_capacity(worker_passes.len());
        for pass in worker_passes {
            let (job_tx, job_rx) = crossbeam_channel::bounded::<RecordJob>(1);
            let (done_tx, done_rx) = crossbeam_channel::bounded::<RecordedPass>(1);
            let pass_id = pass.pass_id();
            let queue_kind = pass.queue_kind();
            let pass = Arc::clone(pass);
            let running = Arc::clone(&running);
            let thread = thread::Builder::new()
                .name(format!("lucent-pass-{}", pass_id.name()))
                .spawn(move || worker_loop(pass, running, job_rx, done_tx))
                .map_err(|err| {
                    RenderError::InitializationFailed(format!(
                        "failed to spawn the {pass_id} recording thread: {err}"
                    ))
                })?;
            workers.push(PassWorker {
                pass_id,
                queue_kind,
                jobs: Some(job_tx),
                done: done_rx,
                thread: Some(thread),
            });
        }
        log::info!("PassDispatcher: {} recording threads", workers.len());
        Ok(Self { workers, running })
    }

    /// `(pass, queue)` of every worker, in submission order.
    pub fn passes(&self) -> Vec<(PassId, QueueKind)> {
        self.workers
            .iter()
            .map(|worker| (worker.pass_id, worker.queue_kind))
            .collect()
    }

    /// Number of recording threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether [`shutdown`](Self::shutdown) has not run yet.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of recording threads not joined yet.
    pub fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|worker| worker.thread.is_some())
            .count()
    }

    /// Creates one command list per worker on `device`, in worker order.
    pub fn create_lists(
        &self,
        device: &dyn RenderDevice,
        suffix: &str,
    ) -> Result<Vec<Box<dyn CommandList>>, RenderError> {
        self.workers
            .iter()
            .map(|worker| {
                let label = format!("{}_{suffix}", worker.pass_id.name());
                device.create_command_list(worker.queue_kind, Some(&label))
            })
            .collect()
    }

    /// Wakes every worker with its list and blocks until all of them handed
    /// their list back. `lists` must hold one list per worker, in worker order.
    ///
    /// The returned passes are in submission order.
    pub fn record(
        &self,
        frame: &Arc<FrameState>,
        lists: Vec<Box<dyn CommandList>>,
    ) -> Result<Vec<RecordedPass>, RenderError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(RenderError::Stopped);
        }
        if lists.len() != self.workers.len() {
            return Err(RenderError::Internal(format!(
                "{} lists for {} recording threads",
                lists.len(),
                self.workers.len()
            )));
        }

        for (worker, list) in self.workers.iter().zip(lists) {
            let sender = worker.jobs.as_ref().ok_or(RenderError::Stopped)?;
            sender
                .send(RecordJob {
                    frame: Arc::clone(frame),
                    list,
                })
                .map_err(|_| worker_gone(worker.pass_id))?;
        }

        // Drain every completion before reporting a failure, so no worker is
        // left holding a finished list.
        let mut recorded = Vec::with_capacity(self.workers.len());
        let mut lost = None;
        for worker in &self.workers {
            match worker.done.recv() {
                Ok(pass) => recorded.push(pass),
                Err(_) => lost = Some(worker_gone(worker.pass_id)),
            }
        }
        match lost {
            Some(err) => Err(err),
            None => Ok(recorded),
        }
    }

    /// Stops every worker and joins its thread. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        for worker in &mut self.workers {
            worker.jobs.take();
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("PassDispatcher: {} thread panicked", worker.pass_id);
                }
            }
        }
        log::debug!("PassDispatcher: all recording threads joined");
    }
}

impl Drop for PassDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PassDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDispatcher")
            .field("passes", &self.passes())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

fn worker_gone(pass_id: PassId) -> RenderError {
    RenderError::Internal(format!("the {pass_id} recording thread exited"))
}

fn worker_loop(
    pass: Arc<dyn RenderPass>,
    running: Arc<AtomicBool>,
    jobs: Receiver<RecordJob>,
    done: Sender<RecordedPass>,
) {
    let pass_id = pass.pass_id();
    log::trace!("{pass_id} recording thread started");
    while running.load(Ordering::Acquire) {
        let Ok(RecordJob { frame, mut list }) = jobs.recv() else {
            break;
        };
        if !running.load(Ordering::Acquire) {
            break;
        }

        let timer = Stopwatch::new();
        let outcome = list
            .reset()
            .and_then(|()| pass.record(&frame, list.as_mut()))
            .and_then(|()| list.close());
        if let Err(err) = &outcome {
            log::error!("{pass_id} recording failed for frame {}: {err}", frame.frame_index);
        }
        let recorded = RecordedPass {
            pass_id,
            queue_kind: pass.queue_kind(),
            list,
            outcome,
            elapsed: timer.elapsed(),
        };
        if done.send(recorded).is_err() {
            break;
        }
    }
    log::trace!("{pass_id} recording thread exiting");
}
