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

use super::{import_mesh, AssetContext};
use anyhow::{ensure, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use lucent_core::Stopwatch;
use lucent_data::assets::GpuMesh;
use lucent_data::memory::SharedPoolHandle;
use lucent_lanes::asset_lane::MeshData;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A mesh to import.
#[derive(Debug)]
pub struct LoadRequest {
    /// Name the outcome is reported under.
    pub name: String,
    /// The CPU-side data.
    pub mesh: MeshData,
}

/// The result of one [`LoadRequest`].
#[derive(Debug)]
pub struct LoadOutcome {
    /// Name of the request.
    pub name: String,
    /// The published mesh.
    pub result: Result<SharedPoolHandle<GpuMesh>>,
    /// Wall time from the start of the worker to its report.
    pub elapsed: Duration,
}

enum Delivery {
    Finished(LoadOutcome),
    Panicked {
        name: String,
        payload: Box<dyn Any + Send>,
    },
}

#[derive(Debug, Default)]
struct LoadCounters {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl LoadCounters {
    fn enter(&self) {
        let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(active, Ordering::AcqRel);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A claimed load slot. Dropping it, on unwind too, leaves the active count
/// and hands the slot back to the dispatcher.
struct SlotGuard {
    slot: usize,
    slots: Sender<usize>,
    counters: Arc<LoadCounters>,
}

impl SlotGuard {
    fn enter(slot: usize, slots: Sender<usize>, counters: Arc<LoadCounters>) -> Self {
        counters.enter();
        Self {
            slot,
            slots,
            counters,
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.counters.leave();
        let _ = self.slots.send(self.slot);
    }
}

/// Front end of the asset loading threads.
///
/// Dropping the loader stops accepting requests, lets the in-flight loads
/// finish and joins the dispatcher.
pub struct AssetLoader {
    requests: Option<Sender<LoadRequest>>,
    outcomes: Receiver<Delivery>,
    dispatcher: Option<JoinHandle<()>>,
    counters: Arc<LoadCounters>,
    pending: AtomicUsize,
    max_concurrent_loads: usize,
}

impl AssetLoader {
    /// Spawns the dispatcher thread with `max_concurrent_loads` load slots.
    pub fn new(context: AssetContext, max_concurrent_loads: usize) -> Result<Self> {
        ensure!(max_concurrent_loads > 0, "at least one load slot is required");
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let counters = Arc::new(LoadCounters::default());

        let dispatcher = {
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name("lucent-asset-dispatcher".into())
                .spawn(move || {
                    dispatcher_loop(
                        context,
                        request_rx,
                        outcome_tx,
                        counters,
                        max_concurrent_loads,
                    )
                })
                .context("Failed to spawn the asset dispatcher thread")?
        };
        log::info!("AssetLoader: dispatcher started with {max_concurrent_loads} load slots");

        Ok(Self {
            requests: Some(request_tx),
            outcomes: outcome_rx,
            dispatcher: Some(dispatcher),
            counters,
            pending: AtomicUsize::new(0),
            max_concurrent_loads,
        })
    }

    /// Queues `mesh` for import under `name`.
    pub fn request(&self, name: impl Into<String>, mesh: MeshData) -> Result<()> {
        let name = name.into();
        let sender = self
            .requests
            .as_ref()
            .context("The asset loader was shut down")?;
        sender
            .send(LoadRequest {
                name: name.clone(),
                mesh,
            })
            .with_context(|| format!("The asset dispatcher exited before '{name}' was queued"))?;
        self.pending.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// A finished load, if any.
    ///
    /// # Panics
    /// Re-raises the panic of a load worker, such as descriptor or constant
    /// arena exhaustion.
    pub fn try_recv(&self) -> Option<LoadOutcome> {
        let delivery = self.outcomes.try_recv().ok()?;
        Some(self.deliver(delivery))
    }

    /// Waits up to `timeout` for a finished load.
    ///
    /// # Panics
    /// Re-raises the panic of a load worker, like [`try_recv`](Self::try_recv).
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadOutcome> {
        match self.outcomes.recv_timeout(timeout) {
            Ok(delivery) => Some(self.deliver(delivery)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn deliver(&self, delivery: Delivery) -> LoadOutcome {
        self.pending.fetch_sub(1, Ordering::AcqRel);
        match delivery {
            Delivery::Finished(outcome) => outcome,
            Delivery::Panicked { name, payload } => {
                log::error!("AssetLoader: the load worker of '{name}' panicked");
                panic::resume_unwind(payload)
            }
        }
    }

    /// Requests whose outcome was not received yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Loads running right now.
    pub fn active_loads(&self) -> usize {
        self.counters.active.load(Ordering::Acquire)
    }

    /// The most loads that ever ran at once.
    pub fn peak_concurrent_loads(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }

    /// The load slot count.
    pub fn max_concurrent_loads(&self) -> usize {
        self.max_concurrent_loads
    }

    /// Stops accepting requests and joins the dispatcher once the queued
    /// loads finished. Idempotent.
    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                log::error!("AssetLoader: the dispatcher thread panicked");
            }
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("pending", &self.pending())
            .field("active", &self.active_loads())
            .field("max_concurrent_loads", &self.max_concurrent_loads)
            .finish()
    }
}

fn dispatcher_loop(
    context: AssetContext,
    requests: Receiver<LoadRequest>,
    outcomes: Sender<Delivery>,
    counters: Arc<LoadCounters>,
    slot_count: usize,
) {
    // A worker owns its slot token until it exits.
    let (slot_tx, slot_rx) = crossbeam_channel::bounded(slot_count);
    for slot in 0..slot_count {
        let _ = slot_tx.send(slot);
    }
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    for request in requests.iter() {
        let Ok(slot) = slot_rx.recv() else {
            break;
        };
        workers.retain(|worker| !worker.is_finished());

        let name = request.name.clone();
        let spawned = {
            let context = context.clone();
            let outcomes = outcomes.clone();
            let slot_tx = slot_tx.clone();
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(format!("lucent-load-{slot}"))
                .spawn(move || {
                    let guard = SlotGuard::enter(slot, slot_tx, counters);
                    let timer = Stopwatch::new();
                    let LoadRequest { name, mesh } = request;
                    let imported = panic::catch_unwind(AssertUnwindSafe(|| {
                        import_mesh(&context, mesh)
                    }));
                    drop(guard);
                    let delivery = match imported {
                        Ok(result) => {
                            if let Err(err) = &result {
                                log::error!("AssetLoader: loading '{name}' failed: {err:#}");
                            }
                            Delivery::Finished(LoadOutcome {
                                name,
                                result,
                                elapsed: timer.elapsed(),
                            })
                        }
                        Err(payload) => Delivery::Panicked { name, payload },
                    };
                    let _ = outcomes.send(delivery);
                })
        };
        match spawned {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                log::error!("AssetLoader: failed to spawn a load worker for '{name}': {err}");
                let _ = outcomes.send(Delivery::Finished(LoadOutcome {
                    name,
                    result: Err(err).context("Failed to spawn a load worker"),
                    elapsed: Duration::ZERO,
                }));
                let _ = slot_tx.send(slot);
            }
        }
    }

    for worker in workers {
        if worker.join().is_err() {
            log::error!("AssetLoader: a load worker panicked");
        }
    }
    log::debug!("AssetLoader: dispatcher stopped");
}
