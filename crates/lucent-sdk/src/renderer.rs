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

//! The [`Renderer`] facade.

use crate::RendererConfig;
use anyhow::{Context, Result};
use lucent_agents::asset_agent::{import_mesh, AssetContext, AssetLoader, LoadOutcome};
use lucent_agents::render_agent::{
    extract_frame, Camera, ConstantArenas, DescriptorPools, FrameOrchestrator,
    FrameOrchestratorConfig, FrameQueues, FrameStats, FrameTargetSet,
};
use lucent_core::renderer::{PresentFlags, RenderDevice, SwapChain};
use lucent_core::Stopwatch;
use lucent_data::assets::{GpuMesh, ResourcePools};
use lucent_data::memory::SharedPoolHandle;
use lucent_data::scene::{LightKind, LightNode, MeshInstance, Scene};
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig, SoftwareDeviceStats};
use lucent_lanes::asset_lane::MeshData;
use lucent_lanes::render_lane::deferred_pipeline;
use std::sync::Arc;
use std::time::Duration;

/// A deferred renderer on a software device.
///
/// Fields drop in declaration order: the loader and the orchestrator drain
/// their threads and the GPU before the resources they reference go away.
pub struct Renderer {
    loader: AssetLoader,
    orchestrator: FrameOrchestrator,
    targets: FrameTargetSet,
    pools: Arc<ResourcePools>,
    arenas: Arc<ConstantArenas>,
    descriptors: DescriptorPools,
    swap_chain: Arc<dyn SwapChain>,
    queues: FrameQueues,
    device: Arc<dyn RenderDevice>,
    software: SoftwareDevice,
    config: RendererConfig,
    clock: Stopwatch,
}

impl Renderer {
    /// Builds the device and every renderer component described by `config`.
    pub fn new(config: RendererConfig) -> Result<Self> {
        config.validate()?;
        let software = SoftwareDevice::new(SoftwareDeviceConfig::from(&config.device));
        let device: Arc<dyn RenderDevice> = Arc::new(software.clone());
        let capabilities = device.capabilities().clone();
        log::info!(
            "Renderer: {} with {} MiB of video memory",
            capabilities.adapter_name,
            capabilities.dedicated_video_memory / (1024 * 1024)
        );

        let queues = FrameQueues::new(&device).context("Failed to create the command queues")?;
        let swap_chain: Arc<dyn SwapChain> = Arc::new(
            software
                .create_swap_chain(
                    queues.graphics.id(),
                    config.back_buffer_count,
                    config.width,
                    config.height,
                )
                .context("Failed to create the swap chain")?,
        );
        let descriptors = DescriptorPools::new(&device, &capabilities, &config.descriptors)
            .context("Failed to create the descriptor heaps")?;
        let arenas = Arc::new(
            ConstantArenas::new(&device, &capabilities, &config.arenas)
                .context("Failed to create the constant arenas")?,
        );
        let targets = FrameTargetSet::new(
            &device,
            &descriptors,
            swap_chain.as_ref(),
            config.shadow_map_size,
        )
        .context("Failed to create the frame targets")?;
        let orchestrator = FrameOrchestrator::new(
            Arc::clone(&device),
            queues.clone(),
            Arc::clone(&swap_chain),
            &deferred_pipeline(),
            FrameOrchestratorConfig {
                submission_mode: config.submission_mode,
                sync_interval: config.sync_interval,
                present_flags: PresentFlags::default(),
            },
        )
        .context("Failed to start the frame orchestrator")?;

        let pools = Arc::new(ResourcePools::new());
        let loader = AssetLoader::new(
            AssetContext {
                device: Arc::clone(&device),
                copy_queue: Arc::clone(&queues.copy),
                descriptors: Arc::clone(&descriptors.resources),
                arenas: Arc::clone(&arenas),
                pools: Arc::clone(&pools),
                upload: config.upload.into(),
            },
            config.max_concurrent_loads,
        )?;

        Ok(Self {
            loader,
            orchestrator,
            targets,
            pools,
            arenas,
            descriptors,
            swap_chain,
            queues,
            device,
            software,
            config,
            clock: Stopwatch::new(),
        })
    }

    fn asset_context(&self) -> AssetContext {
        AssetContext {
            device: Arc::clone(&self.device),
            copy_queue: Arc::clone(&self.queues.copy),
            descriptors: Arc::clone(&self.descriptors.resources),
            arenas: Arc::clone(&self.arenas),
            pools: Arc::clone(&self.pools),
            upload: self.config.upload.into(),
        }
    }

    /// The configuration the renderer was built with, with the current extent.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The device.
    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    /// The software device, for its counters and simulation hooks.
    pub fn software_device(&self) -> &SoftwareDevice {
        &self.software
    }

    /// Work counters of the device.
    pub fn device_stats(&self) -> SoftwareDeviceStats {
        self.software.stats()
    }

    /// The pools loaded assets live in.
    pub fn pools(&self) -> &ResourcePools {
        &self.pools
    }

    /// `false` once a device-loss class error stopped the frame loop.
    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    /// Imports `mesh` on the calling thread.
    pub fn load_mesh_blocking(&self, mesh: MeshData) -> Result<SharedPoolHandle<GpuMesh>> {
        import_mesh(&self.asset_context(), mesh)
    }

    /// Queues `mesh` on the asset loader. The outcome is reported by
    /// [`poll_loads`](Self::poll_loads) under `name`.
    pub fn load_mesh(&self, name: impl Into<String>, mesh: MeshData) -> Result<()> {
        self.loader.request(name, mesh)
    }

    /// Loads that finished since the last poll.
    ///
    /// # Panics
    /// Re-raises a load that aborted on descriptor or constant exhaustion.
    pub fn poll_loads(&self) -> Vec<LoadOutcome> {
        std::iter::from_fn(|| self.loader.try_recv()).collect()
    }

    /// Blocks until every queued load reported, or `timeout` passed.
    pub fn wait_for_loads(&self, timeout: Duration) -> Vec<LoadOutcome> {
        let timer = Stopwatch::new();
        let mut outcomes = Vec::new();
        while self.loader.pending() > 0 {
            let Some(left) = timeout.checked_sub(timer.elapsed()) else {
                log::warn!(
                    "Renderer: {} loads still pending after {timeout:?}",
                    self.loader.pending()
                );
                break;
            };
            match self.loader.recv_timeout(left) {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    /// An instance of `mesh` with its own object constants, ready to be
    /// wrapped in a [`SceneNode`](lucent_data::scene::SceneNode).
    ///
    /// # Panics
    /// Panics when the object arena is full.
    pub fn create_mesh_instance(
        &self,
        mesh: SharedPoolHandle<GpuMesh>,
        casts_shadow: bool,
    ) -> MeshInstance {
        let constants = self.arenas.objects.allocate(1);
        MeshInstance {
            mesh,
            constants,
            casts_shadow,
        }
    }

    /// A light with its own light constants.
    ///
    /// # Panics
    /// Panics when the light arena is full.
    pub fn create_light(
        &self,
        kind: LightKind,
        color: [f32; 3],
        intensity: f32,
        shadowed: bool,
    ) -> LightNode {
        let constants = self.arenas.lights.allocate(1);
        LightNode {
            kind,
            color,
            intensity,
            shadowed,
            constants,
        }
    }

    /// Renders and presents one frame of `scene` seen from `camera`.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<FrameStats> {
        let begin = self
            .orchestrator
            .begin_frame()
            .context("Failed to begin the frame")?;
        let frame = extract_frame(
            scene,
            &self.arenas,
            &self.targets,
            camera,
            begin,
            self.clock.elapsed().as_secs_f32(),
        )
        .with_context(|| format!("Failed to extract frame {}", begin.frame_index))?;
        self.orchestrator
            .submit_frame(frame)
            .with_context(|| format!("Failed to submit frame {}", begin.frame_index))
    }

    /// Resizes the output. Waits for the GPU, then recreates the back buffers
    /// and every size-dependent target.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == (self.config.width, self.config.height) {
            return Ok(());
        }
        anyhow::ensure!(width > 0 && height > 0, "cannot resize to {width}x{height}");
        self.orchestrator.wait_idle()?;
        self.swap_chain
            .resize_buffers(self.config.back_buffer_count, width, height)
            .context("Failed to resize the swap chain")?;
        self.orchestrator.on_swap_chain_resized()?;
        self.targets = FrameTargetSet::new(
            &self.device,
            &self.descriptors,
            self.swap_chain.as_ref(),
            self.config.shadow_map_size,
        )
        .context("Failed to recreate the frame targets")?;
        self.config.width = width;
        self.config.height = height;
        log::info!("Renderer: resized to {width}x{height}");
        Ok(())
    }

    /// Blocks until the GPU finished every submitted frame.
    pub fn wait_idle(&mut self) -> Result<()> {
        self.orchestrator.wait_idle()?;
        Ok(())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("orchestrator", &self.orchestrator)
            .field("loader", &self.loader)
            .field("extent", &self.targets.extent())
            .finish()
    }
}
