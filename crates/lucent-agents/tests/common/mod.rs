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

#![allow(dead_code)]

use lucent_agents::asset_agent::{import_mesh, AssetContext};
use lucent_agents::render_agent::{
    ArenaCapacities, ConstantArenas, DescriptorCapacities, DescriptorPools, FrameOrchestrator,
    FrameOrchestratorConfig, FrameQueues, FrameTargetSet, SubmissionMode,
};
use lucent_core::renderer::{RenderDevice, SwapChain};
use lucent_data::assets::{GpuMesh, ResourcePools};
use lucent_data::memory::SharedPoolHandle;
use lucent_data::resource::UploadConfig;
use lucent_data::scene::{LightKind, LightNode, MeshInstance, Scene, SceneNode};
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig};
use lucent_lanes::asset_lane::{MaterialData, MeshData};
use lucent_lanes::render_lane::{deferred_pipeline, pipelines};
use std::sync::Arc;
use std::time::Duration;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 32;
pub const BACK_BUFFERS: u32 = 3;

/// A complete renderer stack on a software device.
pub struct Harness {
    pub software: SoftwareDevice,
    pub device: Arc<dyn RenderDevice>,
    pub queues: FrameQueues,
    pub swap_chain: Arc<dyn SwapChain>,
    pub descriptors: DescriptorPools,
    pub arenas: Arc<ConstantArenas>,
    pub targets: FrameTargetSet,
    pub pools: Arc<ResourcePools>,
}

impl Harness {
    pub fn new(list_latency: Duration) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let software = SoftwareDevice::new(SoftwareDeviceConfig {
            list_latency,
            video_memory: Some(256 * 1024 * 1024),
            ..Default::default()
        });
        let device: Arc<dyn RenderDevice> = Arc::new(software.clone());
        let queues = FrameQueues::new(&device).unwrap();
        let swap_chain: Arc<dyn SwapChain> = Arc::new(
            software
                .create_swap_chain(queues.graphics.id(), BACK_BUFFERS, WIDTH, HEIGHT)
                .unwrap(),
        );
        let capabilities = device.capabilities().clone();
        let descriptors =
            DescriptorPools::new(&device, &capabilities, &DescriptorCapacities::default())
                .unwrap();
        let arenas = Arc::new(
            ConstantArenas::new(&device, &capabilities, &ArenaCapacities::default()).unwrap(),
        );
        let targets = FrameTargetSet::new(&device, &descriptors, swap_chain.as_ref(), 128).unwrap();
        Self {
            software,
            device,
            queues,
            swap_chain,
            descriptors,
            arenas,
            targets,
            pools: Arc::new(ResourcePools::new()),
        }
    }

    pub fn asset_context(&self) -> AssetContext {
        AssetContext {
            device: Arc::clone(&self.device),
            copy_queue: Arc::clone(&self.queues.copy),
            descriptors: Arc::clone(&self.descriptors.resources),
            arenas: Arc::clone(&self.arenas),
            pools: Arc::clone(&self.pools),
            upload: UploadConfig::default(),
        }
    }

    pub fn orchestrator(&self, submission_mode: SubmissionMode) -> FrameOrchestrator {
        FrameOrchestrator::new(
            Arc::clone(&self.device),
            self.queues.clone(),
            Arc::clone(&self.swap_chain),
            &deferred_pipeline(),
            FrameOrchestratorConfig {
                submission_mode,
                ..Default::default()
            },
        )
        .unwrap()
    }

    pub fn import_quad(&self, name: &str, alpha_blended: bool) -> SharedPoolHandle<GpuMesh> {
        let mut material = MaterialData::opaque(
            format!("{name}_material"),
            pipelines::GBUFFER_OPAQUE,
            [0.8, 0.8, 0.8, 1.0],
        );
        if alpha_blended {
            material.pipeline = pipelines::FORWARD_BLEND;
            material.alpha_blended = true;
        }
        import_mesh(&self.asset_context(), MeshData::quad(name, material)).unwrap()
    }

    /// One opaque shadow caster, one blended quad, one shadowed sun and one
    /// point light.
    pub fn scene(&self) -> Scene {
        let mut scene = Scene::new();
        for (name, alpha_blended) in [("floor", false), ("glass", true)] {
            scene.add(SceneNode::mesh(
                name,
                MeshInstance {
                    mesh: self.import_quad(name, alpha_blended),
                    constants: self.arenas.objects.allocate(1),
                    casts_shadow: !alpha_blended,
                },
            ));
        }
        scene.add(SceneNode::light(
            "sun",
            LightNode {
                kind: LightKind::Directional {
                    direction: [0.0, -1.0, 0.0],
                },
                color: [1.0, 1.0, 1.0],
                intensity: 3.0,
                shadowed: true,
                constants: self.arenas.lights.allocate(1),
            },
        ));
        scene.add(SceneNode::light(
            "lamp",
            LightNode {
                kind: LightKind::Point { range: 4.0 },
                color: [1.0, 0.5, 0.2],
                intensity: 1.0,
                shadowed: false,
                constants: self.arenas.lights.allocate(1),
            },
        ));
        scene
    }
}
