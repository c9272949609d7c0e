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

use lucent_core::renderer::{
    BufferId, CommandList, CpuDescriptorHandle, DepthView, DescriptorHeapId, DrawItem,
    FrameState, FrameTargets, GpuDescriptorHandle, IndexFormat, LightItem, PipelineKey,
    QueueKind, RenderDevice, RenderPass, ResourceState, TargetView, TextureId,
};
use lucent_infra::graphics::software::{Command, SoftwareCommandList};
use lucent_infra::SoftwareDevice;
use lucent_lanes::render_lane::{
    pipelines, root, AlphaBlendLane, GBufferLane, LightLane, OverlayLane, PostProcessLane,
    ShadowLane,
};

fn target(n: usize) -> TargetView {
    TargetView {
        texture: TextureId(n),
        rtv: CpuDescriptorHandle(0x1000 + n as u64),
    }
}

fn depth(n: usize) -> DepthView {
    DepthView {
        texture: TextureId(n),
        dsv: CpuDescriptorHandle(0x2000 + n as u64),
    }
}

fn draw(n: usize, alpha_blended: bool, casts_shadow: bool) -> DrawItem {
    DrawItem {
        pipeline: PipelineKey("material"),
        vertex_buffer: BufferId(100 + n),
        vertex_stride: 32,
        index_buffer: BufferId(200 + n),
        index_format: IndexFormat::Uint16,
        index_count: 6,
        object_constants: 0x10_0000 + n as u64 * 256,
        material_constants: 0x20_0000,
        material_table: None,
        alpha_blended,
        casts_shadow,
    }
}

fn frame() -> FrameState {
    FrameState {
        frame_index: 7,
        back_buffer_index: 1,
        back_buffer: target(9),
        width: 100,
        height: 40,
        targets: FrameTargets {
            albedo: target(1),
            normal: target(2),
            depth: depth(3),
            shadow_map: depth(4),
            light_accum: target(5),
            gbuffer_table: GpuDescriptorHandle(0x9000),
            light_accum_table: GpuDescriptorHandle(0x9100),
        },
        resource_heap: DescriptorHeapId(1),
        sampler_heap: DescriptorHeapId(2),
        sampler_table: GpuDescriptorHandle(0x9200),
        frame_constants: 0x30_0000,
        draws: vec![draw(0, false, true), draw(1, true, false), draw(2, false, false)],
        lights: vec![
            LightItem {
                constants: 0x40_0000,
                shadowed: true,
            },
            LightItem {
                constants: 0x40_0100,
                shadowed: false,
            },
        ],
    }
}

fn record(pass: &dyn RenderPass, frame: &FrameState) -> Vec<Command> {
    let device = SoftwareDevice::default();
    let mut list = device
        .create_command_list(pass.queue_kind(), Some(pass.pass_id().name()))
        .unwrap();
    pass.record(frame, list.as_mut()).unwrap();
    list.close().unwrap();
    list.as_any()
        .downcast_ref::<SoftwareCommandList>()
        .unwrap()
        .commands()
        .to_vec()
}

fn count(commands: &[Command], f: impl Fn(&Command) -> bool) -> usize {
    commands.iter().filter(|c| f(c)).count()
}

/// Every barrier that moves a texture out of a state must be matched by one
/// that moves it back, so the lane leaves resources where it found them.
fn assert_balanced_transitions(commands: &[Command]) {
    let mut net: Vec<(TextureId, ResourceState, i32)> = Vec::new();
    for command in commands {
        if let Command::Barrier(barriers) = command {
            for barrier in barriers {
                if let lucent_core::renderer::ResourceRef::Texture(texture) = barrier.resource {
                    for (state, delta) in [(barrier.before, -1), (barrier.after, 1)] {
                        match net.iter_mut().find(|(t, s, _)| *t == texture && *s == state) {
                            Some(entry) => entry.2 += delta,
                            None => net.push((texture, state, delta)),
                        }
                    }
                }
            }
        }
    }
    for (texture, state, delta) in net {
        assert_eq!(delta, 0, "{texture:?} left unbalanced in {state:?}");
    }
}

#[test]
fn test_gbuffer_lane_clears_and_draws_opaque_items() {
    // --- 1. ARRANGE ---
    let frame = frame();

    // --- 2. ACT ---
    let commands = record(&GBufferLane::new(), &frame);

    // --- 3. ASSERT ---
    assert_eq!(
        count(&commands, |c| matches!(c, Command::ClearRenderTarget { .. })),
        3,
        "albedo, normal and light accumulation must be cleared"
    );
    assert!(commands.contains(&Command::ClearDepthStencil {
        target: frame.targets.depth.dsv,
        depth: 1.0
    }));
    assert_eq!(
        count(&commands, |c| matches!(c, Command::DrawIndexed { .. })),
        2,
        "only the two opaque draws belong to the G-buffer"
    );
    assert!(commands.contains(&Command::SetRenderTargets {
        colors: vec![frame.targets.albedo.rtv, frame.targets.normal.rtv],
        depth: Some(frame.targets.depth.dsv),
    }));
    assert!(commands.contains(&Command::SetRootConstantBuffer {
        slot: root::FRAME,
        gpu_address: frame.frame_constants,
    }));
    assert_balanced_transitions(&commands);
}

#[test]
fn test_shadow_lane_draws_casters_once_per_shadowed_light() {
    let frame = frame();
    let commands = record(&ShadowLane::new(), &frame);

    let draws = count(&commands, |c| matches!(c, Command::DrawIndexed { .. }));
    assert_eq!(draws, 1, "one caster times one shadowed light");
    assert!(commands.contains(&Command::SetPipeline(pipelines::SHADOW_DEPTH)));
    assert!(!commands.contains(&Command::SetPipeline(PipelineKey("material"))));
    assert!(commands.contains(&Command::SetRenderTargets {
        colors: vec![],
        depth: Some(frame.targets.shadow_map.dsv),
    }));
    assert_balanced_transitions(&commands);
}

#[test]
fn test_light_lane_dispatches_per_light_on_compute() {
    let frame = frame();
    let lane = LightLane::new();
    assert_eq!(lane.queue_kind(), QueueKind::Compute);

    let commands = record(&lane, &frame);

    let dispatches: Vec<&Command> = commands
        .iter()
        .filter(|c| matches!(c, Command::Dispatch { .. }))
        .collect();
    assert_eq!(dispatches.len(), frame.lights.len());
    assert_eq!(dispatches[0], &Command::Dispatch { x: 7, y: 3, z: 1 });
    assert!(commands.contains(&Command::SetRootDescriptorTable {
        slot: root::PASS_INPUTS,
        table: frame.targets.gbuffer_table,
    }));
    assert_balanced_transitions(&commands);
}

#[test]
fn test_alpha_blend_lane_draws_only_blended_items() {
    let frame = frame();
    let commands = record(&AlphaBlendLane::new(), &frame);

    assert_eq!(
        count(&commands, |c| matches!(c, Command::DrawIndexed { .. })),
        1
    );
    assert!(commands.contains(&Command::SetVertexBuffer {
        slot: 0,
        buffer: BufferId(101),
        offset: 0,
        stride: 32,
    }));
    assert_balanced_transitions(&commands);
}

#[test]
fn test_main_thread_lanes_hand_the_back_buffer_to_present() {
    // --- 1. ARRANGE ---
    let frame = frame();
    let device = SoftwareDevice::default();
    let mut primary = device
        .create_command_list(QueueKind::Graphics, Some("primary"))
        .unwrap();

    // --- 2. ACT ---
    PostProcessLane::new().record(&frame, primary.as_mut()).unwrap();
    OverlayLane::new().record(&frame, primary.as_mut()).unwrap();
    primary.close().unwrap();

    // --- 3. ASSERT ---
    let commands = primary
        .as_any()
        .downcast_ref::<SoftwareCommandList>()
        .unwrap()
        .commands();
    assert!(commands.contains(&Command::SetPipeline(pipelines::TONEMAP)));
    assert!(commands.contains(&Command::Draw {
        vertex_count: 3,
        instance_count: 1
    }));
    assert!(commands.contains(&Command::Marker("overlay".into())));
    assert_balanced_transitions(commands);
    match commands.last() {
        Some(Command::Barrier(barriers)) => {
            assert_eq!(barriers[0].after, ResourceState::PRESENT, "frame must end presentable")
        }
        other => panic!("expected a final barrier, got {other:?}"),
    }
}
