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

mod common;

use common::{Harness, BACK_BUFFERS};
use lucent_agents::render_agent::{
    extract_frame, Camera, FrameOrchestrator, FrameStats, FrameTargetSet, SubmissionMode,
};
use lucent_core::renderer::{PassId, RenderError};
use lucent_data::scene::Scene;
use lucent_infra::{ExecutionRecord, TimelineEvent};
use std::time::Duration;

fn run_frame(
    harness: &Harness,
    orchestrator: &mut FrameOrchestrator,
    scene: &Scene,
) -> Result<FrameStats, RenderError> {
    let begin = orchestrator.begin_frame()?;
    let frame = extract_frame(
        scene,
        &harness.arenas,
        &harness.targets,
        &Camera::default(),
        begin,
        begin.frame_index as f32 / 60.0,
    )?;
    orchestrator.submit_frame(frame)
}

fn first_list<'a>(timeline: &'a [ExecutionRecord], label: &str) -> &'a ExecutionRecord {
    timeline
        .iter()
        .find(|record| record.list_label() == Some(label))
        .unwrap_or_else(|| panic!("no command list labelled '{label}' executed"))
}

fn assert_pass_order(timeline: &[ExecutionRecord], back_buffer: u32) {
    let chain = ["gbuffer", "shadow", "light", "alpha_blend", "primary"]
        .map(|name| first_list(timeline, &format!("{name}_{back_buffer}")));
    for pair in chain.windows(2) {
        assert!(
            pair[0].happened_before(pair[1]),
            "{:?} must finish before {:?} starts",
            pair[0].list_label(),
            pair[1].list_label()
        );
    }
    let present = timeline
        .iter()
        .find(|record| {
            matches!(record.event, TimelineEvent::Present { back_buffer_index } if back_buffer_index == back_buffer)
        })
        .expect("the frame must be presented");
    assert!(
        chain[4].happened_before(present),
        "the flip must follow the primary list"
    );
}

#[test]
fn test_blocking_frames_execute_in_pass_order() {
    // --- 1. ARRANGE ---
    let harness = Harness::new(Duration::from_millis(2));
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Blocking);
    harness.software.clear_timeline();

    // --- 2. ACT ---
    let stats = run_frame(&harness, &mut orchestrator, &scene).unwrap();
    orchestrator.wait_idle().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.frame_index, 0);
    assert_eq!(stats.back_buffer_index, 0);
    assert_eq!(stats.submissions, 5, "four worker passes and the primary list");
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.lights, 2);
    assert_eq!(
        stats.pass_times.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![PassId::GBuffer, PassId::Shadow, PassId::Light, PassId::AlphaBlend]
    );
    assert_pass_order(&harness.software.timeline(), 0);
}

#[test]
fn test_pipelined_frames_are_ordered_by_gpu_waits() {
    // --- 1. ARRANGE ---
    let harness = Harness::new(Duration::from_millis(5));
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Pipelined);
    harness.software.clear_timeline();

    // --- 2. ACT ---
    let stats = run_frame(&harness, &mut orchestrator, &scene).unwrap();
    orchestrator.wait_idle().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.submissions, 5);
    let timeline = harness.software.timeline();
    assert_pass_order(&timeline, 0);
    assert!(
        timeline
            .iter()
            .any(|record| matches!(record.event, TimelineEvent::Wait { .. })),
        "pipelined submission orders queues with GPU-side waits"
    );
}

#[test]
fn test_frames_cycle_back_buffers_without_validation_errors() {
    // --- 1. ARRANGE ---
    let harness = Harness::new(Duration::ZERO);
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Blocking);
    let frames = BACK_BUFFERS as u64 * 2 + 1;

    // --- 2. ACT ---
    let indices: Vec<u32> = (0..frames)
        .map(|_| {
            run_frame(&harness, &mut orchestrator, &scene)
                .unwrap()
                .back_buffer_index
        })
        .collect();
    orchestrator.wait_idle().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(indices, vec![0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(orchestrator.frame_index(), frames);
    let stats = harness.software.stats();
    assert_eq!(stats.presents, frames);
    assert_eq!(stats.validation_errors, 0, "every recorded command must be valid");
    // Per frame: one opaque and one blended quad, one caster for the one
    // shadowed light, and the full-screen tonemap.
    assert_eq!(stats.draws, frames * 4);
    assert_eq!(stats.dispatches, frames * 2, "one dispatch per light");
}

#[test]
fn test_frame_constants_are_written_per_back_buffer() {
    let harness = Harness::new(Duration::ZERO);
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Blocking);

    for _ in 0..2 {
        run_frame(&harness, &mut orchestrator, &scene).unwrap();
    }
    orchestrator.wait_idle().unwrap();

    let first = harness.arenas.read_frame(0).unwrap();
    let second = harness.arenas.read_frame(1).unwrap();
    assert_eq!(first.viewport[3], 0.0, "frame 0 rendered into back buffer 0");
    assert_eq!(second.viewport[3], 1.0, "frame 1 rendered into back buffer 1");
}

#[test]
fn test_device_loss_stops_the_frame_loop() {
    // --- 1. ARRANGE ---
    let harness = Harness::new(Duration::ZERO);
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Blocking);
    run_frame(&harness, &mut orchestrator, &scene).unwrap();

    // --- 2. ACT ---
    harness.software.simulate_device_removal();
    let err = run_frame(&harness, &mut orchestrator, &scene).unwrap_err();

    // --- 3. ASSERT ---
    assert!(err.is_device_loss(), "unexpected error {err:?}");
    assert!(!orchestrator.is_running());
    assert_eq!(orchestrator.begin_frame(), Err(RenderError::Stopped));
    assert_eq!(orchestrator.frame_index(), 1, "the failed frame is not counted");
}

#[test]
fn test_device_loss_joins_the_recording_threads() {
    // --- 1. ARRANGE ---
    let harness = Harness::new(Duration::ZERO);
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Pipelined);
    run_frame(&harness, &mut orchestrator, &scene).unwrap();
    let workers_before = orchestrator.live_workers();

    // --- 2. ACT ---
    harness.software.simulate_device_removal();
    let err = run_frame(&harness, &mut orchestrator, &scene).unwrap_err();

    // --- 3. ASSERT ---
    assert!(err.is_device_loss(), "unexpected error {err:?}");
    assert_eq!(workers_before, 4, "one recording thread per worker pass");
    assert_eq!(
        orchestrator.live_workers(),
        0,
        "recording threads must be joined once the device is lost"
    );
}

#[test]
fn test_swap_chain_resize_rebuilds_frame_slots() {
    let mut harness = Harness::new(Duration::ZERO);
    let scene = harness.scene();
    let mut orchestrator = harness.orchestrator(SubmissionMode::Blocking);
    run_frame(&harness, &mut orchestrator, &scene).unwrap();

    orchestrator.wait_idle().unwrap();
    harness
        .swap_chain
        .resize_buffers(2, common::WIDTH * 2, common::HEIGHT)
        .unwrap();
    orchestrator.on_swap_chain_resized().unwrap();
    harness.targets = FrameTargetSet::new(
        &harness.device,
        &harness.descriptors,
        harness.swap_chain.as_ref(),
        128,
    )
    .unwrap();

    let indices: Vec<u32> = (0..3)
        .map(|_| {
            run_frame(&harness, &mut orchestrator, &scene)
                .unwrap()
                .back_buffer_index
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 0]);
    orchestrator.wait_idle().unwrap();
    assert_eq!(harness.targets.extent(), (common::WIDTH * 2, common::HEIGHT));
    assert_eq!(harness.software.stats().validation_errors, 0);
}
