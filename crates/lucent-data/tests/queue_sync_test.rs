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
    CommandList, PresentFlags, QueueKind, RenderDevice, RenderError, SwapChain,
};
use lucent_data::sync::{CommandQueue, Fence};
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig, TimelineEvent};
use std::sync::Arc;
use std::time::Duration;

fn setup(latency: Duration) -> (SoftwareDevice, Arc<dyn RenderDevice>) {
    let software = SoftwareDevice::new(SoftwareDeviceConfig {
        list_latency: latency,
        video_memory: Some(64 * 1024 * 1024),
        ..Default::default()
    });
    let device: Arc<dyn RenderDevice> = Arc::new(software.clone());
    (software, device)
}

fn closed_list(
    device: &Arc<dyn RenderDevice>,
    kind: QueueKind,
    label: &str,
) -> Box<dyn CommandList> {
    let mut list = device.create_command_list(kind, Some(label)).unwrap();
    list.insert_marker(label);
    list.close().unwrap();
    list
}

#[test]
fn test_fence_round_trip() {
    let (_, device) = setup(Duration::from_millis(5));
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Graphics).unwrap();

    let list = closed_list(&device, QueueKind::Graphics, "work");
    let first = queue.execute_and_signal(&[&*list], &[]).unwrap();
    let second = queue.signal().unwrap();

    assert_eq!(first.value(), 1);
    assert_eq!(second.value(), 2, "signal values increase strictly");
    assert_eq!(queue.fence().target_value(), 2);

    queue.wait(&second).unwrap();
    assert!(queue.is_finished(&first));
    assert!(queue.fence().is_finished());
    assert!(queue.fence().completed_value() >= 2);
}

#[test]
fn test_standalone_fence_waits_are_short_circuited() {
    let (_, device) = setup(Duration::ZERO);
    let fence = Fence::new(Arc::clone(&device)).unwrap();
    assert!(fence.is_finished(), "a fresh fence has nothing pending");
    assert!(fence.wait_for(0).is_ok());
}

#[test]
fn test_gpu_wait_orders_work_across_queues() {
    // --- 1. ARRANGE ---
    let (software, device) = setup(Duration::from_millis(20));
    let copy = CommandQueue::new(Arc::clone(&device), QueueKind::Copy).unwrap();
    let graphics = CommandQueue::new(Arc::clone(&device), QueueKind::Graphics).unwrap();
    let upload = closed_list(&device, QueueKind::Copy, "upload");
    let draw = closed_list(&device, QueueKind::Graphics, "draw");

    // --- 2. ACT ---
    let uploaded = copy.execute_and_signal(&[&*upload], &[]).unwrap();
    let drawn = graphics
        .execute_and_signal(&[&*draw], std::slice::from_ref(&uploaded))
        .unwrap();
    drawn.wait().unwrap();

    // --- 3. ASSERT ---
    let timeline = software.timeline();
    let upload_record = timeline
        .iter()
        .find(|r| r.list_label() == Some("upload"))
        .expect("upload executed");
    let draw_record = timeline
        .iter()
        .find(|r| r.list_label() == Some("draw"))
        .expect("draw executed");
    assert!(
        upload_record.happened_before(draw_record),
        "the graphics list must not start before the copy signal"
    );
    assert!(timeline.iter().any(|r| matches!(
        r.event,
        TimelineEvent::Wait { fence, value } if fence == uploaded.fence_id() && value == uploaded.value()
    )));
}

#[test]
fn test_gpu_wait_on_own_fence_is_skipped() {
    let (software, device) = setup(Duration::ZERO);
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Compute).unwrap();
    let event = queue.signal().unwrap();
    queue.gpu_wait(&event).unwrap();
    queue.flush().unwrap();

    let waits = software
        .timeline()
        .iter()
        .filter(|r| matches!(r.event, TimelineEvent::Wait { .. }))
        .count();
    assert_eq!(waits, 0);
}

#[test]
fn test_execute_and_present_sequences_the_flip() {
    let (software, device) = setup(Duration::from_millis(2));
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Graphics).unwrap();
    let swap_chain = software.create_swap_chain(queue.id(), 2, 16, 16).unwrap();

    for frame in 0..3 {
        let list = closed_list(&device, QueueKind::Graphics, &format!("frame_{frame}"));
        let event = queue
            .execute_and_present(&[&*list], &[], &swap_chain, 1, PresentFlags::default())
            .unwrap();
        event.wait().unwrap();
    }

    let timeline = software.timeline();
    let order: Vec<&str> = timeline
        .iter()
        .filter_map(|r| match &r.event {
            TimelineEvent::CommandList { label, .. } => Some(label.as_str()),
            TimelineEvent::Present { .. } => Some("present"),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec!["frame_0", "present", "frame_1", "present", "frame_2", "present"]
    );
    assert_eq!(swap_chain.current_back_buffer_index(), 1);
    assert_eq!(software.stats().presents, 3);
}

#[test]
fn test_device_removal_fails_presentation_without_signal() {
    let (software, device) = setup(Duration::ZERO);
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Graphics).unwrap();
    let swap_chain = software.create_swap_chain(queue.id(), 2, 16, 16).unwrap();
    let target_before = queue.fence().target_value();

    software.simulate_device_removal();
    assert!(matches!(
        device.create_command_list(QueueKind::Graphics, None),
        Err(RenderError::DeviceLost)
    ));

    let result = queue.execute_and_present(&[], &[], &swap_chain, 1, PresentFlags::default());
    let err = result.unwrap_err();
    assert!(err.is_device_loss());
    assert_eq!(queue.fence().target_value(), target_before);

    // Waits never block on a removed device.
    assert!(queue.fence().wait_for(u64::MAX - 1).is_ok());
}
