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

use lucent_core::renderer::{DescriptorHeapKind, RenderDevice, ResourceError};
use lucent_data::assets::{MaterialConstants, ObjectConstants, IDENTITY};
use lucent_data::resource::{ConstantBufferArena, DescriptorPool};
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig};
use std::sync::Arc;

fn device() -> Arc<dyn RenderDevice> {
    Arc::new(SoftwareDevice::new(SoftwareDeviceConfig {
        video_memory: Some(64 * 1024 * 1024),
        ..Default::default()
    }))
}

fn arena(device: &Arc<dyn RenderDevice>, capacity: u32) -> ConstantBufferArena<ObjectConstants> {
    let caps = device.capabilities().clone();
    ConstantBufferArena::initialize_with_capacity(Arc::clone(device), &caps, capacity, "objects")
        .unwrap()
}

#[test]
fn test_allocation_bumps_until_capacity() {
    let device = device();
    let arena = arena(&device, 4);

    let first = arena.allocate(3);
    let second = arena.allocate(1);
    assert_eq!(first.base_index(), 0);
    assert_eq!(second.base_index(), 3);
    assert_eq!(arena.size(), 4);
    assert_eq!(arena.size(), arena.capacity());
}

#[test]
#[should_panic(expected = "arena exhausted")]
fn test_allocating_past_capacity_aborts() {
    let device = device();
    let arena = arena(&device, 4);
    let _ = arena.allocate(5);
}

#[test]
fn test_try_allocate_leaves_the_arena_untouched_on_failure() {
    let device = device();
    let arena = arena(&device, 4);
    let _ = arena.allocate(2);
    assert_eq!(
        arena.try_allocate(3),
        Err(ResourceError::ArenaExhausted {
            requested: 3,
            size: 2,
            capacity: 4
        })
    );
    assert_eq!(arena.size(), 2);
}

#[test]
fn test_gpu_addresses_step_by_element_size() {
    let device = device();
    let arena = arena(&device, 8);
    let slice = arena.allocate(4);

    let base = arena.gpu_address(&slice, 0).unwrap();
    assert_eq!(base % 256, 0);
    assert_eq!(arena.gpu_address(&slice, 3).unwrap(), base + 3 * 256);
    assert_eq!(
        arena.gpu_address(&slice, 4),
        Err(ResourceError::OutOfBounds)
    );
}

#[test]
fn test_writes_land_at_the_element_offset() {
    let device = device();
    let arena = arena(&device, 4);
    let _skip = arena.allocate(1);
    let slice = arena.allocate(2);

    let mut world = IDENTITY;
    world[3] = [1.0, 2.0, 3.0, 1.0];
    let constants = ObjectConstants::new(world, IDENTITY);
    arena.write(&slice, 1, &constants).unwrap();

    let bytes = arena.buffer().read(2 * 256, 256).unwrap();
    assert_eq!(bytes, bytemuck::bytes_of(&constants));
}

#[test]
fn test_views_cover_every_element() {
    let device = device();
    let caps = device.capabilities().clone();
    let materials: ConstantBufferArena<MaterialConstants> =
        ConstantBufferArena::initialize_with_capacity(Arc::clone(&device), &caps, 4, "materials")
            .unwrap();
    let pool = DescriptorPool::new(
        Arc::clone(&device),
        &caps,
        DescriptorHeapKind::CbvSrvUav,
        8,
        true,
        "cbv",
    )
    .unwrap();

    let slice = materials.allocate(3);
    materials
        .write_all(
            &slice,
            &[MaterialConstants::new([1.0; 4], 0.0, 0.5, 0); 3],
        )
        .unwrap();
    let lease = pool.allocate_descriptors_unique(3);
    assert!(materials.create_views(&slice, lease.view()).is_ok());

    let short = pool.allocate_descriptors_unique(2);
    assert_eq!(
        materials.create_views(&slice, short.view()),
        Err(ResourceError::OutOfBounds)
    );
}
