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

use lucent_core::renderer::{IndexFormat, PipelineKey, QueueKind, RenderDevice};
use lucent_data::resource::{UploadBatch, UploadConfig};
use lucent_data::sync::CommandQueue;
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig};
use lucent_lanes::asset_lane::{
    stage_primitive, stage_texture, CpuTexture, IndexData, MaterialData, MeshData, PrimitiveData,
    Vertex,
};
use std::sync::Arc;

fn setup() -> (SoftwareDevice, Arc<dyn RenderDevice>, CommandQueue) {
    let software = SoftwareDevice::new(SoftwareDeviceConfig {
        video_memory: Some(64 * 1024 * 1024),
        ..Default::default()
    });
    let device: Arc<dyn RenderDevice> = Arc::new(software.clone());
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Copy).unwrap();
    (software, device, queue)
}

#[test]
fn test_primitive_buffers_hold_the_staged_geometry() {
    // --- 1. ARRANGE ---
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let mesh = MeshData::quad(
        "quad",
        MaterialData::opaque("white", PipelineKey("gbuffer_opaque"), [1.0; 4]),
    );

    // --- 2. ACT ---
    let mut batch = UploadBatch::begin(&queue, &caps, &UploadConfig::default()).unwrap();
    let staged = stage_primitive(&mut batch, &device, "quad_0", &mesh.primitives[0]).unwrap();
    batch.finish().unwrap().event.wait().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(staged.vertex_stride, Vertex::STRIDE);
    assert_eq!(staged.index_format, IndexFormat::Uint16);
    assert_eq!(staged.index_count, 6);
    let vertices = staged.vertex_buffer.read(0, staged.vertex_buffer.size()).unwrap();
    assert_eq!(
        vertices,
        bytemuck::cast_slice::<Vertex, u8>(&mesh.primitives[0].vertices),
        "vertex bytes must arrive unchanged"
    );
    let indices = staged.index_buffer.read(0, 12).unwrap();
    assert_eq!(indices, mesh.primitives[0].indices.as_bytes());
}

#[test]
fn test_empty_primitives_are_rejected() {
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let empty = PrimitiveData {
        vertices: Vec::new(),
        indices: IndexData::U32(Vec::new()),
        material: 0,
    };
    let mut batch = UploadBatch::begin(&queue, &caps, &UploadConfig::default()).unwrap();
    assert!(stage_primitive(&mut batch, &device, "empty", &empty).is_err());
}

#[test]
fn test_texture_lands_in_mip_zero() {
    // --- 1. ARRANGE ---
    let (software, device, queue) = setup();
    let caps = device.capabilities().clone();
    let texture = CpuTexture::solid(5, 3, [10, 20, 30, 255]);

    // --- 2. ACT ---
    let mut batch = UploadBatch::begin(&queue, &caps, &UploadConfig::default()).unwrap();
    let owned = stage_texture(&mut batch, &device, "albedo", &texture).unwrap();
    batch.finish().unwrap().event.wait().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(owned.extent(), (5, 3));
    assert_eq!(device.read_texture(owned.id(), 0, 0).unwrap(), texture.pixels);
    drop(owned);
    assert_eq!(software.live_textures(), 0, "the texture must be released on drop");
}
