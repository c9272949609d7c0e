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
    BufferDescriptor, BufferUsage, QueueKind, RenderDevice, TextureDescriptor, TextureFormat,
    TextureRegion, TextureUsage,
};
use lucent_data::resource::{OwnedBuffer, OwnedTexture, UploadBatch, UploadConfig};
use lucent_data::sync::CommandQueue;
use lucent_infra::{SoftwareDevice, SoftwareDeviceConfig};
use std::sync::Arc;

const STAGING: u64 = 4096;

fn setup() -> (SoftwareDevice, Arc<dyn RenderDevice>, CommandQueue) {
    let software = SoftwareDevice::new(SoftwareDeviceConfig {
        video_memory: Some(64 * 1024 * 1024),
        ..Default::default()
    });
    let device: Arc<dyn RenderDevice> = Arc::new(software.clone());
    let queue = CommandQueue::new(Arc::clone(&device), QueueKind::Copy).unwrap();
    (software, device, queue)
}

fn config() -> UploadConfig {
    UploadConfig {
        max_staging_bytes: STAGING,
        ..Default::default()
    }
}

#[test]
fn test_staging_size_is_a_bounded_fraction_of_memory() {
    let (_, device, _) = setup();
    let caps = device.capabilities();
    let default = UploadConfig::default();
    assert_eq!(default.staging_size(caps), 4 * 1024 * 1024);
    assert_eq!(config().staging_size(caps), STAGING);

    let tiny = UploadConfig {
        max_staging_bytes: 1,
        ..Default::default()
    };
    assert_eq!(tiny.staging_size(caps), caps.texture_placement_alignment);
}

#[test]
fn test_oversized_buffer_is_split_into_staging_sized_chunks() {
    // --- 1. ARRANGE ---
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let size = STAGING * 5 / 2;
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let destination = OwnedBuffer::new(
        Arc::clone(&device),
        &BufferDescriptor::gpu_local("vertices", size, BufferUsage::VERTEX | BufferUsage::COPY_DST),
    )
    .unwrap();

    // --- 2. ACT ---
    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    batch.add_buffer(destination.id(), 0, &data).unwrap();
    let receipt = batch.finish().unwrap();
    receipt.event.wait().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(receipt.stats.chunks, 3, "2.5x staging needs three chunks");
    assert_eq!(receipt.stats.flushes, 2, "two intermediate flushes");
    assert_eq!(receipt.stats.submissions, 3);
    assert_eq!(receipt.stats.bytes_staged, size);
    assert_eq!(destination.read(0, size).unwrap(), data);
}

#[test]
fn test_thousands_of_chunks_stay_on_a_small_stack() {
    // --- 1. ARRANGE ---
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let smallest = UploadConfig {
        max_staging_bytes: 1,
        ..Default::default()
    };
    let staging = smallest.staging_size(&caps);
    let chunk_count = 5_000u64;
    let size = staging * chunk_count;
    let data: Vec<u8> = (0..size).map(|i| (i % 253) as u8).collect();
    let destination = OwnedBuffer::new(
        Arc::clone(&device),
        &BufferDescriptor::gpu_local("big", size, BufferUsage::COPY_DST),
    )
    .unwrap();

    // --- 2. ACT ---
    let receipt = std::thread::scope(|scope| {
        std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn_scoped(scope, || {
                let mut batch = UploadBatch::begin(&queue, &caps, &smallest).unwrap();
                batch.add_buffer(destination.id(), 0, &data).unwrap();
                batch.finish().unwrap()
            })
            .unwrap()
            .join()
            .unwrap()
    });
    receipt.event.wait().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(receipt.stats.chunks as u64, chunk_count);
    assert_eq!(
        receipt.stats.flushes as u64,
        chunk_count - 1,
        "one flush between consecutive chunks"
    );
    assert_eq!(destination.read(0, size).unwrap(), data, "chunks land in order");
}

#[test]
fn test_small_uploads_share_one_submission() {
    let (software, device, queue) = setup();
    let caps = device.capabilities().clone();
    let a = OwnedBuffer::new(
        Arc::clone(&device),
        &BufferDescriptor::gpu_local("a", 64, BufferUsage::COPY_DST),
    )
    .unwrap();
    let b = OwnedBuffer::new(
        Arc::clone(&device),
        &BufferDescriptor::gpu_local("b", 64, BufferUsage::COPY_DST),
    )
    .unwrap();

    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    batch.add_buffer(a.id(), 0, &[1; 64]).unwrap();
    batch.add_buffer(b.id(), 32, &[2; 32]).unwrap();
    let receipt = batch.finish().unwrap();
    receipt.event.wait().unwrap();

    assert_eq!(receipt.stats.submissions, 1);
    assert_eq!(receipt.stats.flushes, 0);
    assert_eq!(a.read(0, 64).unwrap(), vec![1; 64]);
    assert_eq!(b.read(32, 32).unwrap(), vec![2; 32]);
    assert_eq!(software.stats().copies, 2);
}

#[test]
fn test_texture_rows_are_padded_and_split() {
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    // 40 rows of 64 texels: 256 bytes per row, 16 rows per 4 KiB staging buffer.
    let (width, height) = (64u32, 40u32);
    let texture = OwnedTexture::new(
        Arc::clone(&device),
        &TextureDescriptor::new_2d(
            "albedo",
            width,
            height,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED | TextureUsage::COPY_DST,
        ),
    )
    .unwrap();
    let texels: Vec<u8> = (0..width * height * 4).map(|i| (i / 256) as u8).collect();

    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    batch
        .add_texture(
            texture.id(),
            TextureFormat::Rgba8Unorm,
            TextureRegion::full(width, height),
            &texels,
        )
        .unwrap();
    let receipt = batch.finish().unwrap();
    receipt.event.wait().unwrap();

    assert_eq!(receipt.stats.chunks, 3);
    assert_eq!(device.read_texture(texture.id(), 0, 0).unwrap(), texels);
}

#[test]
fn test_narrow_texture_rows_use_the_pitch_alignment() {
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let texture = OwnedTexture::new(
        Arc::clone(&device),
        &TextureDescriptor::new_2d(
            "mask",
            3,
            2,
            TextureFormat::Rgba8Unorm,
            TextureUsage::COPY_DST,
        ),
    )
    .unwrap();
    let texels: Vec<u8> = (0..24).collect();

    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    batch
        .add_texture(texture.id(), TextureFormat::Rgba8Unorm, TextureRegion::full(3, 2), &texels)
        .unwrap();
    assert_eq!(batch.stats().bytes_staged, 2 * caps.texture_row_pitch_alignment);
    let receipt = batch.finish().unwrap();
    receipt.event.wait().unwrap();

    assert_eq!(device.read_texture(texture.id(), 0, 0).unwrap(), texels);
}

#[test]
fn test_mismatched_texel_data_is_rejected() {
    let (_, device, queue) = setup();
    let caps = device.capabilities().clone();
    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    let result = batch.add_texture(
        lucent_core::renderer::TextureId(0),
        TextureFormat::Rgba8Unorm,
        TextureRegion::full(4, 4),
        &[0; 10],
    );
    assert!(result.is_err());
}

#[test]
fn test_finish_keeps_staging_alive_until_the_event() {
    let (software, device, queue) = setup();
    let caps = device.capabilities().clone();
    let destination = OwnedBuffer::new(
        Arc::clone(&device),
        &BufferDescriptor::gpu_local("dst", 16, BufferUsage::COPY_DST),
    )
    .unwrap();

    let mut batch = UploadBatch::begin(&queue, &caps, &config()).unwrap();
    batch.add_buffer(destination.id(), 0, &[7; 16]).unwrap();
    let receipt = batch.finish().unwrap();
    assert_eq!(receipt.event.retained_count(), 1);
    assert_eq!(software.live_buffers(), 2, "staging is held by the event");

    receipt.event.wait().unwrap();
    drop(receipt);
    assert_eq!(software.live_buffers(), 1);
}
