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

//! The shared render state read by every pass during recording.
//!
//! A [`FrameState`] is produced once per frame by scene extraction and then
//! shared read-only with all recording threads. Recording never mutates it;
//! everything a pass needs (descriptor handles, constant addresses, targets)
//! was stabilized before the workers were woken.

use crate::renderer::api::{
    BufferId, CpuDescriptorHandle, DescriptorHeapId, GpuDescriptorHandle, IndexFormat,
    PipelineKey, TextureId,
};

/// A color target and its render target view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetView {
    /// The texture rendered into.
    pub texture: TextureId,
    /// Its render target view.
    pub rtv: CpuDescriptorHandle,
}

/// A depth target and its depth/stencil view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthView {
    /// The depth texture.
    pub texture: TextureId,
    /// Its depth/stencil view.
    pub dsv: CpuDescriptorHandle,
}

/// The intermediate targets of the deferred pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTargets {
    /// G-buffer albedo.
    pub albedo: TargetView,
    /// G-buffer normals.
    pub normal: TargetView,
    /// Scene depth.
    pub depth: DepthView,
    /// Shadow map depth.
    pub shadow_map: DepthView,
    /// HDR light accumulation.
    pub light_accum: TargetView,
    /// Shader resource table over albedo, normal, depth and shadow map, in that
    /// order, followed by an unordered access view of the light accumulation target.
    pub gbuffer_table: GpuDescriptorHandle,
    /// Shader resource view of the light accumulation target.
    pub light_accum_table: GpuDescriptorHandle,
}

/// One mesh primitive to draw this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    /// The program used for the draw.
    pub pipeline: PipelineKey,
    /// Vertex data.
    pub vertex_buffer: BufferId,
    /// Byte stride of one vertex.
    pub vertex_stride: u32,
    /// Index data.
    pub index_buffer: BufferId,
    /// Width of the indices.
    pub index_format: IndexFormat,
    /// Number of indices to draw.
    pub index_count: u32,
    /// GPU address of the per-object constants.
    pub object_constants: u64,
    /// GPU address of the material constants.
    pub material_constants: u64,
    /// Descriptor table of the material's textures, if it has any.
    pub material_table: Option<GpuDescriptorHandle>,
    /// Drawn in the alpha blend pass instead of the G-buffer pass.
    pub alpha_blended: bool,
    /// Rendered into the shadow map.
    pub casts_shadow: bool,
}

/// One light contributing this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightItem {
    /// GPU address of the light constants.
    pub constants: u64,
    /// Whether the light samples the shadow map.
    pub shadowed: bool,
}

/// Everything passes read while recording one frame.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Back buffer this frame renders into.
    pub back_buffer_index: u32,
    /// The back buffer texture.
    pub back_buffer: TargetView,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Intermediate targets.
    pub targets: FrameTargets,
    /// The shader-visible resource heap bound by every pass.
    pub resource_heap: DescriptorHeapId,
    /// The shader-visible sampler heap.
    pub sampler_heap: DescriptorHeapId,
    /// Sampler table used by passes that sample textures.
    pub sampler_table: GpuDescriptorHandle,
    /// GPU address of the per-frame constants (camera, time).
    pub frame_constants: u64,
    /// Draws in extraction order.
    pub draws: Vec<DrawItem>,
    /// Lights in extraction order.
    pub lights: Vec<LightItem>,
}

impl FrameState {
    /// Draws recorded by the G-buffer pass.
    pub fn opaque_draws(&self) -> impl Iterator<Item = &DrawItem> {
        self.draws.iter().filter(|d| !d.alpha_blended)
    }

    /// Draws recorded by the alpha blend pass.
    pub fn alpha_draws(&self) -> impl Iterator<Item = &DrawItem> {
        self.draws.iter().filter(|d| d.alpha_blended)
    }

    /// Draws recorded by the shadow pass.
    pub fn shadow_casters(&self) -> impl Iterator<Item = &DrawItem> {
        self.draws.iter().filter(|d| d.casts_shadow)
    }
}
