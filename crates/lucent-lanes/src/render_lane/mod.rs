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

//! Render pass lanes of the deferred pipeline.
//!
//! Worker lanes ([`GBufferLane`], [`ShadowLane`], [`LightLane`],
//! [`AlphaBlendLane`]) record into their own command list on a dedicated
//! thread. Main-thread lanes ([`PostProcessLane`], [`OverlayLane`]) record
//! into the primary list after the workers are done.
//!
//! Every lane owns the resource transitions of what it touches: it moves its
//! targets into the state it needs and back into their resting state before
//! closing, so lanes can be recorded in any order and submitted in pass order.

mod alpha_blend_lane;
mod gbuffer_lane;
mod light_lane;
mod overlay_lane;
mod post_process_lane;
mod shadow_lane;

pub use alpha_blend_lane::AlphaBlendLane;
pub use gbuffer_lane::GBufferLane;
pub use light_lane::LightLane;
pub use overlay_lane::OverlayLane;
pub use post_process_lane::PostProcessLane;
pub use shadow_lane::ShadowLane;

use lucent_core::renderer::{
    CommandList, DrawItem, FrameState, PipelineKey, RenderPass, ResourceBarrier, ResourceState,
    TextureId,
};
use std::sync::Arc;

/// Root parameter slots shared by every pipeline.
pub mod root {
    /// Per-frame constants (camera, viewport).
    pub const FRAME: u32 = 0;
    /// Per-object constants.
    pub const OBJECT: u32 = 1;
    /// Per-material constants.
    pub const MATERIAL: u32 = 2;
    /// Material texture table.
    pub const MATERIAL_TEXTURES: u32 = 3;
    /// Pass input table (G-buffer, light accumulation).
    pub const PASS_INPUTS: u32 = 4;
    /// Sampler table.
    pub const SAMPLERS: u32 = 5;
    /// Per-light constants.
    pub const LIGHT: u32 = 6;
}

/// Programs recorded by the lanes.
pub mod pipelines {
    use lucent_core::renderer::PipelineKey;

    /// Depth-only rendering into the shadow map.
    pub const SHADOW_DEPTH: PipelineKey = PipelineKey("shadow_depth");
    /// Tiled deferred lighting (compute).
    pub const DEFERRED_LIGHTING: PipelineKey = PipelineKey("deferred_lighting");
    /// Tone mapping of the light accumulation target into the back buffer.
    pub const TONEMAP: PipelineKey = PipelineKey("tonemap");
    /// Default program of opaque materials.
    pub const GBUFFER_OPAQUE: PipelineKey = PipelineKey("gbuffer_opaque");
    /// Default program of blended materials.
    pub const FORWARD_BLEND: PipelineKey = PipelineKey("forward_blend");
}

/// Resting state of color targets between passes.
pub(crate) const COLOR_REST: ResourceState = ResourceState::ALL_SHADER_RESOURCE;
/// Resting state of depth targets between passes.
pub(crate) const DEPTH_REST: ResourceState = ResourceState::DEPTH_READ;

/// Transitions `textures` from `before` to `after` in one barrier batch.
pub(crate) fn transition(
    list: &mut dyn CommandList,
    textures: &[TextureId],
    before: ResourceState,
    after: ResourceState,
) {
    let barriers: Vec<ResourceBarrier> = textures
        .iter()
        .map(|texture| ResourceBarrier::texture(*texture, before, after))
        .collect();
    list.resource_barrier(&barriers);
}

/// Binds the heaps and per-frame parameters every graphics lane starts with.
pub(crate) fn bind_frame(frame: &FrameState, list: &mut dyn CommandList) {
    list.set_descriptor_heaps(&[frame.resource_heap, frame.sampler_heap]);
    list.set_root_constant_buffer(root::FRAME, frame.frame_constants);
    list.set_root_descriptor_table(root::SAMPLERS, frame.sampler_table);
}

/// Records one indexed draw of `item`, with `pipeline` replacing the
/// material's own program when given.
pub(crate) fn record_draw(
    list: &mut dyn CommandList,
    item: &DrawItem,
    pipeline: Option<PipelineKey>,
) {
    list.set_pipeline(pipeline.unwrap_or(item.pipeline));
    list.set_root_constant_buffer(root::OBJECT, item.object_constants);
    list.set_root_constant_buffer(root::MATERIAL, item.material_constants);
    if let Some(table) = item.material_table {
        list.set_root_descriptor_table(root::MATERIAL_TEXTURES, table);
    }
    list.set_vertex_buffer(0, item.vertex_buffer, 0, item.vertex_stride);
    list.set_index_buffer(item.index_buffer, 0, item.index_format);
    list.draw_indexed(item.index_count, 1, 0, 0);
}

/// The six lanes of the deferred pipeline, in submission order.
pub fn deferred_pipeline() -> Vec<Arc<dyn RenderPass>> {
    vec![
        Arc::new(GBufferLane::new()),
        Arc::new(ShadowLane::new()),
        Arc::new(LightLane::new()),
        Arc::new(AlphaBlendLane::new()),
        Arc::new(PostProcessLane::new()),
        Arc::new(OverlayLane::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucent_core::renderer::{PassId, RecordingThread};

    #[test]
    fn deferred_pipeline_is_in_submission_order() {
        let lanes = deferred_pipeline();
        let ids: Vec<PassId> = lanes.iter().map(|lane| lane.pass_id()).collect();
        assert_eq!(ids, PassId::ALL.to_vec());
    }

    #[test]
    fn only_post_process_and_overlay_record_on_main() {
        for lane in deferred_pipeline() {
            let expected = match lane.pass_id() {
                PassId::PostProcess | PassId::Overlay => RecordingThread::Main,
                _ => RecordingThread::Worker,
            };
            assert_eq!(lane.recording_thread(), expected, "{}", lane.pass_id());
        }
    }
}
