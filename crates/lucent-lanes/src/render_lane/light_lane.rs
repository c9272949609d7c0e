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

use super::{pipelines, root, transition, COLOR_REST};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, QueueKind, RenderError, RenderPass, ResourceState,
};

/// Width and height of the screen tile lit by one compute thread group.
pub const LIGHT_TILE_SIZE: u32 = 16;

/// Accumulates the contribution of every light from the geometry buffer.
///
/// Runs on the compute queue: one dispatch per light over the whole screen,
/// reading the G-buffer table and writing the light accumulation target as an
/// unordered access resource.
#[derive(Debug, Default)]
pub struct LightLane;

impl LightLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }

    /// Thread groups needed to cover a `width` x `height` target.
    pub fn group_count(width: u32, height: u32) -> (u32, u32) {
        (
            width.div_ceil(LIGHT_TILE_SIZE).max(1),
            height.div_ceil(LIGHT_TILE_SIZE).max(1),
        )
    }
}

impl RenderPass for LightLane {
    fn pass_id(&self) -> PassId {
        PassId::Light
    }

    fn queue_kind(&self) -> QueueKind {
        QueueKind::Compute
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let light_accum = frame.targets.light_accum.texture;
        transition(list, &[light_accum], COLOR_REST, ResourceState::UNORDERED_ACCESS);

        list.set_descriptor_heaps(&[frame.resource_heap, frame.sampler_heap]);
        list.set_pipeline(pipelines::DEFERRED_LIGHTING);
        list.set_root_constant_buffer(root::FRAME, frame.frame_constants);
        list.set_root_descriptor_table(root::PASS_INPUTS, frame.targets.gbuffer_table);
        list.set_root_descriptor_table(root::SAMPLERS, frame.sampler_table);

        let (groups_x, groups_y) = Self::group_count(frame.width, frame.height);
        for light in &frame.lights {
            list.set_root_constant_buffer(root::LIGHT, light.constants);
            list.dispatch(groups_x, groups_y, 1);
        }

        transition(list, &[light_accum], ResourceState::UNORDERED_ACCESS, COLOR_REST);
        Ok(())
    }
}
