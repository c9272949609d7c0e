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

use super::{bind_frame, record_draw, transition, COLOR_REST, DEPTH_REST};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, RenderError, RenderPass, ResourceState,
};

/// Clears the geometry buffer and draws every opaque primitive into it.
///
/// The pass also clears the light accumulation target, since it is the first
/// pass of the frame to run on the graphics queue.
#[derive(Debug, Default)]
pub struct GBufferLane;

impl GBufferLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for GBufferLane {
    fn pass_id(&self) -> PassId {
        PassId::GBuffer
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let targets = &frame.targets;
        let colors = [targets.albedo.texture, targets.normal.texture, targets.light_accum.texture];
        transition(list, &colors, COLOR_REST, ResourceState::RENDER_TARGET);
        transition(list, &[targets.depth.texture], DEPTH_REST, ResourceState::DEPTH_WRITE);

        list.clear_render_target(targets.albedo.rtv, [0.0, 0.0, 0.0, 0.0]);
        list.clear_render_target(targets.normal.rtv, [0.5, 0.5, 1.0, 0.0]);
        list.clear_render_target(targets.light_accum.rtv, [0.0, 0.0, 0.0, 1.0]);
        list.clear_depth_stencil(targets.depth.dsv, 1.0);

        bind_frame(frame, list);
        list.set_render_targets(
            &[targets.albedo.rtv, targets.normal.rtv],
            Some(targets.depth.dsv),
        );
        let mut count = 0;
        for item in frame.opaque_draws() {
            record_draw(list, item, None);
            count += 1;
        }
        log::trace!("GBufferLane: {count} opaque draws for frame {}", frame.frame_index);

        transition(list, &colors, ResourceState::RENDER_TARGET, COLOR_REST);
        transition(list, &[targets.depth.texture], ResourceState::DEPTH_WRITE, DEPTH_REST);
        Ok(())
    }
}
