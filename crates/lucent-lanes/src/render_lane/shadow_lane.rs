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

use super::{bind_frame, pipelines, record_draw, root, transition, DEPTH_REST};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, RenderError, RenderPass, ResourceState,
};

/// Renders every shadow caster into the shadow map, once per shadowed light.
#[derive(Debug, Default)]
pub struct ShadowLane;

impl ShadowLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for ShadowLane {
    fn pass_id(&self) -> PassId {
        PassId::Shadow
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let shadow_map = frame.targets.shadow_map;
        transition(list, &[shadow_map.texture], DEPTH_REST, ResourceState::DEPTH_WRITE);
        list.clear_depth_stencil(shadow_map.dsv, 1.0);

        bind_frame(frame, list);
        list.set_render_targets(&[], Some(shadow_map.dsv));
        for light in frame.lights.iter().filter(|light| light.shadowed) {
            list.set_root_constant_buffer(root::LIGHT, light.constants);
            for item in frame.shadow_casters() {
                record_draw(list, item, Some(pipelines::SHADOW_DEPTH));
            }
        }

        transition(list, &[shadow_map.texture], ResourceState::DEPTH_WRITE, DEPTH_REST);
        Ok(())
    }
}
