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

use super::{bind_frame, record_draw, transition, COLOR_REST};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, RenderError, RenderPass, ResourceState,
};

/// Blends transparent geometry over the lit scene.
///
/// Depth is bound read-only, so blended draws are tested against the opaque
/// scene without writing it.
#[derive(Debug, Default)]
pub struct AlphaBlendLane;

impl AlphaBlendLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for AlphaBlendLane {
    fn pass_id(&self) -> PassId {
        PassId::AlphaBlend
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let targets = &frame.targets;
        transition(
            list,
            &[targets.light_accum.texture],
            COLOR_REST,
            ResourceState::RENDER_TARGET,
        );

        bind_frame(frame, list);
        list.set_render_targets(&[targets.light_accum.rtv], Some(targets.depth.dsv));
        for item in frame.alpha_draws() {
            record_draw(list, item, None);
        }

        transition(
            list,
            &[targets.light_accum.texture],
            ResourceState::RENDER_TARGET,
            COLOR_REST,
        );
        Ok(())
    }
}
