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

use super::{bind_frame, pipelines, root, transition};
use lucent_core::renderer::{
    CommandList, FrameState, PassId, RecordingThread, RenderError, RenderPass, ResourceState,
};

/// Tone maps the light accumulation target into the back buffer.
///
/// Recorded on the main thread into the primary list. It takes the back
/// buffer out of `PRESENT` and leaves it as a render target for the overlay.
#[derive(Debug, Default)]
pub struct PostProcessLane;

impl PostProcessLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for PostProcessLane {
    fn pass_id(&self) -> PassId {
        PassId::PostProcess
    }

    fn recording_thread(&self) -> RecordingThread {
        RecordingThread::Main
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let back_buffer = frame.back_buffer;
        transition(
            list,
            &[back_buffer.texture],
            ResourceState::PRESENT,
            ResourceState::RENDER_TARGET,
        );
        list.clear_render_target(back_buffer.rtv, [0.0, 0.0, 0.0, 1.0]);

        bind_frame(frame, list);
        list.set_render_targets(&[back_buffer.rtv], None);
        list.set_pipeline(pipelines::TONEMAP);
        list.set_root_descriptor_table(root::PASS_INPUTS, frame.targets.light_accum_table);
        // Full-screen triangle.
        list.draw(3, 1);
        Ok(())
    }
}
