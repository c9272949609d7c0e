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

use super::transition;
use lucent_core::renderer::{
    CommandList, FrameState, PassId, RecordingThread, RenderError, RenderPass, ResourceState,
};

/// Last pass of the frame: marks the overlay region and hands the back buffer
/// to the presentation engine.
#[derive(Debug, Default)]
pub struct OverlayLane;

impl OverlayLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for OverlayLane {
    fn pass_id(&self) -> PassId {
        PassId::Overlay
    }

    fn recording_thread(&self) -> RecordingThread {
        RecordingThread::Main
    }

    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError> {
        list.insert_marker("overlay");
        transition(
            list,
            &[frame.back_buffer.texture],
            ResourceState::RENDER_TARGET,
            ResourceState::PRESENT,
        );
        Ok(())
    }
}
