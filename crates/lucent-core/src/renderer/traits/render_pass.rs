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

use crate::renderer::api::QueueKind;
use crate::renderer::error::RenderError;
use crate::renderer::frame::FrameState;
use crate::renderer::traits::CommandList;
use std::fmt;

/// Stable identifiers of the pipeline stages.
///
/// The declaration order is the submission order: the worker passes
/// GBuffer, Shadow, Light and AlphaBlend are submitted one after another, then
/// the main-thread passes are recorded into the primary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    /// Fills the geometry buffer.
    GBuffer,
    /// Renders the shadow map.
    Shadow,
    /// Accumulates lighting from the geometry buffer.
    Light,
    /// Draws transparent geometry over the lit scene.
    AlphaBlend,
    /// Resolves the lit scene into the back buffer.
    PostProcess,
    /// Draws the overlay on top of everything.
    Overlay,
}

impl PassId {
    /// Every pass, in submission order.
    pub const ALL: [PassId; 6] = [
        PassId::GBuffer,
        PassId::Shadow,
        PassId::Light,
        PassId::AlphaBlend,
        PassId::PostProcess,
        PassId::Overlay,
    ];

    /// Position of the pass in the submission order.
    pub const fn submission_order(&self) -> usize {
        *self as usize
    }

    /// A short name used in logs and command list labels.
    pub const fn name(&self) -> &'static str {
        match self {
            PassId::GBuffer => "gbuffer",
            PassId::Shadow => "shadow",
            PassId::Light => "light",
            PassId::AlphaBlend => "alpha_blend",
            PassId::PostProcess => "post_process",
            PassId::Overlay => "overlay",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a pass records its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingThread {
    /// On a dedicated worker thread, into the pass's private command list.
    Worker,
    /// On the main thread, into the primary command list, after every worker finished.
    Main,
}

/// One discrete stage of the rendering pipeline.
///
/// A pass is a pure function of the shared [`FrameState`]: it records commands
/// and never submits them. Resource transitions for everything it touches are
/// its own responsibility.
pub trait RenderPass: Send + Sync {
    /// The stable identifier of the pass.
    fn pass_id(&self) -> PassId;

    /// The queue its command list is submitted to.
    fn queue_kind(&self) -> QueueKind {
        QueueKind::Graphics
    }

    /// Which thread records the pass.
    fn recording_thread(&self) -> RecordingThread {
        RecordingThread::Worker
    }

    /// Records the pass into an open command list.
    fn record(&self, frame: &FrameState, list: &mut dyn CommandList) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_order_follows_declaration() {
        let mut sorted = PassId::ALL;
        sorted.sort();
        assert_eq!(sorted, PassId::ALL);
        assert!(PassId::GBuffer.submission_order() < PassId::Shadow.submission_order());
        assert!(PassId::Light.submission_order() < PassId::AlphaBlend.submission_order());
    }

    #[test]
    fn names_are_distinct() {
        let mut names: Vec<_> = PassId::ALL.iter().map(|p| p.name()).collect();
        names.dedup();
        assert_eq!(names.len(), PassId::ALL.len());
    }
}
