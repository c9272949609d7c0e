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

//! # Lucent SDK
//!
//! The stable entry point of the renderer. A [`Renderer`] owns the device,
//! its queues and swap chain, the descriptor heaps and constant arenas, the
//! frame orchestrator and the asset loader; applications describe it with a
//! [`RendererConfig`] and drive it with [`Renderer::render`].

#![warn(missing_docs)]

mod config;
mod renderer;

pub use config::{DeviceSettings, RendererConfig, UploadSettings};
pub use renderer::Renderer;

/// The types an application needs to build scenes and read frame results.
pub mod prelude {
    pub use crate::{Renderer, RendererConfig};
    pub use lucent_agents::asset_agent::LoadOutcome;
    pub use lucent_agents::render_agent::{Camera, FrameStats, SubmissionMode};
    pub use lucent_data::assets::{GpuMesh, Mat4, IDENTITY};
    pub use lucent_data::memory::SharedPoolHandle;
    pub use lucent_data::scene::{LightKind, Scene, SceneNode};
    pub use lucent_lanes::asset_lane::{
        CpuTexture, IndexData, MaterialData, MeshData, PrimitiveData, Vertex,
    };
    pub use lucent_lanes::render_lane::pipelines;
}
