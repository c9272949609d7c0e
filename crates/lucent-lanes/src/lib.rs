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

//! # Lucent Lanes
//!
//! The hot-path strategies of the renderer.
//!
//! - [`render_lane`]: one [`RenderPass`](lucent_core::renderer::RenderPass)
//!   per stage of the deferred pipeline. Lanes only record commands from the
//!   shared [`FrameState`](lucent_core::renderer::FrameState); they never
//!   submit and never touch allocator bookkeeping.
//! - [`asset_lane`]: CPU-side asset data, image decoding, and staging of
//!   meshes and textures through an
//!   [`UploadBatch`](lucent_data::resource::UploadBatch).

#![warn(missing_docs)]

pub mod asset_lane;
pub mod render_lane;
