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

//! Defines the core architectural traits for the rendering subsystem.
//!
//! This module contains the fundamental contracts that decouple the renderer's
//! resource and frame logic from any specific graphics backend.
//!
//! - [`RenderDevice`]: Creates queues, fences, resources and descriptor heaps.
//! - [`CommandList`]: A private command buffer plus allocator that records GPU commands.
//! - [`SwapChain`]: The presentation boundary.
//! - [`RenderPass`]: An externally supplied procedure recording one pipeline stage.

mod command_list;
mod render_device;
mod render_pass;
mod swap_chain;

pub use self::command_list::CommandList;
pub use self::render_device::RenderDevice;
pub use self::render_pass::{PassId, RecordingThread, RenderPass};
pub use self::swap_chain::SwapChain;
