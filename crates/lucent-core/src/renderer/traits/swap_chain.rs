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

use crate::renderer::api::{PresentFlags, TextureId};
use crate::renderer::error::{RenderError, ResourceError};

/// The presentation boundary.
///
/// A swap chain owns a small ring of back buffers. The index of the buffer to
/// render into next is [`current_back_buffer_index`](Self::current_back_buffer_index);
/// it advances once per successful [`present`](Self::present).
pub trait SwapChain: Send + Sync {
    /// Index of the back buffer the next frame renders into.
    fn current_back_buffer_index(&self) -> u32;

    /// Number of back buffers.
    fn buffer_count(&self) -> u32;

    /// The texture backing back buffer `index`.
    fn back_buffer(&self, index: u32) -> Result<TextureId, ResourceError>;

    /// Current `(width, height)` of the back buffers.
    fn extent(&self) -> (u32, u32);

    /// Queues the current back buffer for display after all work previously
    /// submitted to the presenting queue.
    /// ## Errors
    /// * `RenderError::DeviceLost` - If the device was removed.
    fn present(&self, sync_interval: u32, flags: PresentFlags) -> Result<(), RenderError>;

    /// Recreates the back buffers. The caller must have drained the GPU.
    fn resize_buffers(&self, buffer_count: u32, width: u32, height: u32)
        -> Result<(), RenderError>;
}
