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

//! Hardware queue kinds and synchronization handles.

use serde::{Deserialize, Serialize};

/// The hardware queue families command lists are submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueKind {
    /// Accepts draw, dispatch and copy commands, and presents.
    Graphics,
    /// Accepts dispatch and copy commands.
    Compute,
    /// Accepts copy commands only.
    Copy,
}

impl QueueKind {
    /// All queue kinds, in a stable order.
    pub const ALL: [QueueKind; 3] = [QueueKind::Graphics, QueueKind::Compute, QueueKind::Copy];

    /// A short lowercase name used in logs and labels.
    pub const fn name(&self) -> &'static str {
        match self {
            QueueKind::Graphics => "graphics",
            QueueKind::Compute => "compute",
            QueueKind::Copy => "copy",
        }
    }
}

/// An opaque handle to a hardware queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub usize);

/// An opaque handle to a device fence (a monotonically increasing counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub usize);

/// Presentation flags passed to [`SwapChain::present`](crate::renderer::SwapChain::present).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentFlags {
    /// Present without waiting for vertical blank even when `sync_interval` is 0.
    pub allow_tearing: bool,
}
