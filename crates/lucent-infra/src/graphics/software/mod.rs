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

//! A headless device that executes command lists on the CPU.
//!
//! - [`SoftwareDevice`]: the [`RenderDevice`](lucent_core::renderer::RenderDevice)
//!   implementation. Cloning it is cheap; all clones share one device.
//! - [`SoftwareSwapChain`]: back buffers flipped on a graphics queue.
//! - [`ExecutionRecord`]: one entry of the execution timeline, used to observe
//!   ordering between queues.

mod command;
mod device;
mod executor;
mod state;
mod swap_chain;
mod timeline;

pub use self::command::{Command, SoftwareCommandList};
pub use self::device::{SoftwareDevice, SoftwareDeviceConfig};
pub use self::state::SoftwareDeviceStats;
pub use self::swap_chain::SoftwareSwapChain;
pub use self::timeline::{ExecutionRecord, TimelineEvent};
