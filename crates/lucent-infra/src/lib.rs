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

//! # Lucent Infra
//!
//! Concrete implementations of the contracts defined in `lucent-core`.
//!
//! The [`graphics::software`] backend is a headless device that executes
//! command lists on the CPU. Each hardware queue gets its own executor thread,
//! fences are real counters with OS waits, and buffers and textures hold
//! actual bytes, so copies, clears and cross-queue ordering can be observed.

#![warn(missing_docs)]

pub mod graphics;
pub mod platform;

pub use graphics::software::{
    ExecutionRecord, SoftwareDevice, SoftwareDeviceConfig, SoftwareDeviceStats,
    SoftwareSwapChain, TimelineEvent,
};
