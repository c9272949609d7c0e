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

//! Provides the public, backend-agnostic GPU contracts for Lucent.
//!
//! This module contains the typed resource handles and descriptors ([`api`]),
//! the traits a backend must implement ([`traits`]), the immutable
//! [`DeviceCapabilities`] object, the per-frame [`FrameState`] shared with
//! recording threads, and the error hierarchy.
//!
//! The 'how' lives in a concrete backend (for example the software device in
//! `lucent-infra`), while `lucent-data`, `lucent-lanes` and `lucent-agents`
//! only ever talk to these traits.

pub mod api;
pub mod capabilities;
pub mod error;
pub mod frame;
pub mod traits;

pub use self::api::*;
pub use self::capabilities::{
    align_up, DescriptorIncrements, DeviceCapabilities, CONSTANT_BUFFER_ALIGNMENT,
};
pub use self::error::{RenderError, ResourceError};
pub use self::frame::{DepthView, DrawItem, FrameState, FrameTargets, LightItem, TargetView};
pub use self::traits::{CommandList, PassId, RecordingThread, RenderDevice, RenderPass, SwapChain};
