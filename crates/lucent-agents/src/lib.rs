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

//! # Lucent Agents
//!
//! The tactical layer that drives the lanes.
//!
//! - [`render_agent`]: the per-pass recording workers, frame extraction and
//!   the frame orchestrator that submits, presents and guards per-frame
//!   resource reuse.
//! - [`asset_agent`]: the asset loading dispatcher thread and its bounded
//!   pool of load slots.

#![warn(missing_docs)]

pub mod asset_agent;
pub mod render_agent;
