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

//! # Lucent Data
//!
//! The resource lifecycle layer. Everything in here owns or sub-allocates GPU
//! objects created through a [`RenderDevice`](lucent_core::renderer::RenderDevice)
//! and guarantees they are reused only once the GPU is done with them.
//!
//! - [`memory`]: the virtual block allocator and the fixed-capacity object pool.
//! - [`sync`]: fences, fence events and the command queue wrapper.
//! - [`resource`]: descriptor pools and leases, constant buffer arenas, upload
//!   batches and RAII buffers/textures.
//! - [`assets`]: GPU-resident meshes, primitives and materials and their pools.
//! - [`scene`]: the scene node sum type consumed by frame extraction.

#![warn(missing_docs)]

pub mod assets;
pub mod memory;
pub mod resource;
pub mod scene;
pub mod sync;
