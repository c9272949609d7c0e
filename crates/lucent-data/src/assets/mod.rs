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

//! GPU-resident asset records and the pools that own them.
//!
//! Asset import produces these once the data is on the GPU: meshes own their
//! primitives, primitives share materials, and materials own their constant
//! slice, textures and descriptor table.

mod constants;

pub use self::constants::{
    FrameConstants, LightConstants, Mat4, MaterialConstants, ObjectConstants, IDENTITY,
};

use crate::memory::{ObjectPool, PoolHandle, SharedPoolHandle};
use crate::resource::{ConstantSlice, DescriptorLease, OwnedBuffer, OwnedTexture};
use lucent_core::renderer::{IndexFormat, PipelineKey};
use std::sync::Arc;

/// A material ready for drawing.
#[derive(Debug)]
pub struct GpuMaterial {
    /// Asset name.
    pub name: String,
    /// The program drawing primitives with this material.
    pub pipeline: PipelineKey,
    /// Its element in the material constant arena.
    pub constants: ConstantSlice<MaterialConstants>,
    /// Sampled textures, in descriptor order.
    pub textures: Vec<Arc<OwnedTexture>>,
    /// Shader resource views of `textures`, if there are any.
    pub descriptors: Option<DescriptorLease>,
    /// Drawn by the alpha blend pass.
    pub alpha_blended: bool,
}

/// One draw call worth of geometry.
#[derive(Debug)]
pub struct GpuPrimitive {
    /// Vertex data.
    pub vertex_buffer: Arc<OwnedBuffer>,
    /// Byte stride of one vertex.
    pub vertex_stride: u32,
    /// Index data.
    pub index_buffer: Arc<OwnedBuffer>,
    /// Width of the indices.
    pub index_format: IndexFormat,
    /// Number of indices.
    pub index_count: u32,
    /// The material, shared with other primitives.
    pub material: SharedPoolHandle<GpuMaterial>,
}

/// A named list of primitives.
#[derive(Debug)]
pub struct GpuMesh {
    /// Asset name.
    pub name: String,
    /// The primitives, owned by the mesh.
    pub primitives: Vec<PoolHandle<GpuPrimitive>>,
}

/// The pools every loaded asset lives in.
#[derive(Debug)]
pub struct ResourcePools {
    /// Meshes, shared by scene nodes.
    pub meshes: ObjectPool<GpuMesh>,
    /// Primitives, owned by meshes.
    pub primitives: ObjectPool<GpuPrimitive>,
    /// Materials, shared by primitives.
    pub materials: ObjectPool<GpuMaterial>,
}

impl ResourcePools {
    /// Creates empty pools.
    pub fn new() -> Self {
        Self {
            meshes: ObjectPool::new("meshes"),
            primitives: ObjectPool::new("primitives"),
            materials: ObjectPool::new("materials"),
        }
    }

    /// `(meshes, primitives, materials)` currently alive.
    pub fn live_counts(&self) -> (usize, usize, usize) {
        (
            self.meshes.len(),
            self.primitives.len(),
            self.materials.len(),
        )
    }
}

impl Default for ResourcePools {
    fn default() -> Self {
        Self::new()
    }
}
