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

//! CPU-side asset data and its path onto the GPU.
//!
//! Decoding is the data plane of asset loading: a [`AssetDecoder`] turns raw
//! file bytes into engine-ready CPU data. Staging then copies that data into
//! GPU-local buffers and textures through an
//! [`UploadBatch`](lucent_data::resource::UploadBatch).

mod mesh_data;
mod staging;
mod texture_decoder;

pub use self::mesh_data::{IndexData, MaterialData, MeshData, PrimitiveData, Vertex};
pub use self::staging::{stage_primitive, stage_texture, StagedPrimitive};
pub use self::texture_decoder::{CpuTexture, TextureDecodeLane};

/// A lane that decodes one kind of asset from a byte slice.
///
/// Implementors do the CPU-heavy work only; they never touch the device, so
/// they can run on any thread.
pub trait AssetDecoder<A>: Send + Sync {
    /// Parses `bytes` into an `A`.
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<A>;
}
