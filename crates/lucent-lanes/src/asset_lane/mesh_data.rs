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

use super::CpuTexture;
use lucent_core::renderer::{IndexFormat, PipelineKey};

/// The vertex layout every mesh is converted to before staging.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
}

impl Vertex {
    /// Byte stride of one vertex.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// A vertex facing +Z.
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal: [0.0, 0.0, 1.0],
            uv,
        }
    }
}

/// Index data in its narrowest lossless width.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

impl IndexData {
    /// Picks 16-bit storage when every index fits.
    pub fn compact(indices: Vec<u32>) -> Self {
        if indices.iter().all(|&index| index <= u16::MAX as u32) {
            IndexData::U16(indices.into_iter().map(|index| index as u16).collect())
        } else {
            IndexData::U32(indices)
        }
    }

    /// Width of one index.
    pub fn format(&self) -> IndexFormat {
        match self {
            IndexData::U16(_) => IndexFormat::Uint16,
            IndexData::U32(_) => IndexFormat::Uint32,
        }
    }

    /// Number of indices.
    pub fn count(&self) -> u32 {
        match self {
            IndexData::U16(indices) => indices.len() as u32,
            IndexData::U32(indices) => indices.len() as u32,
        }
    }

    /// The raw little-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(indices) => bytemuck::cast_slice(indices),
            IndexData::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

/// Surface description of a material, with its textures still encoded.
#[derive(Debug, Clone)]
pub struct MaterialData {
    /// Asset name.
    pub name: String,
    /// The program drawing with this material.
    pub pipeline: PipelineKey,
    /// Base color factor.
    pub base_color: [f32; 4],
    /// Metallic factor.
    pub metallic: f32,
    /// Roughness factor.
    pub roughness: f32,
    /// Encoded image files (PNG, JPEG), in descriptor order.
    pub encoded_textures: Vec<Vec<u8>>,
    /// Textures that are already decoded, appended after the encoded ones.
    pub textures: Vec<CpuTexture>,
    /// Drawn by the alpha blend pass.
    pub alpha_blended: bool,
}

impl MaterialData {
    /// An untextured opaque material.
    pub fn opaque(name: impl Into<String>, pipeline: PipelineKey, base_color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            pipeline,
            base_color,
            metallic: 0.0,
            roughness: 0.5,
            encoded_textures: Vec::new(),
            textures: Vec::new(),
            alpha_blended: false,
        }
    }

    /// Number of textures once everything is decoded.
    pub fn texture_count(&self) -> usize {
        self.encoded_textures.len() + self.textures.len()
    }
}

/// One draw call worth of geometry on the CPU.
#[derive(Debug, Clone)]
pub struct PrimitiveData {
    /// Vertices.
    pub vertices: Vec<Vertex>,
    /// Indices into `vertices`.
    pub indices: IndexData,
    /// Index of the material in [`MeshData::materials`].
    pub material: usize,
}

/// A mesh with its materials, as produced by an importer.
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Asset name.
    pub name: String,
    /// Primitives.
    pub primitives: Vec<PrimitiveData>,
    /// Materials referenced by the primitives.
    pub materials: Vec<MaterialData>,
}

impl MeshData {
    /// A unit quad in the XY plane with one material.
    pub fn quad(name: impl Into<String>, material: MaterialData) -> Self {
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 1.0]),
            Vertex::new([0.5, -0.5, 0.0], [1.0, 1.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 0.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0]),
        ];
        Self {
            name: name.into(),
            primitives: vec![PrimitiveData {
                vertices,
                indices: IndexData::U16(vec![0, 1, 2, 0, 2, 3]),
                material: 0,
            }],
            materials: vec![material],
        }
    }

    /// Checks that every primitive references an existing material and only
    /// indexes its own vertices.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, primitive) in self.primitives.iter().enumerate() {
            anyhow::ensure!(
                primitive.material < self.materials.len(),
                "mesh '{}': primitive {i} references material {} of {}",
                self.name,
                primitive.material,
                self.materials.len()
            );
            let vertex_count = primitive.vertices.len() as u32;
            let out_of_range = match &primitive.indices {
                IndexData::U16(indices) => indices.iter().any(|&x| x as u32 >= vertex_count),
                IndexData::U32(indices) => indices.iter().any(|&x| x >= vertex_count),
            };
            anyhow::ensure!(
                !out_of_range,
                "mesh '{}': primitive {i} indexes past its {vertex_count} vertices",
                self.name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 32);
    }

    #[test]
    fn compact_indices_pick_the_narrowest_width() {
        let small = IndexData::compact(vec![0, 1, 65535]);
        assert_eq!(small.format(), IndexFormat::Uint16);
        assert_eq!(small.as_bytes().len(), 6);

        let large = IndexData::compact(vec![0, 70000]);
        assert_eq!(large.format(), IndexFormat::Uint32);
        assert_eq!(large.count(), 2);
        assert_eq!(large.as_bytes().len(), 8);
    }

    #[test]
    fn validate_rejects_dangling_references() {
        let material = MaterialData::opaque("m", PipelineKey("p"), [1.0; 4]);
        let mut mesh = MeshData::quad("quad", material);
        assert!(mesh.validate().is_ok());

        mesh.primitives[0].material = 3;
        assert!(mesh.validate().is_err());

        mesh.primitives[0].material = 0;
        mesh.primitives[0].indices = IndexData::U16(vec![0, 1, 4]);
        assert!(mesh.validate().is_err());
    }
}
