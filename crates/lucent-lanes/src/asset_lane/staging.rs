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

use super::{CpuTexture, PrimitiveData, Vertex};
use lucent_core::renderer::{
    BufferDescriptor, BufferUsage, IndexFormat, RenderDevice, RenderError,
};
use lucent_data::resource::{OwnedBuffer, OwnedTexture, UploadBatch};
use std::sync::Arc;

/// GPU buffers of one primitive. The copies are recorded but may still be in
/// flight until the batch's receipt event is reached.
#[derive(Debug)]
pub struct StagedPrimitive {
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
}

fn stage_bytes(
    batch: &mut UploadBatch<'_>,
    device: &Arc<dyn RenderDevice>,
    label: &str,
    usage: BufferUsage,
    bytes: &[u8],
) -> Result<Arc<OwnedBuffer>, RenderError> {
    let buffer = OwnedBuffer::new(
        Arc::clone(device),
        &BufferDescriptor::gpu_local(label, bytes.len() as u64, usage | BufferUsage::COPY_DST),
    )?;
    batch.add_buffer(buffer.id(), 0, bytes)?;
    Ok(Arc::new(buffer))
}

/// Creates GPU-local vertex and index buffers for `primitive` and records
/// their uploads into `batch`.
pub fn stage_primitive(
    batch: &mut UploadBatch<'_>,
    device: &Arc<dyn RenderDevice>,
    label: &str,
    primitive: &PrimitiveData,
) -> Result<StagedPrimitive, RenderError> {
    if primitive.vertices.is_empty() || primitive.indices.count() == 0 {
        return Err(RenderError::Internal(format!(
            "primitive '{label}' has no geometry"
        )));
    }
    let vertex_buffer = stage_bytes(
        batch,
        device,
        &format!("{label}_vertices"),
        BufferUsage::VERTEX,
        bytemuck::cast_slice::<Vertex, u8>(&primitive.vertices),
    )?;
    let index_buffer = stage_bytes(
        batch,
        device,
        &format!("{label}_indices"),
        BufferUsage::INDEX,
        primitive.indices.as_bytes(),
    )?;
    log::trace!(
        "stage_primitive({label}): {} vertices, {} indices",
        primitive.vertices.len(),
        primitive.indices.count()
    );
    Ok(StagedPrimitive {
        vertex_buffer,
        vertex_stride: Vertex::STRIDE,
        index_buffer,
        index_format: primitive.indices.format(),
        index_count: primitive.indices.count(),
    })
}

/// Creates a sampled texture for `texture` and records the upload of mip 0
/// into `batch`.
pub fn stage_texture(
    batch: &mut UploadBatch<'_>,
    device: &Arc<dyn RenderDevice>,
    label: &str,
    texture: &CpuTexture,
) -> Result<Arc<OwnedTexture>, RenderError> {
    let owned = OwnedTexture::new(Arc::clone(device), &texture.descriptor(label))?;
    batch.add_texture(owned.id(), texture.format, texture.region(), &texture.pixels)?;
    Ok(Arc::new(owned))
}
