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

use crate::render_agent::ConstantArenas;
use anyhow::{anyhow, Context, Result};
use lucent_core::renderer::{RenderDevice, ViewDescriptor};
use lucent_core::Stopwatch;
use lucent_data::assets::{GpuMaterial, GpuMesh, GpuPrimitive, MaterialConstants, ResourcePools};
use lucent_data::memory::SharedPoolHandle;
use lucent_data::resource::{DescriptorPool, OwnedTexture, UploadBatch, UploadConfig};
use lucent_data::sync::CommandQueue;
use lucent_lanes::asset_lane::{
    stage_primitive, stage_texture, AssetDecoder, CpuTexture, MaterialData, MeshData,
    StagedPrimitive, TextureDecodeLane,
};
use std::sync::Arc;
use std::thread;

/// Everything an import touches, shared by every load worker.
#[derive(Debug, Clone)]
pub struct AssetContext {
    /// The device resources are created on.
    pub device: Arc<dyn RenderDevice>,
    /// Queue the uploads are submitted to.
    pub copy_queue: Arc<CommandQueue>,
    /// Shader-visible heap the material texture tables are leased from.
    pub descriptors: Arc<DescriptorPool>,
    /// Arenas the material constants are allocated from.
    pub arenas: Arc<ConstantArenas>,
    /// Pools the imported records are published into.
    pub pools: Arc<ResourcePools>,
    /// Staging buffer sizing.
    pub upload: UploadConfig,
}

/// Decodes, uploads and publishes `mesh`. Blocks until its copies executed.
///
/// Material constant elements are never returned to their arena; only the
/// textures and descriptor tables are freed when the mesh is released.
///
/// # Panics
/// Running out of material constants or texture descriptors is fatal.
pub fn import_mesh(context: &AssetContext, mesh: MeshData) -> Result<SharedPoolHandle<GpuMesh>> {
    let timer = Stopwatch::new();
    mesh.validate()?;
    let textures = decode_textures(&mesh.name, &mesh.materials)?;

    let mut batch = UploadBatch::begin(
        &context.copy_queue,
        context.device.capabilities(),
        &context.upload,
    )
    .context("Failed to open the upload batch")?;
    let staged = mesh
        .primitives
        .iter()
        .enumerate()
        .map(|(i, primitive)| {
            stage_primitive(&mut batch, &context.device, &format!("{}_{i}", mesh.name), primitive)
        })
        .collect::<Result<Vec<StagedPrimitive>, _>>()
        .with_context(|| format!("Failed to stage the geometry of '{}'", mesh.name))?;
    let mut material_textures = Vec::with_capacity(textures.len());
    for (material, decoded) in mesh.materials.iter().zip(&textures) {
        let uploaded = decoded
            .iter()
            .enumerate()
            .map(|(t, texture)| {
                let label = format!("{}_{}_{t}", mesh.name, material.name);
                stage_texture(&mut batch, &context.device, &label, texture)
            })
            .collect::<Result<Vec<Arc<OwnedTexture>>, _>>()
            .with_context(|| format!("Failed to stage the textures of '{}'", material.name))?;
        material_textures.push(uploaded);
    }
    let receipt = batch.finish().context("Failed to submit the upload batch")?;
    receipt
        .event
        .wait()
        .context("Failed waiting for the upload batch")?;

    let materials = mesh
        .materials
        .iter()
        .zip(material_textures)
        .map(|(material, textures)| publish_material(context, material, textures))
        .collect::<Result<Vec<_>>>()?;

    let primitives = mesh
        .primitives
        .iter()
        .zip(staged)
        .map(|(primitive, staged)| {
            context.pools.primitives.allocate_unique(GpuPrimitive {
                vertex_buffer: staged.vertex_buffer,
                vertex_stride: staged.vertex_stride,
                index_buffer: staged.index_buffer,
                index_format: staged.index_format,
                index_count: staged.index_count,
                material: materials[primitive.material].clone(),
            })
        })
        .collect();

    log::info!(
        "import_mesh({}): {} primitives, {} materials, {} bytes staged in {:.2} ms",
        mesh.name,
        mesh.primitives.len(),
        mesh.materials.len(),
        receipt.stats.bytes_staged,
        timer.elapsed_ms()
    );
    Ok(context.pools.meshes.allocate_shared(GpuMesh {
        name: mesh.name,
        primitives,
    }))
}

// One decode thread per encoded image, all joined before returning. Already
// decoded textures follow the encoded ones.
fn decode_textures(mesh: &str, materials: &[MaterialData]) -> Result<Vec<Vec<CpuTexture>>> {
    thread::scope(|scope| {
        let pending = materials
            .iter()
            .map(|material| {
                material
                    .encoded_textures
                    .iter()
                    .enumerate()
                    .map(|(t, bytes)| {
                        thread::Builder::new()
                            .name(format!("lucent-decode-{t}"))
                            .spawn_scoped(scope, move || TextureDecodeLane.decode(bytes))
                            .with_context(|| format!("Failed to spawn a decode thread for '{mesh}'"))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        pending
            .into_iter()
            .zip(materials)
            .map(|(handles, material)| {
                let mut decoded = handles
                    .into_iter()
                    .enumerate()
                    .map(|(t, handle)| {
                        handle
                            .join()
                            .map_err(|_| anyhow!("decode thread {t} of '{}' panicked", material.name))?
                            .with_context(|| {
                                format!("Failed to decode texture {t} of '{}'", material.name)
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                decoded.extend(material.textures.iter().cloned());
                Ok(decoded)
            })
            .collect()
    })
}

fn publish_material(
    context: &AssetContext,
    material: &MaterialData,
    textures: Vec<Arc<OwnedTexture>>,
) -> Result<SharedPoolHandle<GpuMaterial>> {
    // The lease goes first: it is returned if anything below unwinds, the
    // constant slice is not.
    let descriptors = if textures.is_empty() {
        None
    } else {
        let lease = context
            .descriptors
            .allocate_descriptors_unique(textures.len() as u32);
        for (n, texture) in textures.iter().enumerate() {
            lease.write(
                n as u32,
                &ViewDescriptor::ShaderResource {
                    texture: texture.id(),
                    most_detailed_mip: 0,
                    mip_levels: 1,
                },
            )?;
        }
        Some(lease)
    };

    let constants = context.arenas.materials.allocate(1);
    context.arenas.materials.write(
        &constants,
        0,
        &MaterialConstants::new(
            material.base_color,
            material.metallic,
            material.roughness,
            textures.len() as u32,
        ),
    )?;

    Ok(context.pools.materials.allocate_shared(GpuMaterial {
        name: material.name.clone(),
        pipeline: material.pipeline,
        constants,
        textures,
        descriptors,
        alpha_blended: material.alpha_blended,
    }))
}
