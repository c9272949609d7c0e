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

//! Descriptor heaps and the intermediate render targets of the deferred
//! pipeline.

use lucent_core::renderer::{
    DepthView, DescriptorHeapId, DescriptorHeapKind, DeviceCapabilities, FrameTargets,
    GpuDescriptorHandle, RenderDevice, RenderError, ResourceError, SwapChain, TargetView,
    TextureDescriptor, TextureFormat, TextureId, TextureUsage, ViewDescriptor,
};
use lucent_data::resource::{DescriptorLease, DescriptorPool, OwnedTexture};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Slot counts of the four descriptor heaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorCapacities {
    /// Shader-visible constant buffer, shader resource and unordered access views.
    pub resources: u32,
    /// Shader-visible samplers.
    pub samplers: u32,
    /// Render target views.
    pub render_targets: u32,
    /// Depth/stencil views.
    pub depth_stencils: u32,
}

impl Default for DescriptorCapacities {
    fn default() -> Self {
        Self {
            resources: 4096,
            samplers: 32,
            render_targets: 64,
            depth_stencils: 16,
        }
    }
}

/// The process-wide descriptor heaps, shared by the renderer and the asset
/// loader.
#[derive(Debug, Clone)]
pub struct DescriptorPools {
    /// Shader-visible CBV/SRV/UAV heap.
    pub resources: Arc<DescriptorPool>,
    /// Shader-visible sampler heap.
    pub samplers: Arc<DescriptorPool>,
    /// CPU-only render target view heap.
    pub render_targets: Arc<DescriptorPool>,
    /// CPU-only depth/stencil view heap.
    pub depth_stencils: Arc<DescriptorPool>,
}

impl DescriptorPools {
    /// Creates the four heaps.
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        capabilities: &DeviceCapabilities,
        capacities: &DescriptorCapacities,
    ) -> Result<Self, ResourceError> {
        let pool = |kind, capacity, shader_visible, label| {
            DescriptorPool::new(
                Arc::clone(device),
                capabilities,
                kind,
                capacity,
                shader_visible,
                label,
            )
        };
        Ok(Self {
            resources: pool(
                DescriptorHeapKind::CbvSrvUav,
                capacities.resources,
                true,
                "cbv_srv_uav",
            )?,
            samplers: pool(DescriptorHeapKind::Sampler, capacities.samplers, true, "samplers")?,
            render_targets: pool(
                DescriptorHeapKind::RenderTarget,
                capacities.render_targets,
                false,
                "rtv",
            )?,
            depth_stencils: pool(
                DescriptorHeapKind::DepthStencil,
                capacities.depth_stencils,
                false,
                "dsv",
            )?,
        })
    }
}

/// G-buffer layout: albedo, normal, depth, shadow map SRVs, then the light
/// accumulation UAV.
const GBUFFER_TABLE_SIZE: u32 = 5;

fn gpu_handle(lease: &DescriptorLease) -> Result<GpuDescriptorHandle, ResourceError> {
    lease.view().try_gpu_handle().ok_or_else(|| {
        ResourceError::InvalidDescription("descriptor table in a CPU-only heap".into())
    })
}

/// The intermediate targets, their views, and the back buffer views of one
/// swap chain configuration. Rebuilt when the swap chain is resized.
#[derive(Debug)]
pub struct FrameTargetSet {
    width: u32,
    height: u32,
    albedo: OwnedTexture,
    normal: OwnedTexture,
    depth: OwnedTexture,
    shadow_map: OwnedTexture,
    light_accum: OwnedTexture,
    // albedo, normal, light_accum
    color_views: DescriptorLease,
    // depth, shadow map
    depth_views: DescriptorLease,
    back_buffer_views: DescriptorLease,
    back_buffers: Vec<TextureId>,
    gbuffer_table: DescriptorLease,
    light_accum_table: DescriptorLease,
    sampler_table: DescriptorLease,
    resource_heap: DescriptorHeapId,
    sampler_heap: DescriptorHeapId,
}

impl FrameTargetSet {
    /// Creates targets matching the swap chain extent, and a square shadow
    /// map of `shadow_map_size` texels.
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        pools: &DescriptorPools,
        swap_chain: &dyn SwapChain,
        shadow_map_size: u32,
    ) -> Result<Self, RenderError> {
        let (width, height) = swap_chain.extent();
        let texture = |label: &str, w, h, format, usage| {
            OwnedTexture::new(
                Arc::clone(device),
                &TextureDescriptor::new_2d(label, w, h, format, usage),
            )
        };
        let color = TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED;
        let depth_usage = TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED;
        let albedo = texture("gbuffer_albedo", width, height, TextureFormat::Rgba8Unorm, color)?;
        let normal = texture("gbuffer_normal", width, height, TextureFormat::Rgba16Float, color)?;
        let depth = texture("scene_depth", width, height, TextureFormat::Depth32Float, depth_usage)?;
        let shadow_map = texture(
            "shadow_map",
            shadow_map_size,
            shadow_map_size,
            TextureFormat::Depth32Float,
            depth_usage,
        )?;
        let light_accum = texture(
            "light_accum",
            width,
            height,
            TextureFormat::Rgba16Float,
            color | TextureUsage::STORAGE,
        )?;

        let color_views = pools.render_targets.try_allocate_descriptors_unique(3)?;
        for (n, target) in [&albedo, &normal, &light_accum].into_iter().enumerate() {
            let view = ViewDescriptor::RenderTarget {
                texture: target.id(),
            };
            color_views.write(n as u32, &view)?;
        }
        let depth_views = pools.depth_stencils.try_allocate_descriptors_unique(2)?;
        depth_views.write(0, &ViewDescriptor::DepthStencil { texture: depth.id() })?;
        let shadow_view = ViewDescriptor::DepthStencil {
            texture: shadow_map.id(),
        };
        depth_views.write(1, &shadow_view)?;

        let back_buffers = (0..swap_chain.buffer_count())
            .map(|index| swap_chain.back_buffer(index))
            .collect::<Result<Vec<_>, _>>()?;
        let back_buffer_views = pools
            .render_targets
            .try_allocate_descriptors_unique(back_buffers.len() as u32)?;
        for (n, texture) in back_buffers.iter().enumerate() {
            let view = ViewDescriptor::RenderTarget { texture: *texture };
            back_buffer_views.write(n as u32, &view)?;
        }

        let srv = |texture: &OwnedTexture| ViewDescriptor::ShaderResource {
            texture: texture.id(),
            most_detailed_mip: 0,
            mip_levels: 1,
        };
        let gbuffer_table = pools
            .resources
            .try_allocate_descriptors_unique(GBUFFER_TABLE_SIZE)?;
        for (n, texture) in [&albedo, &normal, &depth, &shadow_map].into_iter().enumerate() {
            gbuffer_table.write(n as u32, &srv(texture))?;
        }
        let light_accum_uav = ViewDescriptor::UnorderedAccess {
            texture: light_accum.id(),
            mip_level: 0,
        };
        gbuffer_table.write(4, &light_accum_uav)?;
        let light_accum_table = pools.resources.try_allocate_descriptors_unique(1)?;
        light_accum_table.write(0, &srv(&light_accum))?;

        let sampler_table = pools.samplers.try_allocate_descriptors_unique(2)?;
        for (n, (linear, wrap)) in [(true, true), (false, false)].into_iter().enumerate() {
            sampler_table.write(n as u32, &ViewDescriptor::Sampler { linear, wrap })?;
        }

        log::info!(
            "FrameTargetSet: {width}x{height} targets, {} back buffers, {shadow_map_size}^2 shadow map",
            back_buffers.len()
        );
        Ok(Self {
            width,
            height,
            albedo,
            normal,
            depth,
            shadow_map,
            light_accum,
            color_views,
            depth_views,
            back_buffer_views,
            back_buffers,
            gbuffer_table,
            light_accum_table,
            sampler_table,
            resource_heap: pools.resources.heap_id(),
            sampler_heap: pools.samplers.heap_id(),
        })
    }

    /// `(width, height)` of the screen-sized targets.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of back buffers with a view.
    pub fn back_buffer_count(&self) -> u32 {
        self.back_buffers.len() as u32
    }

    /// The back buffer at `index` and its render target view.
    pub fn back_buffer(&self, index: u32) -> Result<TargetView, ResourceError> {
        let texture = *self
            .back_buffers
            .get(index as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        Ok(TargetView {
            texture,
            rtv: self.back_buffer_views.view().offset(index).cpu_handle(),
        })
    }

    /// Targets and tables handed to the passes.
    pub fn targets(&self) -> Result<FrameTargets, ResourceError> {
        let color = |n: u32, texture: &OwnedTexture| TargetView {
            texture: texture.id(),
            rtv: self.color_views.view().offset(n).cpu_handle(),
        };
        let depth = |n: u32, texture: &OwnedTexture| DepthView {
            texture: texture.id(),
            dsv: self.depth_views.view().offset(n).cpu_handle(),
        };
        Ok(FrameTargets {
            albedo: color(0, &self.albedo),
            normal: color(1, &self.normal),
            light_accum: color(2, &self.light_accum),
            depth: depth(0, &self.depth),
            shadow_map: depth(1, &self.shadow_map),
            gbuffer_table: gpu_handle(&self.gbuffer_table)?,
            light_accum_table: gpu_handle(&self.light_accum_table)?,
        })
    }

    /// Linear-wrap then point-clamp samplers.
    pub fn sampler_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        gpu_handle(&self.sampler_table)
    }

    /// The shader-visible resource heap.
    pub fn resource_heap(&self) -> DescriptorHeapId {
        self.resource_heap
    }

    /// The shader-visible sampler heap.
    pub fn sampler_heap(&self) -> DescriptorHeapId {
        self.sampler_heap
    }
}
