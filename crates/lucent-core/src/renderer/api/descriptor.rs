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

//! Descriptor heaps and the views stored in them.
//!
//! A descriptor heap is a fixed-size table of resource-view slots. Shader code
//! addresses views by index; the CPU and GPU address of slot `i` is
//! `base + i * increment`, where the increment comes from
//! [`DeviceCapabilities`](crate::renderer::DeviceCapabilities).

use crate::renderer::api::{BufferId, TextureId};

/// The kinds of descriptor heaps a device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    /// Constant buffer, shader resource and unordered access views.
    CbvSrvUav,
    /// Sampler states.
    Sampler,
    /// Render target views.
    RenderTarget,
    /// Depth/stencil views.
    DepthStencil,
}

impl DescriptorHeapKind {
    /// Whether heaps of this kind can be made visible to shaders.
    pub const fn can_be_shader_visible(&self) -> bool {
        matches!(self, DescriptorHeapKind::CbvSrvUav | DescriptorHeapKind::Sampler)
    }

    /// A short lowercase name used in logs and labels.
    pub const fn name(&self) -> &'static str {
        match self {
            DescriptorHeapKind::CbvSrvUav => "cbv_srv_uav",
            DescriptorHeapKind::Sampler => "sampler",
            DescriptorHeapKind::RenderTarget => "rtv",
            DescriptorHeapKind::DepthStencil => "dsv",
        }
    }
}

/// A descriptor used to create a [`DescriptorHeapId`].
#[derive(Debug, Clone)]
pub struct DescriptorHeapDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The kind of views stored in the heap.
    pub kind: DescriptorHeapKind,
    /// The fixed number of slots.
    pub capacity: u32,
    /// Whether shaders can index the heap directly.
    pub shader_visible: bool,
}

/// An opaque handle to a descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHeapId(pub usize);

/// The CPU address of a descriptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuDescriptorHandle(pub u64);

/// The GPU address of a descriptor slot in a shader-visible heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuDescriptorHandle(pub u64);

impl CpuDescriptorHandle {
    /// Offsets the handle by `count` slots of `increment` bytes each.
    pub const fn offset(self, count: u32, increment: u32) -> Self {
        Self(self.0 + count as u64 * increment as u64)
    }
}

impl GpuDescriptorHandle {
    /// Offsets the handle by `count` slots of `increment` bytes each.
    pub const fn offset(self, count: u32, increment: u32) -> Self {
        Self(self.0 + count as u64 * increment as u64)
    }
}

/// The base addresses of a descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapBases {
    /// Address of slot 0 on the CPU timeline.
    pub cpu: CpuDescriptorHandle,
    /// Address of slot 0 on the GPU timeline, for shader-visible heaps.
    pub gpu: Option<GpuDescriptorHandle>,
}

/// Describes the view written into one descriptor slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewDescriptor {
    /// A constant buffer view over `size` bytes at `offset` of `buffer`.
    ConstantBuffer {
        /// The backing buffer.
        buffer: BufferId,
        /// Byte offset; must be a multiple of the constant buffer alignment.
        offset: u64,
        /// Size in bytes; must be a multiple of the constant buffer alignment.
        size: u64,
    },
    /// A read-only view of a texture.
    ShaderResource {
        /// The viewed texture.
        texture: TextureId,
        /// First mip visible through the view.
        most_detailed_mip: u32,
        /// Number of visible mips.
        mip_levels: u32,
    },
    /// A read/write view of a texture.
    UnorderedAccess {
        /// The viewed texture.
        texture: TextureId,
        /// The mip written through the view.
        mip_level: u32,
    },
    /// A render target view.
    RenderTarget {
        /// The target texture.
        texture: TextureId,
    },
    /// A depth/stencil view.
    DepthStencil {
        /// The depth texture.
        texture: TextureId,
    },
    /// A sampler state.
    Sampler {
        /// Linear filtering when `true`, point filtering otherwise.
        linear: bool,
        /// Address mode wraps when `true`, clamps otherwise.
        wrap: bool,
    },
}

impl ViewDescriptor {
    /// Returns the heap kind this view must be written into.
    pub fn heap_kind(&self) -> DescriptorHeapKind {
        match self {
            ViewDescriptor::ConstantBuffer { .. }
            | ViewDescriptor::ShaderResource { .. }
            | ViewDescriptor::UnorderedAccess { .. } => DescriptorHeapKind::CbvSrvUav,
            ViewDescriptor::RenderTarget { .. } => DescriptorHeapKind::RenderTarget,
            ViewDescriptor::DepthStencil { .. } => DescriptorHeapKind::DepthStencil,
            ViewDescriptor::Sampler { .. } => DescriptorHeapKind::Sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_offset_uses_increment() {
        let base = CpuDescriptorHandle(0x1000);
        assert_eq!(base.offset(3, 32), CpuDescriptorHandle(0x1000 + 96));
        let gpu = GpuDescriptorHandle(0x8000);
        assert_eq!(gpu.offset(0, 32), gpu);
    }

    #[test]
    fn views_map_to_their_heap_kind() {
        let cbv = ViewDescriptor::ConstantBuffer {
            buffer: BufferId(1),
            offset: 0,
            size: 256,
        };
        assert_eq!(cbv.heap_kind(), DescriptorHeapKind::CbvSrvUav);
        let rtv = ViewDescriptor::RenderTarget {
            texture: TextureId(2),
        };
        assert_eq!(rtv.heap_kind(), DescriptorHeapKind::RenderTarget);
        assert!(!DescriptorHeapKind::RenderTarget.can_be_shader_visible());
    }
}
