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

//! The immutable capability object read from a device at startup.
//!
//! Everything that depends on hardware constants (descriptor increment sizes,
//! copy alignments, the video memory budget) receives a
//! `&DeviceCapabilities` when it is constructed. The object is created once
//! during device initialization and never mutated afterwards.

use crate::renderer::api::DescriptorHeapKind;

/// Hardware constant-buffer alignment. Every constant buffer view offset and
/// size, and therefore every constant-buffer element type, is a multiple of it.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Byte stride between consecutive descriptors, per heap kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorIncrements {
    /// Stride of constant buffer / shader resource / unordered access views.
    pub cbv_srv_uav: u32,
    /// Stride of samplers.
    pub sampler: u32,
    /// Stride of render target views.
    pub render_target: u32,
    /// Stride of depth/stencil views.
    pub depth_stencil: u32,
}

impl DescriptorIncrements {
    /// Returns the stride for the given heap kind.
    pub const fn for_kind(&self, kind: DescriptorHeapKind) -> u32 {
        match kind {
            DescriptorHeapKind::CbvSrvUav => self.cbv_srv_uav,
            DescriptorHeapKind::Sampler => self.sampler,
            DescriptorHeapKind::RenderTarget => self.render_target,
            DescriptorHeapKind::DepthStencil => self.depth_stencil,
        }
    }
}

/// Device constants, queried once and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Human readable adapter name.
    pub adapter_name: String,
    /// Descriptor strides per heap kind.
    pub descriptor_increments: DescriptorIncrements,
    /// Required alignment of constant buffer views, in bytes.
    pub constant_buffer_alignment: u64,
    /// Required alignment of texture row pitches in staging memory, in bytes.
    pub texture_row_pitch_alignment: u64,
    /// Required alignment of texture placements in staging memory, in bytes.
    pub texture_placement_alignment: u64,
    /// Video memory available to the application, in bytes.
    pub dedicated_video_memory: u64,
}

impl DeviceCapabilities {
    /// Returns the descriptor stride for the given heap kind.
    pub fn increment(&self, kind: DescriptorHeapKind) -> u32 {
        self.descriptor_increments.for_kind(kind)
    }

    /// Rounds a tightly packed row size up to the staging row pitch alignment.
    pub fn aligned_row_pitch(&self, row_bytes: u64) -> u64 {
        align_up(row_bytes, self.texture_row_pitch_alignment)
    }
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two, or 0/1 for none).
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> DeviceCapabilities {
        DeviceCapabilities {
            adapter_name: "test".into(),
            descriptor_increments: DescriptorIncrements {
                cbv_srv_uav: 32,
                sampler: 16,
                render_target: 32,
                depth_stencil: 8,
            },
            constant_buffer_alignment: CONSTANT_BUFFER_ALIGNMENT,
            texture_row_pitch_alignment: 256,
            texture_placement_alignment: 512,
            dedicated_video_memory: 1 << 30,
        }
    }

    #[test]
    fn increments_are_per_kind() {
        let caps = caps();
        assert_eq!(caps.increment(DescriptorHeapKind::CbvSrvUav), 32);
        assert_eq!(caps.increment(DescriptorHeapKind::Sampler), 16);
        assert_eq!(caps.increment(DescriptorHeapKind::DepthStencil), 8);
    }

    #[test]
    fn row_pitch_rounds_up() {
        let caps = caps();
        assert_eq!(caps.aligned_row_pitch(4), 256);
        assert_eq!(caps.aligned_row_pitch(256), 256);
        assert_eq!(caps.aligned_row_pitch(257), 512);
    }

    #[test]
    fn align_up_handles_trivial_alignment() {
        assert_eq!(align_up(13, 0), 13);
        assert_eq!(align_up(13, 1), 13);
        assert_eq!(align_up(13, 4), 16);
    }
}
