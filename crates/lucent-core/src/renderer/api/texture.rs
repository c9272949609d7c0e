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

//! Defines data structures related to GPU texture resources.

use crate::lucent_bitflags;
use std::borrow::Cow;

/// The pixel formats understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 16-bit float RGBA, used for HDR targets and environment maps.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// Single-channel 32-bit float.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns the size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::R32Float | TextureFormat::Depth32Float => 4,
        }
    }

    /// Returns `true` for depth formats.
    pub const fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

lucent_bitflags! {
    /// How a texture may be used.
    pub struct TextureUsage: u32 {
        /// The texture can be the destination of a copy.
        const COPY_DST = 1 << 0;
        /// The texture can be sampled from shaders.
        const SAMPLED = 1 << 1;
        /// The texture can be bound as a render target.
        const RENDER_TARGET = 1 << 2;
        /// The texture can be bound as a depth/stencil target.
        const DEPTH_STENCIL = 1 << 3;
        /// The texture can be written from compute shaders.
        const STORAGE = 1 << 4;
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label for the texture.
    pub label: Option<Cow<'a, str>>,
    /// Width of mip 0 in texels.
    pub width: u32,
    /// Height of mip 0 in texels.
    pub height: u32,
    /// Number of array layers (6 for cube maps).
    pub array_layers: u32,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
}

impl<'a> TextureDescriptor<'a> {
    /// Describes a single-layer, single-mip 2D texture.
    pub fn new_2d(
        label: &'a str,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            width,
            height,
            array_layers: 1,
            mip_levels: 1,
            format,
            usage,
        }
    }

    /// Returns the number of subresources (`mip_levels * array_layers`).
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_layers
    }

    /// Returns the `(width, height)` of the given mip level.
    pub fn mip_extent(&self, mip: u32) -> (u32, u32) {
        ((self.width >> mip).max(1), (self.height >> mip).max(1))
    }
}

/// An opaque handle to a GPU texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// A rectangular region of one texture subresource, used as a copy destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    /// Mip level of the destination subresource.
    pub mip_level: u32,
    /// Array layer of the destination subresource.
    pub array_layer: u32,
    /// Left edge in texels.
    pub x: u32,
    /// Top edge in texels.
    pub y: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl TextureRegion {
    /// A region covering an entire `width` x `height` mip 0 of layer 0.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            mip_level: 0,
            array_layer: 0,
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Returns the sub-region made of `row_count` rows starting at `first_row`.
    pub fn rows(&self, first_row: u32, row_count: u32) -> Self {
        Self {
            y: self.y + first_row,
            height: row_count,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_extent_never_reaches_zero() {
        let desc = TextureDescriptor {
            mip_levels: 4,
            ..TextureDescriptor::new_2d(
                "albedo",
                8,
                2,
                TextureFormat::Rgba8Unorm,
                TextureUsage::SAMPLED,
            )
        };
        assert_eq!(desc.mip_extent(0), (8, 2));
        assert_eq!(desc.mip_extent(2), (2, 1));
        assert_eq!(desc.mip_extent(3), (1, 1));
    }

    #[test]
    fn row_subregion_offsets_y() {
        let region = TextureRegion::full(16, 16).rows(4, 8);
        assert_eq!(region.y, 4);
        assert_eq!(region.height, 8);
        assert_eq!(region.width, 16);
    }
}
