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

use super::AssetDecoder;
use anyhow::{ensure, Context, Result};
use lucent_core::renderer::{TextureDescriptor, TextureFormat, TextureRegion, TextureUsage};

/// Decoded texels ready for staging.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTexture {
    /// Tightly packed rows of `format` texels.
    pub pixels: Vec<u8>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
}

impl CpuTexture {
    /// Wraps raw texels, checking that their size matches the extent.
    pub fn from_raw(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        ensure!(
            pixels.len() == expected,
            "{width}x{height} {format:?} texture needs {expected} bytes, got {}",
            pixels.len()
        );
        Ok(Self {
            pixels,
            width,
            height,
            format,
        })
    }

    /// A single-color texture.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            pixels: rgba.repeat(count),
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
        }
    }

    /// The sampled texture this data is uploaded into.
    pub fn descriptor<'a>(&self, label: &'a str) -> TextureDescriptor<'a> {
        TextureDescriptor::new_2d(
            label,
            self.width,
            self.height,
            self.format,
            TextureUsage::COPY_DST | TextureUsage::SAMPLED,
        )
    }

    /// Mip 0 of the texture.
    pub fn region(&self) -> TextureRegion {
        TextureRegion::full(self.width, self.height)
    }
}

/// Decodes PNG and JPEG files into sRGB RGBA8 texels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureDecodeLane;

impl AssetDecoder<CpuTexture> for TextureDecodeLane {
    fn decode(&self, bytes: &[u8]) -> Result<CpuTexture> {
        let img = image::load_from_memory(bytes).context("Failed to decode image from memory")?;

        // Color textures stay in sRGB space.
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(CpuTexture {
            pixels: rgba.into_raw(),
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
        })
    }
}
