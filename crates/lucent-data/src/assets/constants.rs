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

//! Constant buffer layouts shared with the (opaque) shader programs.
//!
//! Every layout is padded to exactly 256 bytes so it can live in a
//! [`ConstantBufferArena`](crate::resource::ConstantBufferArena).

/// A 4x4 column-major matrix.
pub type Mat4 = [[f32; 4]; 4];

/// The identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Per-object transforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectConstants {
    /// Object to world.
    pub world: Mat4,
    /// Inverse transpose of `world`, for normals.
    pub normal_matrix: Mat4,
    _pad: [[f32; 4]; 8],
}

impl ObjectConstants {
    /// Constants for an object placed by `world`.
    pub fn new(world: Mat4, normal_matrix: Mat4) -> Self {
        Self {
            world,
            normal_matrix,
            _pad: [[0.0; 4]; 8],
        }
    }
}

/// Per-material factors.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialConstants {
    /// Base color (rgba).
    pub base_color: [f32; 4],
    /// x = metallic, y = roughness, z = alpha cutoff, w = number of bound textures.
    pub params: [f32; 4],
    _pad: [[f32; 4]; 14],
}

impl MaterialConstants {
    /// Constants for a material.
    pub fn new(base_color: [f32; 4], metallic: f32, roughness: f32, texture_count: u32) -> Self {
        Self {
            base_color,
            params: [metallic, roughness, 0.5, texture_count as f32],
            _pad: [[0.0; 4]; 14],
        }
    }
}

/// Per-light data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightConstants {
    /// Position (xyz) and range (w). Unused for directional lights.
    pub position: [f32; 4],
    /// Direction (xyz), w = 1 for directional lights.
    pub direction: [f32; 4],
    /// Color (rgb) and intensity (a).
    pub color: [f32; 4],
    /// View-projection matrix of the shadow map.
    pub shadow_view_proj: Mat4,
    /// x = shadowed flag, y = depth bias, zw = padding.
    pub shadow_params: [f32; 4],
    _pad: [[f32; 4]; 8],
}

impl LightConstants {
    /// Constants for a light.
    pub fn new(
        position: [f32; 4],
        direction: [f32; 4],
        color: [f32; 4],
        shadow_view_proj: Mat4,
        shadowed: bool,
    ) -> Self {
        Self {
            position,
            direction,
            color,
            shadow_view_proj,
            shadow_params: [if shadowed { 1.0 } else { 0.0 }, 0.005, 0.0, 0.0],
            _pad: [[0.0; 4]; 8],
        }
    }
}

/// Per-frame camera and timing data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameConstants {
    /// World to clip.
    pub view_proj: Mat4,
    /// Clip to world.
    pub inverse_view_proj: Mat4,
    /// Camera position (xyz), w unused.
    pub camera_position: [f32; 4],
    /// x = width, y = height, z = time in seconds, w = frame index.
    pub viewport: [f32; 4],
    _pad: [[f32; 4]; 6],
}

impl FrameConstants {
    /// Constants for one frame.
    pub fn new(
        view_proj: Mat4,
        inverse_view_proj: Mat4,
        camera_position: [f32; 4],
        viewport: [f32; 4],
    ) -> Self {
        Self {
            view_proj,
            inverse_view_proj,
            camera_position,
            viewport,
            _pad: [[0.0; 4]; 6],
        }
    }
}
