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

//! Scene extraction: turns the flattened scene into the read-only
//! [`FrameState`] shared with the recording threads.
//!
//! Extraction is the only step of a frame that writes constant buffers. It
//! runs on the main thread after the frame's reuse guard, so the GPU is no
//! longer reading the elements it overwrites.

use super::FrameTargetSet;
use lucent_core::renderer::{
    DeviceCapabilities, DrawItem, FrameState, LightItem, RenderDevice, RenderError, ResourceError,
};
use lucent_data::assets::{
    FrameConstants, LightConstants, Mat4, MaterialConstants, ObjectConstants, IDENTITY,
};
use lucent_data::resource::{ConstantBufferArena, ConstantSlice};
use lucent_data::scene::{LightKind, Scene};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound of swap chain buffers, and therefore of frame constant slots.
pub const MAX_BACK_BUFFERS: u32 = 8;

/// Element counts of the constant buffer arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaCapacities {
    /// Per-object elements, one per mesh instance.
    pub objects: u32,
    /// Per-material elements.
    pub materials: u32,
    /// Per-light elements.
    pub lights: u32,
}

impl Default for ArenaCapacities {
    fn default() -> Self {
        Self {
            objects: 1024,
            materials: 256,
            lights: 64,
        }
    }
}

/// The persistently mapped constant arenas of the renderer.
#[derive(Debug)]
pub struct ConstantArenas {
    /// Object transforms.
    pub objects: ConstantBufferArena<ObjectConstants>,
    /// Material factors.
    pub materials: ConstantBufferArena<MaterialConstants>,
    /// Light parameters.
    pub lights: ConstantBufferArena<LightConstants>,
    frames: ConstantBufferArena<FrameConstants>,
    frame_slots: ConstantSlice<FrameConstants>,
}

impl ConstantArenas {
    /// Creates the arenas. Frame constants get one element per possible back
    /// buffer.
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        capabilities: &DeviceCapabilities,
        capacities: &ArenaCapacities,
    ) -> Result<Self, ResourceError> {
        let frames = ConstantBufferArena::initialize_with_capacity(
            Arc::clone(device),
            capabilities,
            MAX_BACK_BUFFERS,
            "frame_constants",
        )?;
        let frame_slots = frames.try_allocate(MAX_BACK_BUFFERS)?;
        Ok(Self {
            objects: ConstantBufferArena::initialize_with_capacity(
                Arc::clone(device),
                capabilities,
                capacities.objects,
                "object_constants",
            )?,
            materials: ConstantBufferArena::initialize_with_capacity(
                Arc::clone(device),
                capabilities,
                capacities.materials,
                "material_constants",
            )?,
            lights: ConstantBufferArena::initialize_with_capacity(
                Arc::clone(device),
                capabilities,
                capacities.lights,
                "light_constants",
            )?,
            frames,
            frame_slots,
        })
    }

    /// Writes the frame constants of `back_buffer_index` and returns their
    /// GPU address.
    pub fn write_frame(
        &self,
        back_buffer_index: u32,
        constants: &FrameConstants,
    ) -> Result<u64, ResourceError> {
        self.frames
            .write(&self.frame_slots, back_buffer_index, constants)?;
        self.frames.gpu_address(&self.frame_slots, back_buffer_index)
    }

    /// Reads back the frame constants of `back_buffer_index`.
    pub fn read_frame(&self, back_buffer_index: u32) -> Result<FrameConstants, ResourceError> {
        let offset = (self.frame_slots.base_index() + back_buffer_index) as u64
            * ConstantBufferArena::<FrameConstants>::ELEMENT_SIZE;
        let bytes = self.frames.buffer().read(
            offset,
            ConstantBufferArena::<FrameConstants>::ELEMENT_SIZE,
        )?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }
}

/// The viewpoint of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World to clip.
    pub view_proj: Mat4,
    /// Clip to world.
    pub inverse_view_proj: Mat4,
    /// World-space eye position.
    pub position: [f32; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view_proj: IDENTITY,
            inverse_view_proj: IDENTITY,
            position: [0.0; 3],
        }
    }
}

/// Where a frame renders, as decided by the orchestrator's `begin_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBegin {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Back buffer the frame renders into.
    pub back_buffer_index: u32,
}

/// Inverse transpose of the upper 3x3 of `world`, embedded in a 4x4.
/// Singular transforms fall back to the cofactor matrix.
pub fn normal_matrix(world: &Mat4) -> Mat4 {
    let a = |row: usize, col: usize| world[col][row];
    let others = |i: usize| match i {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let cofactor = |row: usize, col: usize| {
        let (r0, r1) = others(row);
        let (c0, c1) = others(col);
        let minor = a(r0, c0) * a(r1, c1) - a(r0, c1) * a(r1, c0);
        if (row + col) % 2 == 0 {
            minor
        } else {
            -minor
        }
    };
    let det = a(0, 0) * cofactor(0, 0) + a(0, 1) * cofactor(0, 1) + a(0, 2) * cofactor(0, 2);
    let scale = if det.abs() > f32::EPSILON { 1.0 / det } else { 1.0 };

    let mut out = IDENTITY;
    for (col, column) in out.iter_mut().enumerate().take(3) {
        for (row, value) in column.iter_mut().enumerate().take(3) {
            *value = cofactor(row, col) * scale;
        }
    }
    out
}

fn light_constants(
    position: [f32; 3],
    kind: LightKind,
    color: [f32; 3],
    intensity: f32,
    shadowed: bool,
) -> LightConstants {
    let (position, direction) = match kind {
        LightKind::Directional { direction } => (
            [position[0], position[1], position[2], 0.0],
            [direction[0], direction[1], direction[2], 1.0],
        ),
        LightKind::Point { range } => (
            [position[0], position[1], position[2], range],
            [0.0, 0.0, 0.0, 0.0],
        ),
    };
    LightConstants::new(
        position,
        direction,
        [color[0], color[1], color[2], intensity],
        IDENTITY,
        shadowed,
    )
}

/// Writes every constant the frame reads and gathers its draws and lights.
///
/// Mesh instances whose mesh was released are skipped with a warning.
pub fn extract_frame(
    scene: &Scene,
    arenas: &ConstantArenas,
    targets: &FrameTargetSet,
    camera: &Camera,
    begin: FrameBegin,
    time_seconds: f32,
) -> Result<FrameState, RenderError> {
    let (width, height) = targets.extent();
    let frame_constants = arenas.write_frame(
        begin.back_buffer_index,
        &FrameConstants::new(
            camera.view_proj,
            camera.inverse_view_proj,
            [camera.position[0], camera.position[1], camera.position[2], 1.0],
            [width as f32, height as f32, time_seconds, begin.frame_index as f32],
        ),
    )?;

    let mut draws = Vec::new();
    for (node, instance) in scene.meshes() {
        arenas.objects.write(
            &instance.constants,
            0,
            &ObjectConstants::new(node.world, normal_matrix(&node.world)),
        )?;
        let object_constants = arenas.objects.gpu_address(&instance.constants, 0)?;

        let Some(mesh) = instance.mesh.get() else {
            log::warn!("extract_frame: node '{}' references a released mesh", node.name);
            continue;
        };
        for primitive in &mesh.primitives {
            let Some(primitive) = primitive.get() else {
                continue;
            };
            let Some(material) = primitive.material.get() else {
                log::warn!("extract_frame: '{}' has a primitive without material", mesh.name);
                continue;
            };
            draws.push(DrawItem {
                pipeline: material.pipeline,
                vertex_buffer: primitive.vertex_buffer.id(),
                vertex_stride: primitive.vertex_stride,
                index_buffer: primitive.index_buffer.id(),
                index_format: primitive.index_format,
                index_count: primitive.index_count,
                object_constants,
                material_constants: arenas.materials.gpu_address(&material.constants, 0)?,
                material_table: material
                    .descriptors
                    .as_ref()
                    .and_then(|lease| lease.view().try_gpu_handle()),
                alpha_blended: material.alpha_blended,
                casts_shadow: instance.casts_shadow,
            });
        }
    }

    let mut lights = Vec::new();
    for (node, light) in scene.lights() {
        let constants = light_constants(
            node.position(),
            light.kind,
            light.color,
            light.intensity,
            light.shadowed,
        );
        arenas.lights.write(&light.constants, 0, &constants)?;
        lights.push(LightItem {
            constants: arenas.lights.gpu_address(&light.constants, 0)?,
            shadowed: light.shadowed,
        });
    }

    log::trace!(
        "extract_frame: frame {} has {} draws and {} lights",
        begin.frame_index,
        draws.len(),
        lights.len()
    );
    Ok(FrameState {
        frame_index: begin.frame_index,
        back_buffer_index: begin.back_buffer_index,
        back_buffer: targets.back_buffer(begin.back_buffer_index)?,
        width,
        height,
        targets: targets.targets()?,
        resource_heap: targets.resource_heap(),
        sampler_heap: targets.sampler_heap(),
        sampler_table: targets.sampler_table()?,
        frame_constants,
        draws,
        lights,
    })
}
