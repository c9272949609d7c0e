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

//! Defines data structures used when recording GPU commands.

use crate::lucent_bitflags;
use crate::renderer::api::{BufferId, TextureId};

/// An opaque handle to a command list.
///
/// The id is stable for the lifetime of the list: a list that is reset and
/// re-recorded every frame keeps its id, and the id of a closed list is what
/// gets passed to [`RenderDevice::execute_command_lists`](crate::renderer::RenderDevice::execute_command_lists).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

lucent_bitflags! {
    /// The state a resource must be in for the GPU to use it a certain way.
    ///
    /// Passes own their resource transitions: each pass moves the resources
    /// it touches into the states it needs before recording work.
    pub struct ResourceState: u32 {
        /// The common state, usable for copies on any queue.
        const COMMON = 0;
        /// Readable as vertex or constant buffer.
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        /// Readable as index buffer.
        const INDEX_BUFFER = 1 << 1;
        /// Writable as render target.
        const RENDER_TARGET = 1 << 2;
        /// Writable from compute shaders.
        const UNORDERED_ACCESS = 1 << 3;
        /// Writable as depth buffer.
        const DEPTH_WRITE = 1 << 4;
        /// Readable as depth buffer.
        const DEPTH_READ = 1 << 5;
        /// Readable by non-pixel shader stages.
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        /// Readable by the pixel shader stage.
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        /// Destination of copies.
        const COPY_DEST = 1 << 8;
        /// Source of copies.
        const COPY_SOURCE = 1 << 9;
        /// Ready to be presented.
        const PRESENT = 1 << 10;
        /// Readable from every shader stage.
        const ALL_SHADER_RESOURCE = (1 << 6) | (1 << 7);
    }
}

/// A resource referenced by a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    /// A buffer.
    Buffer(BufferId),
    /// A texture (all subresources).
    Texture(TextureId),
}

/// A state transition for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBarrier {
    /// The resource being transitioned.
    pub resource: ResourceRef,
    /// The state the resource is currently in.
    pub before: ResourceState,
    /// The state the resource will be in afterwards.
    pub after: ResourceState,
}

impl ResourceBarrier {
    /// Builds a transition barrier for a texture.
    pub fn texture(texture: TextureId, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource: ResourceRef::Texture(texture),
            before,
            after,
        }
    }

    /// Builds a transition barrier for a buffer.
    pub fn buffer(buffer: BufferId, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource: ResourceRef::Buffer(buffer),
            before,
            after,
        }
    }
}

/// Identifies an opaque pipeline program (shaders plus fixed-function state).
///
/// Shading math is not part of the renderer core; passes select programs by key
/// and the backend resolves the key to whatever it compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey(pub &'static str);

/// The width of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_resource_combination() {
        assert!(ResourceState::ALL_SHADER_RESOURCE.contains(ResourceState::PIXEL_SHADER_RESOURCE));
        assert!(ResourceState::ALL_SHADER_RESOURCE
            .contains(ResourceState::NON_PIXEL_SHADER_RESOURCE));
        assert!(ResourceState::COMMON.is_empty());
    }

    #[test]
    fn barrier_constructors_tag_the_resource() {
        let barrier = ResourceBarrier::texture(
            TextureId(7),
            ResourceState::RENDER_TARGET,
            ResourceState::PRESENT,
        );
        assert_eq!(barrier.resource, ResourceRef::Texture(TextureId(7)));
        assert_eq!(barrier.after, ResourceState::PRESENT);
    }
}
