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

//! The scene as frame extraction sees it.
//!
//! Transform traversal happens upstream; a [`SceneNode`] already carries its
//! world matrix. A node is either a mesh instance or a light, expressed as a
//! closed sum type.

use crate::assets::{GpuMesh, LightConstants, Mat4, ObjectConstants, IDENTITY};
use crate::memory::SharedPoolHandle;
use crate::resource::ConstantSlice;

/// A placed mesh.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    /// The mesh drawn.
    pub mesh: SharedPoolHandle<GpuMesh>,
    /// This instance's element in the object constant arena.
    pub constants: ConstantSlice<ObjectConstants>,
    /// Rendered into the shadow map.
    pub casts_shadow: bool,
}

/// The kinds of light the lighting pass understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely far away, lighting along `direction`.
    Directional {
        /// Direction the light travels.
        direction: [f32; 3],
    },
    /// Radiating from the node position.
    Point {
        /// Distance at which the light fades out.
        range: f32,
    },
}

/// A light source.
#[derive(Debug, Clone)]
pub struct LightNode {
    /// Shape of the light.
    pub kind: LightKind,
    /// Linear color.
    pub color: [f32; 3],
    /// Scalar intensity.
    pub intensity: f32,
    /// Whether it samples the shadow map.
    pub shadowed: bool,
    /// This light's element in the light constant arena.
    pub constants: ConstantSlice<LightConstants>,
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A mesh instance.
    Mesh(MeshInstance),
    /// A light.
    Light(LightNode),
}

/// One node of the flattened scene.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name.
    pub name: String,
    /// Object to world.
    pub world: Mat4,
    /// What the node is.
    pub kind: NodeKind,
}

impl SceneNode {
    /// A mesh node at the origin.
    pub fn mesh(name: impl Into<String>, instance: MeshInstance) -> Self {
        Self {
            name: name.into(),
            world: IDENTITY,
            kind: NodeKind::Mesh(instance),
        }
    }

    /// A light node at the origin.
    pub fn light(name: impl Into<String>, light: LightNode) -> Self {
        Self {
            name: name.into(),
            world: IDENTITY,
            kind: NodeKind::Light(light),
        }
    }

    /// Places the node.
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// World-space position (translation column).
    pub fn position(&self) -> [f32; 3] {
        [self.world[3][0], self.world[3][1], self.world[3][2]]
    }
}

/// A flat list of nodes in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node.
    pub fn add(&mut self, node: SceneNode) {
        self.nodes.push(node);
    }

    /// All nodes.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Mutable access, for moving nodes between frames.
    pub fn nodes_mut(&mut self) -> &mut [SceneNode] {
        &mut self.nodes
    }

    /// Mesh nodes with their instance data.
    pub fn meshes(&self) -> impl Iterator<Item = (&SceneNode, &MeshInstance)> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Mesh(instance) => Some((node, instance)),
            NodeKind::Light(_) => None,
        })
    }

    /// Light nodes with their light data.
    pub fn lights(&self) -> impl Iterator<Item = (&SceneNode, &LightNode)> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Light(light) => Some((node, light)),
            NodeKind::Mesh(_) => None,
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the scene has no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
