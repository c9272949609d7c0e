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

//! Defines data structures related to GPU buffer resources.

use crate::lucent_bitflags;
use std::borrow::Cow;

lucent_bitflags! {
    /// A set of flags describing the allowed usages of a [`BufferId`].
    pub struct BufferUsage: u32 {
        /// The buffer can be the source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// The buffer can be the destination of a copy operation.
        const COPY_DST = 1 << 1;
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 2;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 3;
        /// The buffer can back constant buffer views.
        const CONSTANT = 1 << 4;
        /// The buffer can be bound for unordered (read/write) shader access.
        const STORAGE = 1 << 5;
    }
}

/// The memory heap a buffer is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeapType {
    /// GPU-local memory. Not CPU-writable; filled through copy commands.
    #[default]
    Default,
    /// CPU-writable, GPU-readable memory that stays mapped for its whole lifetime.
    Upload,
    /// GPU-writable, CPU-readable memory used for readback.
    Readback,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be used.
    pub usage: BufferUsage,
    /// Which heap the buffer memory comes from.
    pub heap: HeapType,
}

impl<'a> BufferDescriptor<'a> {
    /// Describes a persistently mapped upload-heap buffer of `size` bytes.
    pub fn upload(label: &'a str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage,
            heap: HeapType::Upload,
        }
    }

    /// Describes a GPU-local buffer of `size` bytes that is filled by copies.
    pub fn gpu_local(label: &'a str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: usage | BufferUsage::COPY_DST,
            heap: HeapType::Default,
        }
    }
}

/// An opaque handle to a GPU buffer resource.
///
/// Returned by [`RenderDevice::create_buffer`](crate::renderer::RenderDevice::create_buffer)
/// and used to reference the buffer in every subsequent operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_local_buffers_are_copy_destinations() {
        let desc = BufferDescriptor::gpu_local("vertices", 128, BufferUsage::VERTEX);
        assert_eq!(desc.heap, HeapType::Default);
        assert!(desc.usage.contains(BufferUsage::VERTEX | BufferUsage::COPY_DST));
    }

    #[test]
    fn upload_buffers_live_in_the_upload_heap() {
        let desc = BufferDescriptor::upload("staging", 4096, BufferUsage::COPY_SRC);
        assert_eq!(desc.heap, HeapType::Upload);
        assert_eq!(desc.label.as_deref(), Some("staging"));
    }
}
