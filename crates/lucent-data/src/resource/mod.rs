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

//! GPU resource lifetimes and sub-allocators.
//!
//! - [`DescriptorPool`]: contiguous descriptor ranges inside one descriptor heap,
//!   handed out as raw allocations or scoped [`DescriptorLease`]s.
//! - [`ConstantBufferArena`]: a bump allocator of 256-byte aligned constant
//!   elements inside a persistently mapped upload buffer.
//! - [`UploadBatch`]: staging of buffer and texture data through an upload heap.
//! - [`OwnedBuffer`] / [`OwnedTexture`]: device objects destroyed on drop.

mod constant_arena;
mod descriptor_pool;
mod owned;
mod upload_batch;

pub use self::constant_arena::{ConstantBufferArena, ConstantSlice};
pub use self::descriptor_pool::{
    DescriptorAllocation, DescriptorLease, DescriptorPool, DescriptorView,
};
pub use self::owned::{OwnedBuffer, OwnedTexture};
pub use self::upload_batch::{UploadBatch, UploadConfig, UploadReceipt, UploadStats};
