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

//! Backend-agnostic handles and descriptors.
//!
//! - **[`buffer`]**: buffers, heap placement and usage flags.
//! - **[`texture`]**: textures, formats and copy regions.
//! - **[`descriptor`]**: descriptor heaps, handles and view descriptions.
//! - **[`queue`]**: hardware queue kinds, queue and fence handles.
//! - **[`command`]**: command buffer handles, resource states and barriers.

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod queue;
pub mod texture;

pub use self::buffer::*;
pub use self::command::*;
pub use self::descriptor::*;
pub use self::queue::*;
pub use self::texture::*;
