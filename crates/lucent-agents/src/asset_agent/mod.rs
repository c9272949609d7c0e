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

//! The asset agent: turns CPU-side mesh data into pooled GPU assets.
//!
//! A dispatcher thread receives [`LoadRequest`]s and runs each one on a
//! short-lived worker thread. At most `max_concurrent_loads` workers exist at
//! any time; a worker holds one of the reusable load slots for its whole
//! life. Workers decode images on their own threads, upload through an
//! [`UploadBatch`](lucent_data::resource::UploadBatch) on the copy queue,
//! wait for the copies, then publish the mesh into the
//! [`ResourcePools`](lucent_data::assets::ResourcePools).

mod import;
mod loader;

pub use self::import::{import_mesh, AssetContext};
pub use self::loader::{AssetLoader, LoadOutcome, LoadRequest};
