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

//! The render agent: recording workers, frame extraction and the frame
//! orchestrator that submits in pass order and guards resource reuse.

mod dispatcher;
mod extract;
mod frame_targets;
mod orchestrator;

pub use self::dispatcher::{PassDispatcher, RecordedPass};
pub use self::extract::{
    extract_frame, normal_matrix, ArenaCapacities, Camera, ConstantArenas, FrameBegin,
    MAX_BACK_BUFFERS,
};
pub use self::frame_targets::{DescriptorCapacities, DescriptorPools, FrameTargetSet};
pub use self::orchestrator::{
    FrameOrchestrator, FrameOrchestratorConfig, FrameQueues, FrameStats, SubmissionMode,
};
