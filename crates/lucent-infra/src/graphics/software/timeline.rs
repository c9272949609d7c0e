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

//! Ordered log of everything the queue executors did.

use lucent_core::renderer::{CommandBufferId, FenceId, QueueId, QueueKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// What an executor processed.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// A command list ran to completion.
    CommandList {
        /// Id of the list.
        id: CommandBufferId,
        /// Debug label of the list.
        label: String,
        /// Markers recorded into the list, in order.
        markers: Vec<String>,
    },
    /// A fence was signaled.
    Signal {
        /// The fence.
        fence: FenceId,
        /// The new completed value.
        value: u64,
    },
    /// The queue waited for a fence.
    Wait {
        /// The fence.
        fence: FenceId,
        /// The awaited value.
        value: u64,
    },
    /// A back buffer was flipped.
    Present {
        /// Index of the presented back buffer.
        back_buffer_index: u32,
    },
}

/// One timeline entry. `started` and `finished` come from a device-wide
/// sequence counter, so entries from different queues can be compared.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// The queue that did the work.
    pub queue: QueueId,
    /// Its family.
    pub queue_kind: QueueKind,
    /// What happened.
    pub event: TimelineEvent,
    /// Sequence number taken before the work began.
    pub started: u64,
    /// Sequence number taken after the work ended.
    pub finished: u64,
}

impl ExecutionRecord {
    /// Label of a command list entry.
    pub fn list_label(&self) -> Option<&str> {
        match &self.event {
            TimelineEvent::CommandList { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Returns `true` when this entry ended before `other` started.
    pub fn happened_before(&self, other: &ExecutionRecord) -> bool {
        self.finished < other.started
    }
}

#[derive(Debug, Default)]
pub(crate) struct Timeline {
    sequence: AtomicU64,
    records: Mutex<Vec<ExecutionRecord>>,
}

impl Timeline {
    pub(crate) fn tick(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn push(&self, record: ExecutionRecord) {
        self.records.lock().push(record);
    }

    pub(crate) fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.records.lock().clear();
    }
}
