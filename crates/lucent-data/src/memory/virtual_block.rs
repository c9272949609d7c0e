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

//! A first-fit allocator over an abstract address range.
//!
//! A [`VirtualBlock`] hands out offsets, not memory: descriptor pools use it to
//! sub-allocate slots of a descriptor heap and upload batches use it to
//! sub-allocate a staging buffer. There is no compaction, so irregular
//! allocate/free churn can fragment the range.

use std::collections::BTreeMap;

/// A range reserved inside a [`VirtualBlock`].
///
/// Not `Clone`: freeing consumes it, so one range cannot be returned twice.
#[derive(Debug, PartialEq, Eq)]
pub struct VirtualAllocation {
    offset: u64,
    size: u64,
}

impl VirtualAllocation {
    /// First unit of the range.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of units in the range.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// One past the last unit of the range.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// First-fit allocator over `[0, size)` with coalescing of adjacent free ranges.
#[derive(Debug)]
pub struct VirtualBlock {
    size: u64,
    /// Free ranges keyed by offset. Never contains two adjacent ranges.
    free: BTreeMap<u64, u64>,
    /// Live allocations keyed by offset.
    allocated: BTreeMap<u64, u64>,
    used: u64,
}

impl VirtualBlock {
    /// Creates an empty block spanning `size` units.
    pub fn new(size: u64) -> Self {
        let mut free = BTreeMap::new();
        if size > 0 {
            free.insert(0, size);
        }
        Self {
            size,
            free,
            allocated: BTreeMap::new(),
            used: 0,
        }
    }

    /// Reserves `size` contiguous units whose offset is a multiple of `alignment`.
    ///
    /// Returns `None` when no free range fits, even if the total free space would.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Option<VirtualAllocation> {
        if size == 0 || size > self.available() {
            return None;
        }
        let alignment = alignment.max(1);

        let (range_offset, range_size, offset) = self.free.iter().find_map(|(&start, &len)| {
            let aligned = start.div_ceil(alignment) * alignment;
            let padding = aligned - start;
            (padding + size <= len).then_some((start, len, aligned))
        })?;

        self.free.remove(&range_offset);
        if offset > range_offset {
            self.free.insert(range_offset, offset - range_offset);
        }
        let tail_start = offset + size;
        let range_end = range_offset + range_size;
        if range_end > tail_start {
            self.free.insert(tail_start, range_end - tail_start);
        }

        self.allocated.insert(offset, size);
        self.used += size;
        Some(VirtualAllocation { offset, size })
    }

    /// Returns a range to the block, merging it with free neighbours.
    ///
    /// Returns `false` (and changes nothing) if the range is not a live
    /// allocation of this block.
    pub fn free(&mut self, allocation: VirtualAllocation) -> bool {
        match self.allocated.get(&allocation.offset) {
            Some(&size) if size == allocation.size => {}
            _ => {
                log::warn!(
                    "VirtualBlock: ignoring free of unknown range {}..{}",
                    allocation.offset,
                    allocation.end()
                );
                return false;
            }
        }
        self.allocated.remove(&allocation.offset);
        self.used -= allocation.size;

        let mut start = allocation.offset;
        let mut len = allocation.size;

        if let Some((&prev_start, &prev_len)) = self.free.range(..start).next_back() {
            if prev_start + prev_len == start {
                self.free.remove(&prev_start);
                start = prev_start;
                len += prev_len;
            }
        }
        if let Some(next_len) = self.free.remove(&allocation.end()) {
            len += next_len;
        }

        self.free.insert(start, len);
        true
    }

    /// Forgets every allocation at once.
    pub fn clear(&mut self) {
        self.free.clear();
        self.allocated.clear();
        if self.size > 0 {
            self.free.insert(0, self.size);
        }
        self.used = 0;
    }

    /// Total extent of the block.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Units currently reserved.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Units currently free, possibly fragmented.
    pub fn available(&self) -> u64 {
        self.size - self.used
    }

    /// Size of the largest contiguous free range.
    pub fn largest_free_range(&self) -> u64 {
        self.free.values().copied().max().unwrap_or(0)
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.allocated.len()
    }

    /// Returns `true` if nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }
}
