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

//! sysinfo-based host memory queries.

use sysinfo::System;

/// Reads host memory figures through the `sysinfo` crate.
///
/// The software device has no video memory of its own; it budgets a share of
/// host memory instead.
pub struct HostMemoryProbe {
    system: System,
}

impl HostMemoryProbe {
    /// Creates a probe with freshly refreshed memory figures.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system }
    }

    /// Refreshes the memory figures.
    pub fn refresh(&mut self) {
        self.system.refresh_memory();
    }

    /// Total host memory in bytes.
    pub fn total_memory(&self) -> u64 {
        self.system.total_memory()
    }

    /// Memory currently available to new allocations, in bytes.
    pub fn available_memory(&self) -> u64 {
        self.system.available_memory()
    }
}

impl Default for HostMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_never_exceeds_total() {
        let probe = HostMemoryProbe::new();
        assert!(probe.available_memory() <= probe.total_memory());
    }
}
