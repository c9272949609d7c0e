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

//! Renderer configuration, loaded from JSON.

use anyhow::{ensure, Context, Result};
use lucent_agents::render_agent::{
    ArenaCapacities, DescriptorCapacities, SubmissionMode, MAX_BACK_BUFFERS,
};
use lucent_data::resource::UploadConfig;
use lucent_infra::SoftwareDeviceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Staging buffer policy of asset uploads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Fraction of video memory the staging buffer may take.
    pub memory_fraction: f64,
    /// Upper bound of the staging buffer, in bytes.
    pub max_staging_bytes: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        let defaults = UploadConfig::default();
        Self {
            memory_fraction: defaults.memory_fraction,
            max_staging_bytes: defaults.max_staging_bytes,
        }
    }
}

impl From<UploadSettings> for UploadConfig {
    fn from(settings: UploadSettings) -> Self {
        UploadConfig {
            memory_fraction: settings.memory_fraction,
            max_staging_bytes: settings.max_staging_bytes,
        }
    }
}

/// Knobs of the software device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Reported adapter name.
    pub adapter_name: String,
    /// Simulated GPU time of every command list, in milliseconds.
    pub list_latency_ms: u64,
    /// Simulated video memory in MiB. Unset reports a share of host memory.
    pub video_memory_mb: Option<u64>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            adapter_name: SoftwareDeviceConfig::default().adapter_name,
            list_latency_ms: 0,
            video_memory_mb: None,
        }
    }
}

impl From<&DeviceSettings> for SoftwareDeviceConfig {
    fn from(settings: &DeviceSettings) -> Self {
        SoftwareDeviceConfig {
            adapter_name: settings.adapter_name.clone(),
            list_latency: Duration::from_millis(settings.list_latency_ms),
            video_memory: settings.video_memory_mb.map(|mb| mb * 1024 * 1024),
        }
    }
}

/// Everything needed to build a [`Renderer`](crate::Renderer).
///
/// Every field has a default, so a JSON file only lists what it changes:
///
/// ```json
/// { "width": 1920, "height": 1080, "submission_mode": "pipelined" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Swap chain buffers, between 2 and [`MAX_BACK_BUFFERS`].
    pub back_buffer_count: u32,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Edge of the square shadow map, in texels.
    pub shadow_map_size: u32,
    /// Vertical blanks to wait for on present. 0 presents immediately.
    pub sync_interval: u32,
    /// How pass submissions are chained.
    pub submission_mode: SubmissionMode,
    /// Descriptor heap sizes.
    pub descriptors: DescriptorCapacities,
    /// Constant arena sizes.
    pub arenas: ArenaCapacities,
    /// Staging policy of asset uploads.
    pub upload: UploadSettings,
    /// Loads that may run at the same time.
    pub max_concurrent_loads: usize,
    /// The device.
    pub device: DeviceSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            back_buffer_count: 3,
            width: 1280,
            height: 720,
            shadow_map_size: 2048,
            sync_interval: 1,
            submission_mode: SubmissionMode::default(),
            descriptors: DescriptorCapacities::default(),
            arenas: ArenaCapacities::default(),
            upload: UploadSettings::default(),
            max_concurrent_loads: 4,
            device: DeviceSettings::default(),
        }
    }
}

impl RendererConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse the renderer configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid configuration {}", path.display()))
    }

    /// The configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize the renderer configuration")
    }

    /// Rejects values the renderer cannot be built with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (2..=MAX_BACK_BUFFERS).contains(&self.back_buffer_count),
            "back_buffer_count must be between 2 and {MAX_BACK_BUFFERS}, got {}",
            self.back_buffer_count
        );
        ensure!(
            self.width > 0 && self.height > 0,
            "the output must not be empty, got {}x{}",
            self.width,
            self.height
        );
        ensure!(self.shadow_map_size > 0, "shadow_map_size must not be 0");
        ensure!(
            self.max_concurrent_loads > 0,
            "max_concurrent_loads must not be 0"
        );
        ensure!(
            self.upload.memory_fraction > 0.0 && self.upload.memory_fraction <= 1.0,
            "upload.memory_fraction must be in (0, 1], got {}",
            self.upload.memory_fraction
        );
        let descriptors = &self.descriptors;
        ensure!(
            descriptors.resources > 0
                && descriptors.samplers > 0
                && descriptors.render_targets > 0
                && descriptors.depth_stencils > 0,
            "every descriptor heap needs at least one slot: {descriptors:?}"
        );
        let arenas = &self.arenas;
        ensure!(
            arenas.objects > 0 && arenas.materials > 0 && arenas.lights > 0,
            "every constant arena needs at least one element: {arenas:?}"
        );
        Ok(())
    }
}
