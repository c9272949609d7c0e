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

//! Renders a generated scene for a number of frames and logs what each frame
//! cost.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lucent_sdk::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Blocking,
    Pipelined,
}

impl From<Mode> for SubmissionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Blocking => SubmissionMode::Blocking,
            Mode::Pipelined => SubmissionMode::Pipelined,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON renderer configuration. Flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to render.
    #[arg(short, long, default_value_t = 120)]
    frames: u64,

    /// Output width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height.
    #[arg(long)]
    height: Option<u32>,

    /// How pass submissions are chained.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Simulated GPU time per command list, in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Quads in the generated grid, per side.
    #[arg(long, default_value_t = 4)]
    grid: u32,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn renderer_config(&self) -> Result<RendererConfig> {
        let mut config = match &self.config {
            Some(path) => RendererConfig::from_json_file(path)?,
            None => RendererConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(mode) = self.mode {
            config.submission_mode = mode.into();
        }
        if let Some(latency) = self.latency_ms {
            config.device.list_latency_ms = latency;
        }
        config.validate()?;
        Ok(config)
    }
}

fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    let mut world = IDENTITY;
    world[3] = [x, y, z, 1.0];
    world
}

fn grid_mesh(index: u32) -> MeshData {
    let shade = 0.3 + 0.7 * ((index * 37) % 100) as f32 / 100.0;
    let mut material = MaterialData::opaque(
        format!("tile_{index}"),
        pipelines::GBUFFER_OPAQUE,
        [shade, shade, shade, 1.0],
    );
    material.textures = vec![CpuTexture::solid(4, 4, [200, 180, 160, 255])];
    if index % 5 == 4 {
        material.pipeline = pipelines::FORWARD_BLEND;
        material.alpha_blended = true;
        material.base_color[3] = 0.5;
    }
    MeshData::quad(format!("tile_{index}"), material)
}

fn build_scene(renderer: &Renderer, grid: u32) -> Result<Scene> {
    let count = grid * grid;
    for index in 0..count {
        renderer.load_mesh(format!("tile_{index}"), grid_mesh(index))?;
    }

    let mut scene = Scene::new();
    let outcomes = renderer.wait_for_loads(Duration::from_secs(30));
    anyhow::ensure!(
        outcomes.len() == count as usize,
        "only {} of {count} meshes loaded",
        outcomes.len()
    );
    for outcome in outcomes {
        let mesh = outcome
            .result
            .with_context(|| format!("Failed to load '{}'", outcome.name))?;
        let index: u32 = outcome
            .name
            .trim_start_matches("tile_")
            .parse()
            .context("unexpected mesh name")?;
        let (x, z) = ((index % grid) as f32, (index / grid) as f32);
        let instance = renderer.create_mesh_instance(mesh, true);
        scene.add(SceneNode::mesh(outcome.name, instance).with_world(translation(x, 0.0, z)));
    }

    let sun = renderer.create_light(
        LightKind::Directional {
            direction: [-0.3, -1.0, -0.2],
        },
        [1.0, 0.95, 0.9],
        3.0,
        true,
    );
    scene.add(SceneNode::light("sun", sun));
    let lamp = renderer.create_light(
        LightKind::Point { range: 6.0 },
        [1.0, 0.6, 0.3],
        1.5,
        false,
    );
    let center = grid as f32 / 2.0;
    scene.add(SceneNode::light("lamp", lamp).with_world(translation(center, 2.0, center)));
    Ok(scene)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.renderer_config()?;
    if args.print_config {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    let mut renderer = Renderer::new(config)?;
    let scene = build_scene(&renderer, args.grid)?;
    log::info!("lucent-runtime: scene of {} nodes ready", scene.len());

    let camera = Camera::default();
    let mut cpu_total = Duration::ZERO;
    for _ in 0..args.frames {
        let stats = renderer.render(&scene, &camera)?;
        cpu_total += stats.cpu_time;
        log::debug!(
            "frame {} on buffer {}: {:.2} ms, {} draws, {} submissions",
            stats.frame_index,
            stats.back_buffer_index,
            stats.cpu_time.as_secs_f64() * 1000.0,
            stats.draws,
            stats.submissions
        );
        for (pass, elapsed) in &stats.pass_times {
            log::trace!("  {}: {:.3} ms", pass.name(), elapsed.as_secs_f64() * 1000.0);
        }
    }
    renderer.wait_idle()?;

    let device = renderer.device_stats();
    log::info!(
        "lucent-runtime: {} frames, {:.2} ms average CPU time",
        args.frames,
        cpu_total.as_secs_f64() * 1000.0 / args.frames.max(1) as f64
    );
    log::info!(
        "lucent-runtime: {} lists, {} draws, {} dispatches, {} presents, {} validation errors",
        device.lists_executed,
        device.draws,
        device.dispatches,
        device.presents,
        device.validation_errors
    );
    Ok(())
}
