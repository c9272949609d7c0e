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

use lucent_sdk::prelude::*;
use std::io::Write;
use std::time::Duration;

fn small_config() -> RendererConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    RendererConfig {
        width: 64,
        height: 32,
        shadow_map_size: 64,
        sync_interval: 0,
        ..Default::default()
    }
}

fn quad(name: &str, alpha_blended: bool) -> MeshData {
    let mut material = MaterialData::opaque(
        format!("{name}_material"),
        pipelines::GBUFFER_OPAQUE,
        [0.2, 0.6, 0.9, 1.0],
    );
    if alpha_blended {
        material.pipeline = pipelines::FORWARD_BLEND;
        material.alpha_blended = true;
    }
    material.textures = vec![CpuTexture::solid(2, 2, [255, 255, 255, 255])];
    MeshData::quad(name, material)
}

fn build_scene(renderer: &Renderer) -> Scene {
    let mut scene = Scene::new();
    let floor = renderer.load_mesh_blocking(quad("floor", false)).unwrap();
    let glass = renderer.load_mesh_blocking(quad("glass", true)).unwrap();
    for (name, mesh, casts_shadow) in [("floor", floor, true), ("glass", glass, false)] {
        let instance = renderer.create_mesh_instance(mesh, casts_shadow);
        scene.add(SceneNode::mesh(name, instance));
    }
    let sun = renderer.create_light(
        LightKind::Directional {
            direction: [0.0, -1.0, 0.0],
        },
        [1.0; 3],
        2.0,
        true,
    );
    scene.add(SceneNode::light("sun", sun));
    scene
}

#[test]
fn test_renderer_from_json_file() {
    // --- 1. ARRANGE ---
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "width": 48, "height": 24, "back_buffer_count": 2, "submission_mode": "pipelined" }}"#
    )
    .unwrap();

    // --- 2. ACT ---
    let config = RendererConfig::from_json_file(file.path()).unwrap();
    let renderer = Renderer::new(config).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(renderer.config().back_buffer_count, 2);
    assert_eq!(renderer.config().submission_mode, SubmissionMode::Pipelined);
    assert!(renderer.is_running());
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = RendererConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"), "unexpected error: {err}");
}

#[test]
fn test_render_frames() {
    // --- 1. ARRANGE ---
    let mut renderer = Renderer::new(small_config()).unwrap();
    let scene = build_scene(&renderer);

    // --- 2. ACT ---
    let stats: Vec<FrameStats> = (0..5)
        .map(|_| renderer.render(&scene, &Camera::default()).unwrap())
        .collect();
    renderer.wait_idle().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        stats.iter().map(|s| s.back_buffer_index).collect::<Vec<_>>(),
        vec![0, 1, 2, 0, 1]
    );
    assert!(stats.iter().all(|s| s.draws == 2 && s.lights == 1));
    let device = renderer.device_stats();
    assert_eq!(device.presents, 5);
    assert_eq!(device.validation_errors, 0);
}

#[test]
fn test_async_loads_reach_the_pools() {
    let renderer = Renderer::new(small_config()).unwrap();
    for i in 0..3 {
        renderer
            .load_mesh(format!("quad_{i}"), quad(&format!("quad_{i}"), false))
            .unwrap();
    }

    let outcomes = renderer.wait_for_loads(Duration::from_secs(10));

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(renderer.pools().live_counts(), (3, 3, 3));
    assert!(renderer.poll_loads().is_empty());
}

#[test]
fn test_resize_keeps_rendering() {
    let mut renderer = Renderer::new(small_config()).unwrap();
    let scene = build_scene(&renderer);
    renderer.render(&scene, &Camera::default()).unwrap();

    renderer.resize(96, 48).unwrap();
    let stats = renderer.render(&scene, &Camera::default()).unwrap();
    renderer.wait_idle().unwrap();

    assert_eq!((renderer.config().width, renderer.config().height), (96, 48));
    assert_eq!(stats.back_buffer_index, 0, "resizing restarts the flip chain");
    assert_eq!(renderer.device_stats().validation_errors, 0);
    assert!(renderer.resize(0, 48).is_err());
}

#[test]
fn test_device_loss_stops_rendering() {
    let mut renderer = Renderer::new(small_config()).unwrap();
    let scene = build_scene(&renderer);
    renderer.render(&scene, &Camera::default()).unwrap();

    renderer.software_device().simulate_device_removal();

    assert!(renderer.render(&scene, &Camera::default()).is_err());
    assert!(!renderer.is_running());
    assert!(renderer.render(&scene, &Camera::default()).is_err());
}
