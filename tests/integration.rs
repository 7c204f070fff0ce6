//! End-to-end integration tests.
//!
//! These tests write a synthetic asset tree (OFF models, textures and shader
//! sources), run the viewer against a recording graphics context and check
//! what it drew and what it left allocated.

use std::fs;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use mesh_viewer::config::{AssetPaths, ViewerConfig};
use mesh_viewer::gpu::recording::GlCall;
use mesh_viewer::gpu::{Primitive, RecordingContext};
use mesh_viewer::types::{ColoringMode, TriangleMesh};
use mesh_viewer::{Viewer, run_headless};

const TETRAHEDRON: &str = "\
OFF
4 4 6
0 0 0
1 0 0
0 1 0
0 0 1
3 0 2 1
3 0 1 3
3 0 3 2
3 1 2 3
";

const OCTAHEDRON: &str = "\
OFF
6 8 12
1 0 0
-1 0 0
0 1 0
0 -1 0
0 0 1
0 0 -1
3 0 2 4
3 2 1 4
3 1 3 4
3 3 0 4
3 2 0 5
3 1 2 5
3 3 1 5
3 0 3 5
";

/// Lay out `Models/`, `Textures/` and `Shader/` under `root`.
fn write_assets(root: &Path) -> AssetPaths {
    let assets = AssetPaths::under(root);
    for dir in ["Models", "Textures", "Shader"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }

    fs::write(&assets.model, TETRAHEDRON).unwrap();
    fs::write(&assets.light_sphere, OCTAHEDRON).unwrap();

    // 16x16 checkerboard
    let grid = image::RgbImage::from_fn(16, 16, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            image::Rgb([200, 60, 60])
        } else {
            image::Rgb([60, 60, 200])
        }
    });
    grid.save(&assets.test_texture).unwrap();
    for path in [&assets.bump_diffuse, &assets.bump_normal, &assets.bump_displacement] {
        image::RgbImage::from_pixel(8, 8, image::Rgb([128, 128, 255]))
            .save(path)
            .unwrap();
    }

    for path in [
        &assets.mvp_vertex_shader,
        &assets.constant_color_shader,
        &assets.lambert_shader,
        &assets.bump_vertex_shader,
        &assets.bump_fragment_shader,
    ] {
        fs::write(path, "#version 330 core\nvoid main() {}\n").unwrap();
    }
    assets
}

fn small_config(assets: AssetPaths) -> ViewerConfig {
    let mut config = ViewerConfig {
        assets,
        seed: Some(11),
        ..ViewerConfig::default()
    };
    config.terrain.width = 16;
    config.terrain.height = 16;
    config.sphere.longitude_divisions = 16;
    config.sphere.latitude_divisions = 8;
    // Bump sphere straight ahead at distance 10
    config.camera.position = Vec3::new(0.0, 5.0, 10.0);
    config
}

#[test]
fn off_unit_square_bounds() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("square.off");
    fs::write(&path, "OFF\n4 2 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n3 0 1 2\n3 0 2 3\n").unwrap();

    let mut ctx = RecordingContext::new();
    let mut mesh = TriangleMesh::new();
    assert!(mesh.load_from_file(&path, Some(&mut ctx)));
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.bounds().mid(), Vec3::new(0.5, 0.5, 0.0));
    assert_eq!(mesh.bounds().size(), Vec3::new(1.0, 1.0, 0.0));
    assert!(mesh.gpu().is_allocated());

    mesh.destroy(&mut ctx);
    assert_eq!(ctx.live_buffers(), 0);
}

#[test]
fn full_scene_frame_and_release() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = write_assets(tmp.path());
    let mut ctx = RecordingContext::new();

    let mut viewer = Viewer::initialize(small_config(assets), &mut ctx).expect("scene should initialize");
    assert!(!ctx.is_current(), "setup must release the context");
    assert_eq!(viewer.programs().len(), 2);
    assert_eq!(ctx.live_textures(), 4);
    assert_eq!(viewer.model().triangle_count(), 4);
    assert_eq!(viewer.model().coloring_mode(), ColoringMode::Texture);
    assert_eq!(viewer.terrain().coloring_mode(), ColoringMode::ColorArray);
    assert_eq!(viewer.bump_sphere().coloring_mode(), ColoringMode::BumpMapping);
    assert_eq!(viewer.light_sphere().triangle_count(), 8);

    viewer.resize(&mut ctx, 800, 600);
    let stats = viewer.render_frame(&mut ctx, Duration::from_millis(16));
    assert_eq!(stats.objects_drawn + stats.objects_culled, viewer.instance_count());
    assert!(stats.triangles >= viewer.bump_sphere().triangle_count());

    viewer.change_shader(&mut ctx, 1);
    viewer.toggle_bounding_box(true);
    ctx.clear_calls();
    viewer.render_frame(&mut ctx, Duration::from_millis(16));
    assert!(
        ctx.calls()
            .iter()
            .any(|c| matches!(c, GlCall::DrawElements { mode: Primitive::Lines, count: 24 })),
        "bounding boxes should be drawn"
    );

    viewer.recreate_terrain(&mut ctx);
    viewer.release(&mut ctx);
    assert_eq!(ctx.live_buffers(), 0);
    assert_eq!(ctx.live_vertex_arrays(), 0);
    assert_eq!(ctx.live_textures(), 0);
    assert_eq!(ctx.live_programs(), 0);
    assert!(!ctx.is_current());
}

#[test]
fn headless_run_with_assets() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = write_assets(tmp.path());
    let mut config = small_config(assets);
    config.frames = 5;
    config.grid_size = 2;
    config.light.moves = true;
    config.stats_output = Some(tmp.path().join("summary.json"));

    let mut ctx = RecordingContext::new();
    let summary = run_headless(&config, &mut ctx).expect("run should succeed");
    assert_eq!(summary.frames, 5);
    assert_eq!(
        summary.total_objects_drawn + summary.total_objects_culled,
        5 * 10,
        "ten instances per frame"
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["frames"], 5);
    assert!(json["last_frame"]["triangles"].as_u64().unwrap() > 0);
    assert_eq!(ctx.live_buffers(), 0);
}
