//! Scene-level flow: layers to cards to an exported glTF plus rendered
//! frames, exercising the public surface of the crate together.

use glam::Vec3;
use plx_core::RgbaImage;
use plx_io::Compression;
use plx_scene::{gltf, render, setup_camera_and_cards, CameraParams};

#[test]
fn cards_export_and_render_consistently() {
    let dir = tempfile::tempdir().unwrap();

    let mut near = RgbaImage::new(48, 36);
    for y in 12..24 {
        for x in 12..36 {
            near.set_pixel(x, y, [220, 40, 40, 255]);
        }
    }
    let far = RgbaImage::filled(48, 36, [40, 40, 220, 255]);
    let layers = vec![near, far];

    let params = CameraParams::new(50.0, 10.0, 100.0);
    let (camera, cards) = setup_camera_and_cards(&layers, &[20, 235], &params).unwrap();
    assert_eq!(cards.len(), 2);
    // Dolly-zoom sizing: distance ratio equals width ratio.
    let ratio = cards[1].width() / cards[0].width();
    assert!((ratio - cards[1].distance() / cards[0].distance()).abs() < 1e-3);

    // Export referencing the layer textures.
    let mut textures = Vec::new();
    for (i, layer) in layers.iter().enumerate() {
        let path = dir.path().join(format!("slice_{i}.png"));
        plx_io::write_rgba(&path, layer, Compression::Fast).unwrap();
        textures.push(path);
    }
    let scene_path = dir.path().join("model.gltf");
    gltf::export_scene(
        &scene_path,
        48.0 / 36.0,
        params.focal_length,
        params.camera_distance,
        &cards,
        &textures,
        &[],
        0.0,
        false,
    )
    .unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&scene_path).unwrap()).unwrap();
    assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);
    assert_eq!(doc["scenes"][0]["nodes"].as_array().unwrap().len(), 3);

    // Render one frame from the reference viewpoint: the near block wins
    // at the centre, the far color fills the rest.
    let frames = render::render_sequence(
        &dir.path().join("frames"),
        &layers,
        &cards,
        &camera,
        Vec3::ZERO,
        0.0,
        1,
    )
    .unwrap();
    let frame = plx_io::read_rgba(&frames[0]).unwrap();
    assert!(frame.pixel(24, 18)[0] > 180);
    assert!(frame.pixel(4, 4)[2] > 180);
}
