//! glTF 2.0 scene export.
//!
//! Writes the card stack as a single `.gltf` JSON file: geometry is embedded
//! as a base64 data URI, textures and depth maps are referenced by relative
//! path so consumers resolve them against the scene file's directory.
//!
//! Each card becomes one mesh. Without displacement a card is a flat quad;
//! with displacement the quad is subdivided into a regular grid and every
//! vertex is pushed along +z (away from the camera) by
//! `displacement_scale * depth / 255`, sampled bilinearly from the card's
//! depth texture. The depth image is recorded as a displacement input on the
//! mesh `extras`, never as a material channel.
//!
//! Export is all-or-nothing: inputs are validated and every referenced file
//! checked before a single byte is written, and identical inputs produce a
//! byte-identical file.

use crate::camera::SENSOR_WIDTH_MM;
use crate::card::Card;
use crate::{SceneError, SceneResult};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use glam::Vec3;
use plx_core::GrayImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY: u32 = 34963;
const FILTER_LINEAR: u32 = 9729;
const WRAP_CLAMP: u32 = 33071;

/// Grid cells per axis are one per this many texture pixels.
const PIXELS_PER_CELL: u32 = 8;
/// Subdivision cap per axis.
const MAX_CELLS: u32 = 128;

#[derive(Serialize)]
struct Document {
    asset: Asset,
    scene: usize,
    scenes: Vec<Scene>,
    nodes: Vec<Node>,
    cameras: Vec<Camera>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<Mesh>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    textures: Vec<Texture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<Image>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samplers: Vec<Sampler>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews", skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<Buffer>,
}

#[derive(Serialize)]
struct Asset {
    version: &'static str,
    generator: &'static str,
}

#[derive(Serialize)]
struct Scene {
    nodes: Vec<usize>,
}

#[derive(Serialize)]
struct Node {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera: Option<usize>,
}

#[derive(Serialize)]
struct Camera {
    #[serde(rename = "type")]
    kind: &'static str,
    perspective: Perspective,
    #[serde(skip_serializing_if = "Option::is_none")]
    extras: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Perspective {
    aspect_ratio: f32,
    yfov: f32,
    znear: f32,
}

#[derive(Serialize)]
struct Mesh {
    name: String,
    primitives: Vec<Primitive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extras: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Primitive {
    attributes: BTreeMap<&'static str, usize>,
    indices: usize,
    material: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Material {
    name: String,
    pbr_metallic_roughness: PbrMetallicRoughness,
    alpha_mode: &'static str,
    double_sided: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughness {
    base_color_texture: TextureRef,
    metallic_factor: f32,
    roughness_factor: f32,
}

#[derive(Serialize)]
struct TextureRef {
    index: usize,
}

#[derive(Serialize)]
struct Texture {
    sampler: usize,
    source: usize,
}

#[derive(Serialize)]
struct Image {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sampler {
    mag_filter: u32,
    min_filter: u32,
    wrap_s: u32,
    wrap_t: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    byte_offset: usize,
    byte_length: usize,
    target: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
    uri: String,
}

/// Geometry of one card, ready for the buffer.
struct CardMesh {
    positions: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
    min: [f32; 3],
    max: [f32; 3],
}

/// Builds the (possibly subdivided and displaced) grid mesh for a card.
///
/// Output positions are glTF coordinates (y up, -z forward); the uv origin
/// is the texture's top-left corner, matching the glTF image convention.
fn build_card_mesh(card: &Card, displacement: Option<(&GrayImage, f32)>) -> CardMesh {
    let (cells_x, cells_y) = match displacement {
        Some(_) => (
            (card.pixel_size.0 / PIXELS_PER_CELL).clamp(2, MAX_CELLS),
            (card.pixel_size.1 / PIXELS_PER_CELL).clamp(2, MAX_CELLS),
        ),
        None => (1, 1),
    };
    let [tl, tr, bl, br] = card.corners;

    let mut positions = Vec::with_capacity(((cells_x + 1) * (cells_y + 1) * 3) as usize);
    let mut uvs = Vec::with_capacity(((cells_x + 1) * (cells_y + 1) * 2) as usize);
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for j in 0..=cells_y {
        let v = j as f32 / cells_y as f32;
        for i in 0..=cells_x {
            let u = i as f32 / cells_x as f32;
            let top = tl.lerp(tr, u);
            let bottom = bl.lerp(br, u);
            let mut p = top.lerp(bottom, v);
            if let Some((depth, scale)) = displacement {
                let d = sample_depth(depth, u, v);
                p.z += scale * d / 255.0;
            }
            // Pipeline space (y down, z forward) to glTF (y up, -z forward).
            let g = Vec3::new(p.x, -p.y, -p.z);
            for (axis, value) in [g.x, g.y, g.z].into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
            positions.extend_from_slice(&[g.x, g.y, g.z]);
            uvs.extend_from_slice(&[u, v]);
        }
    }

    let mut indices = Vec::with_capacity((cells_x * cells_y * 6) as usize);
    let stride = cells_x + 1;
    for j in 0..cells_y {
        for i in 0..cells_x {
            let a = j * stride + i;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    CardMesh {
        positions,
        uvs,
        indices,
        min,
        max,
    }
}

/// Bilinear depth sample at normalized texture coordinates.
fn sample_depth(depth: &GrayImage, u: f32, v: f32) -> f32 {
    let (w, h) = depth.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let x = u.clamp(0.0, 1.0) * (w - 1) as f32;
    let y = v.clamp(0.0, 1.0) * (h - 1) as f32;
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let top = depth.sample(x0, y0) as f32 * (1.0 - fx) + depth.sample(x1, y0) as f32 * fx;
    let bottom = depth.sample(x0, y1) as f32 * (1.0 - fx) + depth.sample(x1, y1) as f32 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// URI for an image file, relative to the scene file's directory.
fn image_uri(path: &Path, scene_dir: &Path) -> String {
    let relative = path.strip_prefix(scene_dir).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() || relative.is_absolute() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        parts.join("/")
    }
}

/// Serializes the card stack into a self-contained glTF scene file.
///
/// One mesh per card, bound to the texture at the same index in
/// `texture_paths`. When `displacement_scale > 0`, `depth_texture_paths`
/// must supply one depth image per card and the meshes are subdivided and
/// displaced; with a zero scale the depth paths are ignored entirely.
/// `support_depth_of_field` records the focus distance (the near-card
/// distance) on the camera so viewers can enable depth of field.
///
/// Returns the path of the written file. Re-running with identical inputs
/// overwrites it with identical bytes.
///
/// # Errors
///
/// - [`SceneError::InvalidInput`] on length mismatches
/// - [`SceneError::MissingTexture`] / [`SceneError::MissingDepthTexture`]
///   when a referenced file is absent; nothing is written in that case
#[allow(clippy::too_many_arguments)]
pub fn export_scene(
    output_path: &Path,
    aspect_ratio: f32,
    focal_length: f32,
    camera_distance: f32,
    cards: &[Card],
    texture_paths: &[PathBuf],
    depth_texture_paths: &[PathBuf],
    displacement_scale: f32,
    support_depth_of_field: bool,
) -> SceneResult<PathBuf> {
    if texture_paths.len() != cards.len() {
        return Err(SceneError::InvalidInput(format!(
            "{} cards but {} textures",
            cards.len(),
            texture_paths.len()
        )));
    }
    let displace = displacement_scale > 0.0;
    if displace && depth_texture_paths.len() != cards.len() {
        return Err(SceneError::InvalidInput(format!(
            "displacement needs {} depth textures, got {}",
            cards.len(),
            depth_texture_paths.len()
        )));
    }
    for path in texture_paths {
        if !path.is_file() {
            return Err(SceneError::MissingTexture(path.clone()));
        }
    }
    let mut depth_maps = Vec::new();
    if displace {
        for path in depth_texture_paths {
            if !path.is_file() {
                return Err(SceneError::MissingDepthTexture(path.clone()));
            }
            depth_maps.push(plx_io::read_gray(path)?);
        }
    }

    let scene_dir = output_path.parent().unwrap_or_else(|| Path::new("."));

    let mut doc = Document {
        asset: Asset {
            version: "2.0",
            generator: "plx-scene",
        },
        scene: 0,
        scenes: vec![Scene { nodes: Vec::new() }],
        nodes: Vec::new(),
        cameras: Vec::new(),
        meshes: Vec::new(),
        materials: Vec::new(),
        textures: Vec::new(),
        images: Vec::new(),
        samplers: Vec::new(),
        accessors: Vec::new(),
        buffer_views: Vec::new(),
        buffers: Vec::new(),
    };

    // Camera node first so viewers pick it up even for empty stacks.
    let yfov = 2.0 * ((SENSOR_WIDTH_MM / aspect_ratio) / (2.0 * focal_length)).atan();
    doc.cameras.push(Camera {
        kind: "perspective",
        perspective: Perspective {
            aspect_ratio,
            yfov,
            znear: 0.1,
        },
        extras: support_depth_of_field
            .then(|| serde_json::json!({ "focusDistance": camera_distance })),
    });
    doc.nodes.push(Node {
        name: "camera".into(),
        mesh: None,
        camera: Some(0),
    });
    doc.scenes[0].nodes.push(0);

    if !cards.is_empty() {
        doc.samplers.push(Sampler {
            mag_filter: FILTER_LINEAR,
            min_filter: FILTER_LINEAR,
            wrap_s: WRAP_CLAMP,
            wrap_t: WRAP_CLAMP,
        });
    }

    let mut buffer = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        let displacement = displace.then(|| (&depth_maps[i], displacement_scale));
        let mesh = build_card_mesh(card, displacement);
        debug!(
            card = i,
            vertices = mesh.positions.len() / 3,
            "card mesh built"
        );

        let pos_view = push_view(&mut doc, &mut buffer, as_bytes(&mesh.positions), TARGET_ARRAY_BUFFER);
        let uv_view = push_view(&mut doc, &mut buffer, as_bytes(&mesh.uvs), TARGET_ARRAY_BUFFER);
        let idx_view = push_view(&mut doc, &mut buffer, index_bytes(&mesh.indices), TARGET_ELEMENT_ARRAY);

        let pos_accessor = doc.accessors.len();
        doc.accessors.push(Accessor {
            buffer_view: pos_view,
            component_type: COMPONENT_F32,
            count: mesh.positions.len() / 3,
            kind: "VEC3",
            min: Some(mesh.min.to_vec()),
            max: Some(mesh.max.to_vec()),
        });
        let uv_accessor = doc.accessors.len();
        doc.accessors.push(Accessor {
            buffer_view: uv_view,
            component_type: COMPONENT_F32,
            count: mesh.uvs.len() / 2,
            kind: "VEC2",
            min: None,
            max: None,
        });
        let idx_accessor = doc.accessors.len();
        doc.accessors.push(Accessor {
            buffer_view: idx_view,
            component_type: COMPONENT_U32,
            count: mesh.indices.len(),
            kind: "SCALAR",
            min: None,
            max: None,
        });

        let color_image = doc.images.len();
        doc.images.push(Image {
            uri: image_uri(&texture_paths[i], scene_dir),
        });
        let texture = doc.textures.len();
        doc.textures.push(Texture {
            sampler: 0,
            source: color_image,
        });
        let material = doc.materials.len();
        doc.materials.push(Material {
            name: format!("layer_{i}"),
            pbr_metallic_roughness: PbrMetallicRoughness {
                base_color_texture: TextureRef { index: texture },
                metallic_factor: 0.0,
                roughness_factor: 1.0,
            },
            alpha_mode: "BLEND",
            double_sided: true,
        });

        let extras = displace.then(|| {
            let depth_image = doc.images.len();
            doc.images.push(Image {
                uri: image_uri(&depth_texture_paths[i], scene_dir),
            });
            serde_json::json!({
                "displacementTexture": depth_image,
                "displacementScale": displacement_scale,
            })
        });

        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION", pos_accessor);
        attributes.insert("TEXCOORD_0", uv_accessor);
        let mesh_index = doc.meshes.len();
        doc.meshes.push(Mesh {
            name: format!("card_{i}"),
            primitives: vec![Primitive {
                attributes,
                indices: idx_accessor,
                material,
            }],
            extras,
        });

        let node_index = doc.nodes.len();
        doc.nodes.push(Node {
            name: format!("card_{i}"),
            mesh: Some(mesh_index),
            camera: None,
        });
        doc.scenes[0].nodes.push(node_index);
    }

    if !buffer.is_empty() {
        doc.buffers.push(Buffer {
            byte_length: buffer.len(),
            uri: format!(
                "data:application/octet-stream;base64,{}",
                BASE64_STANDARD.encode(&buffer)
            ),
        });
    }

    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(output_path, json)?;
    info!(path = %output_path.display(), cards = cards.len(), "scene exported");
    Ok(output_path.to_path_buf())
}

fn push_view(doc: &mut Document, buffer: &mut Vec<u8>, bytes: Vec<u8>, target: u32) -> usize {
    let view = doc.buffer_views.len();
    doc.buffer_views.push(BufferView {
        buffer: 0,
        byte_offset: buffer.len(),
        byte_length: bytes.len(),
        target,
    });
    buffer.extend_from_slice(&bytes);
    view
}

fn as_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn index_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraParams;
    use crate::card::setup_camera_and_cards;
    use plx_core::RgbaImage;
    use plx_io::Compression;

    fn scene_fixture(dir: &Path, n: usize) -> (Vec<Card>, Vec<PathBuf>) {
        let layers: Vec<RgbaImage> = (0..n)
            .map(|_| RgbaImage::filled(64, 32, [50, 50, 50, 255]))
            .collect();
        let depths: Vec<u8> = (0..n).map(|i| (i * 200 / n.max(1)) as u8).collect();
        let params = CameraParams::new(50.0, 10.0, 100.0);
        let (_, cards) = setup_camera_and_cards(&layers, &depths, &params).unwrap();
        let mut textures = Vec::new();
        for (i, layer) in layers.iter().enumerate() {
            let path = dir.join(format!("slice_{i}.png"));
            plx_io::write_rgba(&path, layer, Compression::Fast).unwrap();
            textures.push(path);
        }
        (cards, textures)
    }

    fn parse(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn flat_export_writes_one_quad_per_card() {
        let dir = tempfile::tempdir().unwrap();
        let (cards, textures) = scene_fixture(dir.path(), 2);
        let out = dir.path().join("model.gltf");
        let written =
            export_scene(&out, 2.0, 50.0, 10.0, &cards, &textures, &[], 0.0, false).unwrap();
        assert_eq!(written, out);

        let doc = parse(&out);
        assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);
        // Flat cards are plain quads: 4 vertices each.
        let accessor = &doc["accessors"][0];
        assert_eq!(accessor["count"], 4);
        // Image URIs are relative file names.
        assert_eq!(doc["images"][0]["uri"], "slice_0.png");
        // Geometry buffer is embedded.
        let buffer_uri = doc["buffers"][0]["uri"].as_str().unwrap();
        assert!(buffer_uri.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn export_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let (cards, textures) = scene_fixture(dir.path(), 2);
        let out = dir.path().join("model.gltf");
        export_scene(&out, 2.0, 50.0, 10.0, &cards, &textures, &[], 0.0, false).unwrap();
        let first = std::fs::read(&out).unwrap();
        export_scene(&out, 2.0, 50.0, 10.0, &cards, &textures, &[], 0.0, false).unwrap();
        assert_eq!(first, std::fs::read(&out).unwrap());
    }

    #[test]
    fn missing_texture_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let (cards, mut textures) = scene_fixture(dir.path(), 2);
        textures[1] = dir.path().join("gone.png");
        let out = dir.path().join("model.gltf");
        let err =
            export_scene(&out, 2.0, 50.0, 10.0, &cards, &textures, &[], 0.0, false).unwrap_err();
        assert!(matches!(err, SceneError::MissingTexture(_)));
        assert!(!out.exists());
    }

    #[test]
    fn displacement_subdivides_and_references_depth() {
        let dir = tempfile::tempdir().unwrap();
        let (cards, textures) = scene_fixture(dir.path(), 1);
        let depth_path = dir.path().join("slice_0_depth.png");
        let mut depth = GrayImage::new(64, 32);
        for y in 0..32 {
            for x in 32..64 {
                depth.set_sample(x, y, 200);
            }
        }
        plx_io::write_gray(&depth_path, &depth, Compression::Fast).unwrap();

        let out = dir.path().join("model.gltf");
        export_scene(
            &out,
            2.0,
            50.0,
            10.0,
            &cards,
            &textures,
            &[depth_path],
            2.0,
            false,
        )
        .unwrap();

        let doc = parse(&out);
        // 64x32 at 8 px per cell -> 8x4 cells -> 9x5 vertices.
        assert_eq!(doc["accessors"][0]["count"], 45);
        let extras = &doc["meshes"][0]["extras"];
        assert_eq!(extras["displacementScale"], 2.0);
        let depth_image = extras["displacementTexture"].as_u64().unwrap() as usize;
        assert_eq!(
            doc["images"][depth_image]["uri"].as_str().unwrap(),
            "slice_0_depth.png"
        );
        // Displaced vertices moved along -z in glTF space (farther away).
        let z_min = doc["accessors"][0]["min"][2].as_f64().unwrap();
        assert!(z_min < -10.0 - 1.0, "z min {z_min} shows displacement");
    }

    #[test]
    fn displacement_requires_depth_per_card() {
        let dir = tempfile::tempdir().unwrap();
        let (cards, textures) = scene_fixture(dir.path(), 2);
        let out = dir.path().join("model.gltf");
        let err =
            export_scene(&out, 2.0, 50.0, 10.0, &cards, &textures, &[], 1.0, false).unwrap_err();
        assert!(matches!(err, SceneError::InvalidInput(_)));
    }

    #[test]
    fn empty_stack_still_writes_camera_scene() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.gltf");
        export_scene(&out, 1.5, 35.0, 10.0, &[], &[], &[], 0.0, true).unwrap();
        let doc = parse(&out);
        assert_eq!(doc["cameras"].as_array().unwrap().len(), 1);
        assert!(doc.get("meshes").is_none());
        assert_eq!(doc["cameras"][0]["extras"]["focusDistance"], 10.0);
    }

    #[test]
    fn dof_flag_controls_camera_extras() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.gltf");
        export_scene(&out, 1.5, 35.0, 10.0, &[], &[], &[], 0.0, false).unwrap();
        let doc = parse(&out);
        assert!(doc["cameras"][0].get("extras").is_none());
    }
}
