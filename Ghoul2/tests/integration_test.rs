use ghoul2::formats::gla::frames_byte_size;
use ghoul2::formats::glm::{BoneLookup, SURFACE_FLAG_TAG};
use ghoul2::prelude::*;
use glam::{Affine3A, Vec3};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use tempfile::tempdir;

fn translation(x: f32, y: f32, z: f32) -> Mat34 {
    Mat34::from_affine(&Affine3A::from_translation(Vec3::new(x, y, z)))
}

/// root -> spine -> head, plus a second root.
fn skeleton() -> Skeleton {
    Skeleton::from_nodes(&[
        BoneNode::new("model_root", None, Mat34::IDENTITY),
        BoneNode::new("spine", Some(0), translation(0.0, 0.0, 10.0)),
        BoneNode::new("head", Some(1), translation(0.0, 0.0, 20.0)),
        BoneNode::new("motion", None, Mat34::IDENTITY),
    ])
    .unwrap()
}

/// Poses in bone order, moving the whole body along x.
fn walk_poses(skeleton: &Skeleton, frames: usize) -> Vec<Vec<Mat34>> {
    (0..frames)
        .map(|frame| {
            let step = frame as f32;
            skeleton
                .bones
                .iter()
                .map(|bone| {
                    let [x, y, z] = bone.base_pose.translation();
                    translation(x + step, y, z + if bone.name == "head" { 1.0 } else { 0.0 })
                })
                .collect()
        })
        .collect()
}

fn assert_poses_close(actual: &[Vec<Mat34>], expected: &[Vec<Mat34>]) {
    assert_eq!(actual.len(), expected.len());
    for (frame, (a, e)) in actual.iter().zip(expected).enumerate() {
        for (bone, (a, e)) in a.iter().zip(e).enumerate() {
            for (x, y) in a.translation().iter().zip(e.translation()) {
                assert!((x - y).abs() < 1e-3, "frame {frame} bone {bone}: {a:?} vs {e:?}");
            }
        }
    }
}

#[test]
fn test_gla_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walk.gla");

    let skeleton = skeleton();
    let poses = walk_poses(&skeleton, 5);
    let gla = GlaFile::encode("models/test/walk", 1.0, skeleton, &poses, None).unwrap();
    write_gla(&gla, &path).unwrap();

    let result = read_gla(&path, &GlaReadOptions::default()).unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.gla, gla);
    assert_eq!(result.header.num_frames, 5);
    assert_eq!(
        (result.header.ofs_comp_bone_pool - result.header.ofs_frames) as usize,
        frames_byte_size(5, 4)
    );

    let animation = result.gla.animation.as_ref().unwrap();
    assert!(!animation.is_partial());
    let decoded = animation.decode_poses(&result.gla.skeleton, None).unwrap();
    assert_poses_close(&decoded, &poses);
}

#[test]
fn test_gla_frame_window() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walk.gla");

    let skeleton = skeleton();
    let poses = walk_poses(&skeleton, 6);
    write_gla(
        &GlaFile::encode("walk", 1.0, skeleton, &poses, None).unwrap(),
        &path,
    )
    .unwrap();

    let result = read_gla(&path, &GlaReadOptions::frame_range(4, 10)).unwrap();
    let animation = result.gla.animation.as_ref().unwrap();
    assert!(animation.is_partial());
    assert_eq!(animation.first_frame, 4);
    assert_eq!(animation.num_frames(), 2);
    assert_eq!(result.warnings.len(), 1);

    let decoded = animation.decode_poses(&result.gla.skeleton, None).unwrap();
    assert_poses_close(&decoded, &poses[4..]);

    let skeleton_only = read_gla(&path, &GlaReadOptions::skeleton_only()).unwrap();
    assert!(skeleton_only.gla.animation.is_none());
    assert_eq!(skeleton_only.gla.skeleton, result.gla.skeleton);
}

#[test]
fn test_frame_window_pool_covers_only_the_window() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walk.gla");

    // every frame moves the roots further, adding new pool entries
    let skeleton = skeleton();
    let poses = walk_poses(&skeleton, 6);
    write_gla(
        &GlaFile::encode("walk", 1.0, skeleton, &poses, None).unwrap(),
        &path,
    )
    .unwrap();

    let full_result = read_gla(&path, &GlaReadOptions::default()).unwrap();
    let full = full_result.gla.animation.as_ref().unwrap();
    let window = read_gla(&path, &GlaReadOptions::frame_range(0, 2)).unwrap();
    let window = window.gla.animation.unwrap();

    let highest = window
        .frames
        .iter()
        .flat_map(|frame| frame.bone_indices.iter().copied())
        .max()
        .unwrap() as usize;
    assert_eq!(window.pool.len(), highest + 1);
    assert!(window.pool.len() < full.pool.len());
    assert_eq!(window.pool[..], full.pool[..window.pool.len()]);
    assert!(window.is_partial());

    let decoded = window.decode_poses(&full_result.gla.skeleton, None).unwrap();
    assert_poses_close(&decoded, &poses[..2]);

    let rest = read_gla(&path, &GlaReadOptions::frame_range(1, usize::MAX)).unwrap();
    let rest = rest.gla.animation.unwrap();
    assert_eq!(rest.first_frame, 1);
    assert_eq!(rest.num_frames(), 5);
}

fn quad(bone: &str) -> MeshInput {
    let normal = [0.0, 0.0, 1.0];
    MeshInput {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        influences: vec![
            vec![(bone.to_string(), 1.0)],
            vec![(bone.to_string(), 0.5), ("model_root".to_string(), 0.5)],
            vec![(bone.to_string(), 1.0)],
            vec![("model_root".to_string(), 1.0)],
        ],
        faces: vec![
            vec![
                MeshCorner::new(0, [0.0, 0.0], normal),
                MeshCorner::new(1, [1.0, 0.0], normal),
                MeshCorner::new(2, [1.0, 1.0], normal),
            ],
            vec![
                MeshCorner::new(0, [0.0, 0.0], normal),
                MeshCorner::new(2, [1.0, 1.0], normal),
                MeshCorner::new(3, [0.0, 1.0], normal),
            ],
        ],
    }
}

fn tag() -> MeshInput {
    let corner = |vertex| MeshCorner::new(vertex, [0.5, 0.5], [0.0, 1.0, 0.0]);
    MeshInput {
        positions: vec![[0.0, 0.0, 30.0], [1.0, 0.0, 30.0], [0.0, 1.0, 30.0]],
        influences: vec![vec![("head".to_string(), 1.0)]; 3],
        faces: vec![vec![corner(0), corner(1), corner(2)]],
    }
}

fn model_input() -> ModelInput {
    let body = SurfaceNode::new("body", "models/test/body")
        .with_child(SurfaceNode::new("head", "models/test/head"))
        .with_child(SurfaceNode::new("*head_tag", "").with_flags(SURFACE_FLAG_TAG));

    let lod0 = HashMap::from([
        ("body".to_string(), quad("spine")),
        ("head".to_string(), quad("head")),
        ("*head_tag".to_string(), tag()),
    ]);
    let lod1 = HashMap::from([("body".to_string(), quad("spine"))]);

    ModelInput {
        name: "models\\test\\model".to_string(),
        surfaces: vec![body],
        lods: vec![lod0, lod1],
    }
}

#[test]
fn test_scene_loads_model_with_skeleton() {
    let dir = tempdir().unwrap();
    let scene = Scene::new(&dir.path().display().to_string());

    let skeleton = skeleton();
    let gla = GlaFile::encode("models/test/skeleton", 1.0, skeleton.clone(), &[], None).unwrap();
    scene.save_gla(&gla, "models/test/skeleton").unwrap();
    std::fs::write(
        dir.path().join("models/test/animation.cfg"),
        "// test\nBOTH_STAND1\t\t0\t1\t0\t20\n",
    )
    .unwrap();

    let binding = BoneBinding::Skeleton {
        anim_name: "models/test/skeleton".to_string(),
        bones: BoneLookup::from_skeleton(&skeleton).unwrap(),
    };
    let glm = GlmFile::build(&model_input(), &binding, &SurfaceBuildOptions::default()).unwrap();
    assert_eq!(glm.name, "models/test/model");
    scene.save_glm(&glm, "models/test/model").unwrap();

    let mut scene = Scene::new(&dir.path().display().to_string());
    scene
        .load_model("models/test/model", &GlaReadOptions::skeleton_only())
        .unwrap();
    assert!(scene.warnings.is_empty(), "{:?}", scene.warnings);
    // weights are quantized once, after that the bytes are stable
    let loaded = scene.glm.as_ref().unwrap();
    assert_eq!(loaded.to_bytes().unwrap(), glm.to_bytes().unwrap());
    assert_eq!(loaded.hierarchy, glm.hierarchy);
    assert_eq!(scene.animation_cfg.as_ref().unwrap().sequences.len(), 1);

    let head = loaded.surface(0, "head").unwrap();
    assert_eq!(scene.surface_bone_names(head).unwrap(), ["head", "model_root"]);
    let body = loaded.surface(0, "body").unwrap();
    assert_eq!(scene.surface_bone_names(body).unwrap(), ["spine", "model_root"]);

    // LOD 1 keeps a record for every surface
    assert_eq!(loaded.lods[1].surfaces.len(), 3);
    assert!(loaded.surface(1, "head").unwrap().is_empty());
    assert!(!loaded.surface(1, "body").unwrap().is_empty());
}

#[test]
fn test_tag_surface_layout() {
    let glm = GlmFile::build(
        &model_input(),
        &BoneBinding::Default,
        &SurfaceBuildOptions::default(),
    )
    .unwrap();
    assert!(glm.uses_default_skeleton());
    assert_eq!(glm.num_bones, 1);

    let tag = glm.surface(0, "*head_tag").unwrap();
    assert_eq!(tag.vertices.len(), 3);
    assert!(tag.vertices.iter().all(|v| v.uv == [0.0, 0.0]));
    assert!(tag.vertices.iter().all(|v| v.normal == [0.0, 0.0, 0.0]));
    assert_eq!(tag.bone_references, vec![0]);

    // two triangles share an edge, so four vertices
    let body = glm.surface(0, "body").unwrap();
    assert_eq!(body.vertices.len(), 4);
    assert!(
        body.vertices
            .iter()
            .all(|v| v.weights.bone_refs() == [0] && v.weights.weights() == [1.0])
    );
}

#[test]
fn test_surface_with_33_bones_fails() {
    let bones: HashMap<String, usize> = (0..40).map(|i| (format!("bone_{i}"), i)).collect();
    let binding = BoneBinding::Skeleton {
        anim_name: "models/test/skeleton".to_string(),
        bones: BoneLookup::from_index_map(bones).unwrap(),
    };

    let normal = [0.0, 0.0, 1.0];
    let mesh = MeshInput {
        positions: (0..33).map(|i| [i as f32, 0.0, 0.0]).collect(),
        influences: (0..33).map(|i| vec![(format!("bone_{i}"), 1.0)]).collect(),
        faces: (0..11)
            .map(|t| {
                (0..3)
                    .map(|k| MeshCorner::new(3 * t + k, [0.0, 0.0], normal))
                    .collect()
            })
            .collect(),
    };
    let input = ModelInput {
        name: "models/test/crowded".to_string(),
        surfaces: vec![SurfaceNode::new("crowded", "")],
        lods: vec![HashMap::from([("crowded".to_string(), mesh)])],
    };

    let err = GlmFile::build(&input, &binding, &SurfaceBuildOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyBoneReferences {
            count: 33,
            limit: 32
        }
    ));
}

#[test]
fn test_triangle_ending_in_zero_is_rotated_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tri.glm");

    let hierarchy = SurfaceHierarchy::from_tree(&[SurfaceNode::new("tri", "")]).unwrap();
    let vertex = |x: f32| Vertex {
        position: [x, 0.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [x, 0.0],
        weights: VertexWeights::single(0),
    };
    let surface = Surface {
        index: 0,
        vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
        // stored on disk as (0, 2, 1), which ends in zero
        triangles: vec![Triangle::new(1, 2, 0)],
        bone_references: vec![0],
    };
    let glm = GlmFile {
        name: "tri".to_string(),
        anim_name: "*default".to_string(),
        num_bones: 1,
        hierarchy,
        lods: vec![Lod::from_present(1, vec![surface]).unwrap()],
    };
    write_glm(&glm, &path).unwrap();

    let result = read_glm(&path).unwrap();
    let read = &result.glm.lods[0].surfaces[0];
    assert_eq!(read.triangles, vec![Triangle::new(0, 1, 2)]);
    assert_eq!(read.vertices, glm.lods[0].surfaces[0].vertices);
}

#[test]
fn test_vertex_weights_survive_the_file() {
    let weights = VertexWeights::new(&[(3, 0.5), (1, 0.25), (7, 0.125), (0, 0.125)]).unwrap();
    let (packed, lo) = weights.pack();
    let unpacked = VertexWeights::unpack(packed, lo);

    assert_eq!(unpacked.bone_refs(), [3, 1, 7, 0]);
    let sum: f32 = unpacked.weights().iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
    for (a, b) in unpacked.weights().iter().zip(weights.weights()) {
        assert!((a - b).abs() < 1.0 / 1023.0);
    }
}

#[test]
fn test_validate_tree_summary() {
    let dir = tempdir().unwrap();
    let skeleton = skeleton();
    let gla = GlaFile::encode("skeleton", 1.0, skeleton.clone(), &walk_poses(&skeleton, 2), None)
        .unwrap();
    write_gla(&gla, dir.path().join("skeleton.gla")).unwrap();
    let glm = GlmFile::build(
        &model_input(),
        &BoneBinding::Default,
        &SurfaceBuildOptions::default(),
    )
    .unwrap();
    write_glm(&glm, dir.path().join("model.glm")).unwrap();
    std::fs::write(dir.path().join("empty.glm"), b"").unwrap();

    let summary = validate_tree(dir.path(), None).unwrap();
    assert_eq!(summary.entries.len(), 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.warning_count, 0);
}
