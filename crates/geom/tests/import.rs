//! End-to-end: write a synthetic container to disk, load it, import it.

use std::path::PathBuf;

use geom::decode::testing::{
    ByteWriter, GeomBuilder, MaterialBuilder, MeshBuilder, SkeletonBuilder,
};
use geom::decode::{
    BindPose, CoordinateRemap, Dtype, ErrorKind, LocalTransform, Material, Semantic, Skeleton,
    UniformKind,
};
use geom::{Error, ImportOptions, MeshData, MeshSink};
use glam::{Mat4, Vec3};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("geom-{}-{name}.geom", std::process::id()))
}

fn bone(y: f32) -> LocalTransform {
    LocalTransform {
        translation: Vec3::new(0.0, y, 0.0),
        ..LocalTransform::default()
    }
}

/// A two-bone arm and a skinned strip: the first two vertices follow the
/// shoulder, the last two the elbow.
fn character() -> GeomBuilder {
    let skeleton = SkeletonBuilder::new()
        .bone("Shoulder", -1, bone(1.0))
        .bone("Elbow", 0, bone(0.5));

    // Position f32x3 @0, index u8x4 @12, weight u8x4 @16.
    let mut w = ByteWriter::new();
    for (y, slot) in [(0.0, 0), (0.5, 0), (1.0, 1), (1.5, 1)] {
        w.f32s(&[0.0, y, 0.0])
            .bytes(&[slot, 0, 0, 0])
            .bytes(&[255, 0, 0, 0]);
    }
    let mesh = MeshBuilder::new("Arm")
        .stride(20)
        .attribute(Semantic::Position, Dtype::Float32, 3, 0)
        .attribute(Semantic::Index, Dtype::UByte, 4, 12)
        .attribute(Semantic::Weight, Dtype::UByte, 4, 16)
        .raw_vertices(w.finish(), 4)
        .indices_u16(&[0, 1, 2, 1, 3, 2])
        .material("Skin")
        .palette(&["Shoulder", "Elbow"]);

    let skin = MaterialBuilder::new("Skin")
        .uniform("DiffuseMap", UniformKind::Texture, "arm_d")
        .uniform("Specular", UniformKind::Scalar, "0.5");

    GeomBuilder::new()
        .skeleton(&skeleton)
        .material(&skin)
        .mesh(&mesh)
}

#[derive(Default)]
struct Scene {
    pose: Option<BindPose>,
    bone_names: Vec<String>,
    materials: Vec<String>,
    meshes: Vec<MeshData>,
}

impl MeshSink for Scene {
    fn skeleton(&mut self, skeleton: &Skeleton, pose: &BindPose) {
        self.bone_names = skeleton.bones().iter().map(|b| b.name.clone()).collect();
        self.pose = Some(pose.clone());
    }

    fn material(&mut self, material: &Material) {
        self.materials.push(material.name().to_owned());
    }

    fn mesh(&mut self, mesh: MeshData) {
        self.meshes.push(mesh);
    }
}

#[test]
fn loads_and_imports_a_skinned_character() {
    init_tracing();
    let path = temp_path("character");
    std::fs::write(&path, character().build()).unwrap();

    let mut scene = Scene::default();
    let container = geom::load_into(&path, &mut scene, &ImportOptions::default()).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(scene.bone_names, ["Shoulder", "Elbow"]);
    assert_eq!(scene.materials, ["Skin"]);
    assert_eq!(scene.meshes.len(), 1);

    // Heads in Z-up space: shoulder at z=1, elbow at z=1.5.
    let pose = scene.pose.unwrap();
    assert!(pose.bones()[0].head.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));
    assert!(pose.bones()[1].head.abs_diff_eq(Vec3::new(0.0, 0.0, 1.5), 1e-5));
    assert!(pose.bones()[0].tail.abs_diff_eq(pose.bones()[1].head, 1e-5));
    let elbow_global = CoordinateRemap::z_up().matrix() * container.skeleton().global_matrices()[1];
    assert!(pose.bones()[1].global.abs_diff_eq(elbow_global, 1e-5));

    let arm = &scene.meshes[0];
    assert_eq!(arm.material.as_deref(), Some("Skin"));
    assert!(arm.positions[3].abs_diff_eq(Vec3::new(0.0, 0.0, 1.5), 1e-5));
    assert_eq!(arm.triangles, vec![[0, 1, 2], [1, 3, 2]]);
    assert_eq!(arm.normals.as_ref().map(Vec::len), Some(4));

    assert_eq!(arm.weights.len(), 2);
    assert_eq!(arm.weights[0].bone_name, "Shoulder");
    assert_eq!(arm.weights[0].weights, vec![(0, 1.0), (1, 1.0)]);
    assert_eq!(arm.weights[1].bone_name, "Elbow");
    assert_eq!(arm.weights[1].weights, vec![(2, 1.0), (3, 1.0)]);
}

#[test]
fn stored_inverse_bind_poses_round_trip_through_load() {
    init_tracing();
    let inverse = [
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
        Mat4::from_translation(Vec3::new(0.0, -1.5, 0.0)),
    ];
    let path = temp_path("ibpm");
    std::fs::write(&path, character().inverse_bind_poses(&inverse).build()).unwrap();

    let container = geom::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(container.inverse_bind_matrices(), Some(&inverse[..]));
    assert!(container.inverse_bind_mismatches(1e-5).is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = geom::load(temp_path("does-not-exist")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
}

#[test]
fn corrupt_file_is_a_decode_error() {
    init_tracing();
    let path = temp_path("corrupt");
    std::fs::write(&path, character().trailing(&[1, 2, 3]).build()).unwrap();

    let err = geom::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    match err {
        Error::Decode(err) => assert_eq!(err.kind(), ErrorKind::CorruptData),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn vec_sink_collects_meshes_only() {
    let container = geom::decode_container(&character().build()).unwrap();
    let mut meshes: Vec<MeshData> = Vec::new();
    geom::import(&container, &mut meshes, &ImportOptions::raw()).unwrap();
    assert_eq!(meshes.len(), 1);
    assert!(meshes[0].positions[3].abs_diff_eq(Vec3::new(0.0, 1.5, 0.0), 1e-6));
}
