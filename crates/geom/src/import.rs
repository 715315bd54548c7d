//! Whole-container import into a [`MeshSink`].

use geom_decode::{Container, DecodeResult, Mesh, Semantic};
use glam::{Vec3, Vec4};

use crate::error::Result;
use crate::normals::vertex_normals;
use crate::options::ImportOptions;
use crate::sink::{MeshData, MeshSink, UvLayer};
use crate::skinning::skin_weights;
use crate::tangents::generate_tangents;

/// Convert one mesh of `container` into host-ready data.
///
/// A mesh without a position attribute gets every vertex at the origin.
pub fn build_mesh_data(
    container: &Container,
    mesh: &Mesh,
    options: &ImportOptions,
) -> DecodeResult<MeshData> {
    let remap = &options.remap;
    let norm = options.normalization;
    let triangles: Vec<[u32; 3]> = mesh.triangles().collect();

    let mut positions = match mesh.extract(Semantic::Position, norm)? {
        Some(positions) => positions.to_vec3(),
        None => {
            tracing::warn!("Mesh '{}' has no positions", mesh.name());
            vec![Vec3::ZERO; mesh.vertex_count()]
        }
    };
    remap.transform_points(&mut positions);

    let normals = match mesh.extract(Semantic::Normal, norm)? {
        Some(normals) => {
            let mut normals = normals.to_vec3();
            remap.transform_normals(&mut normals);
            Some(normals)
        }
        None if options.derive_normals => Some(vertex_normals(&positions, &triangles)),
        None => None,
    };

    let uv_layers: Vec<UvLayer> = Semantic::UV_CHANNELS
        .into_iter()
        .filter_map(|semantic| {
            mesh.extract(semantic, norm)
                .map(|uvs| uvs.map(|uvs| UvLayer { semantic, uvs: uvs.to_vec2() }))
                .transpose()
        })
        .collect::<DecodeResult<_>>()?;

    let tangents = match mesh.extract(Semantic::Tangent, norm)? {
        Some(tangents) => {
            let mut tangents = tangents.to_vec4(1.0);
            remap.transform_tangents(&mut tangents);
            Some(tangents)
        }
        None if options.derive_tangents => {
            derived_tangents(mesh.name(), &positions, normals.as_deref(), &uv_layers, &triangles)
        }
        None => None,
    };

    let colors = mesh
        .extract(Semantic::Color, norm)?
        .map(|colors| colors.to_vec4(1.0));

    let weights = skin_weights(mesh, container.skeleton(), norm)?;
    let material = container
        .mesh_material(mesh)
        .map(|material| material.name().to_owned());

    tracing::debug!(
        "Built mesh '{}': {} vertices, {} triangles, {} UV layers, {} weight groups",
        mesh.name(),
        positions.len(),
        triangles.len(),
        uv_layers.len(),
        weights.len()
    );

    Ok(MeshData {
        name: mesh.name().to_owned(),
        positions,
        triangles,
        normals,
        tangents,
        uv_layers,
        colors,
        weights,
        material,
    })
}

fn derived_tangents(
    mesh: &str,
    positions: &[Vec3],
    normals: Option<&[Vec3]>,
    uv_layers: &[UvLayer],
    triangles: &[[u32; 3]],
) -> Option<Vec<Vec4>> {
    let uvs = uv_layers.iter().find(|layer| layer.semantic == Semantic::Uv1);
    let (Some(normals), Some(uvs)) = (normals, uvs) else {
        tracing::debug!(
            "Mesh '{}' lacks normals or UVs; skipping tangent generation",
            mesh
        );
        return None;
    };

    let tangents = generate_tangents(positions, normals, &uvs.uvs, triangles);
    if tangents.is_none() {
        tracing::warn!("Tangent generation failed for mesh '{}'", mesh);
    }
    tangents
}

/// Feed a decoded container to `sink`.
///
/// The skeleton's bind pose is resolved with `options.remap`. Meshes are
/// built in parallel when the `parallel` feature is on, but always reach the
/// sink in container order.
pub fn import(
    container: &Container,
    sink: &mut impl MeshSink,
    options: &ImportOptions,
) -> Result<()> {
    let skeleton = container.skeleton();
    if !skeleton.is_empty() {
        let pose = skeleton.resolve_bind_pose(&options.remap);
        sink.skeleton(skeleton, &pose);
    }

    for material in container.materials() {
        sink.material(material);
    }

    #[cfg(feature = "parallel")]
    let meshes: Vec<DecodeResult<MeshData>> = {
        use rayon::prelude::*;
        container
            .meshes()
            .par_iter()
            .map(|mesh| build_mesh_data(container, mesh, options))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let meshes: Vec<DecodeResult<MeshData>> = container
        .meshes()
        .iter()
        .map(|mesh| build_mesh_data(container, mesh, options))
        .collect();

    for mesh in meshes {
        sink.mesh(mesh?);
    }

    tracing::info!(
        "Imported {} bones, {} materials, {} meshes",
        skeleton.len(),
        container.materials().len(),
        container.meshes().len()
    );
    Ok(())
}
