//! Vertex normal derivation for meshes that store none.

use glam::Vec3;

/// Area-weighted vertex normals.
///
/// Each triangle adds its unnormalized face normal to its three vertices, so
/// larger faces pull harder. Vertices touched by no (non-degenerate) triangle
/// get a zero normal. Triangles referencing vertices past `positions` are
/// ignored.
#[must_use]
pub fn vertex_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in triangles {
        let [a, b, c] = triangle.map(|i| i as usize);
        let (Some(&pa), Some(&pb), Some(&pc)) =
            (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals.into_iter().map(Vec3::normalize_or_zero).collect()
}
