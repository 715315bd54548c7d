//! MikkTSpace tangent generation.

use glam::{Vec2, Vec3, Vec4};
use mikktspace::Geometry;

struct TriangleGeometry<'a> {
    positions: &'a [Vec3],
    normals: &'a [Vec3],
    uvs: &'a [Vec2],
    triangles: &'a [[u32; 3]],
    tangents: &'a mut [Vec4],
}

impl TriangleGeometry<'_> {
    fn vertex(&self, face: usize, vert: usize) -> usize {
        self.triangles[face][vert] as usize
    }
}

impl Geometry for TriangleGeometry<'_> {
    fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.positions[self.vertex(face, vert)].to_array()
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.normals[self.vertex(face, vert)].to_array()
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.uvs[self.vertex(face, vert)].to_array()
    }

    fn set_tangent_encoded(&mut self, tangent: [f32; 4], face: usize, vert: usize) {
        let index = self.vertex(face, vert);
        self.tangents[index] = Vec4::from_array(tangent);
    }
}

/// Generate per-vertex tangents (`w` = bitangent sign).
///
/// Returns `None` if the inputs disagree in length, a triangle references a
/// missing vertex, or MikkTSpace fails.
#[must_use]
pub fn generate_tangents(
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    triangles: &[[u32; 3]],
) -> Option<Vec<Vec4>> {
    if positions.len() != normals.len() || positions.len() != uvs.len() {
        return None;
    }
    if triangles.iter().flatten().any(|&i| i as usize >= positions.len()) {
        return None;
    }

    let mut tangents = vec![Vec4::ZERO; positions.len()];
    let mut geometry = TriangleGeometry {
        positions,
        normals,
        uvs,
        triangles,
        tangents: &mut tangents,
    };

    mikktspace::generate_tangents(&mut geometry).then_some(tangents)
}
