//! The seam between decoded containers and a host scene.

use geom_decode::{BindPose, Material, Semantic, Skeleton};
use glam::{Vec2, Vec3, Vec4};

use crate::skinning::WeightGroup;

/// One UV channel of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer {
    /// [`Semantic::Uv1`], [`Semantic::Uv2`] or [`Semantic::Uv3`].
    pub semantic: Semantic,
    pub uvs: Vec<Vec2>,
}

/// Host-ready geometry for one mesh, in the import's target space.
///
/// Every per-vertex array has one entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Source winding order.
    pub triangles: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vec3>>,
    /// `xyz` tangent, `w` bitangent sign.
    pub tangents: Option<Vec<Vec4>>,
    pub uv_layers: Vec<UvLayer>,
    /// RGBA; missing alpha is 1.
    pub colors: Option<Vec<Vec4>>,
    /// One group per skeleton bone that receives weight, by bone index.
    pub weights: Vec<WeightGroup>,
    /// Name of a material the container actually holds.
    pub material: Option<String>,
}

impl MeshData {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn uv_layer(&self, semantic: Semantic) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|layer| layer.semantic == semantic)
    }
}

/// Receives a container's contents during [`crate::import`].
///
/// Calls arrive in order: skeleton (only if it has bones), every material,
/// then every mesh in container order.
pub trait MeshSink {
    fn skeleton(&mut self, skeleton: &Skeleton, pose: &BindPose) {
        let _ = (skeleton, pose);
    }

    fn material(&mut self, material: &Material) {
        let _ = material;
    }

    fn mesh(&mut self, mesh: MeshData);
}

/// Collects meshes and ignores everything else.
impl MeshSink for Vec<MeshData> {
    fn mesh(&mut self, mesh: MeshData) {
        self.push(mesh);
    }
}
