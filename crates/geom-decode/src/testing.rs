//! Byte-level builders for synthetic containers.
//!
//! The builders write exactly what they are told, so they can produce invalid
//! input as easily as valid input.

use glam::Mat4;

use crate::attributes::{Dtype, Semantic};
use crate::container::CONTAINER_VERSION;
use crate::error::SectionTag;
use crate::material::{ShaderName, UniformKind};
use crate::skeleton::LocalTransform;

/// Little-endian byte sink.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f16(&mut self, value: f32) -> &mut Self {
        self.bytes
            .extend_from_slice(&half::f16::from_f32(value).to_le_bytes());
        self
    }

    pub fn f32s(&mut self, values: &[f32]) -> &mut Self {
        for &value in values {
            self.f32(value);
        }
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// `u16` length prefix, then UTF-8.
    ///
    /// # Panics
    ///
    /// If `value` is longer than `u16::MAX` bytes.
    pub fn string(&mut self, value: &str) -> &mut Self {
        let len = u16::try_from(value.len()).expect("test string too long");
        self.u16(len).bytes(value.as_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

/// Builds one mesh record.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    name: String,
    stride: u32,
    attributes: Vec<[u8; 5]>,
    vertex_count: u32,
    vertex_data: Vec<u8>,
    index_type: u8,
    indices: Vec<u32>,
    material: String,
    palette: Vec<String>,
}

impl MeshBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            stride: 0,
            attributes: Vec::new(),
            vertex_count: 0,
            vertex_data: Vec::new(),
            index_type: 0,
            indices: Vec::new(),
            material: String::new(),
            palette: Vec::new(),
        }
    }

    #[must_use]
    pub fn stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    #[must_use]
    pub fn attribute(self, semantic: Semantic, dtype: Dtype, components: u8, offset: u16) -> Self {
        self.raw_attribute(semantic.tag(), dtype.tag(), components, offset)
    }

    /// Descriptor from raw tags, for writing unknown values.
    #[must_use]
    pub fn raw_attribute(mut self, semantic: u8, dtype: u8, components: u8, offset: u16) -> Self {
        let [lo, hi] = offset.to_le_bytes();
        self.attributes.push([semantic, dtype, components, lo, hi]);
        self
    }

    /// Tightly packed `f32` vertices; also sets the vertex count.
    #[must_use]
    pub fn vertices_f32<const N: usize>(mut self, vertices: &[[f32; N]]) -> Self {
        self.vertex_data = vertices.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        self.vertex_count = vertices.len() as u32;
        self
    }

    /// Arbitrary vertex bytes for `count` vertices.
    #[must_use]
    pub fn raw_vertices(mut self, bytes: Vec<u8>, count: u32) -> Self {
        self.vertex_data = bytes;
        self.vertex_count = count;
        self
    }

    #[must_use]
    pub fn indices_u16(mut self, indices: &[u16]) -> Self {
        self.index_type = 0;
        self.indices = indices.iter().copied().map(u32::from).collect();
        self
    }

    #[must_use]
    pub fn indices_u32(mut self, indices: &[u32]) -> Self {
        self.index_type = 1;
        self.indices = indices.to_vec();
        self
    }

    /// Override the index type byte without changing how indices are written.
    #[must_use]
    pub fn index_type(mut self, tag: u8) -> Self {
        self.index_type = tag;
        self
    }

    #[must_use]
    pub fn material(mut self, material: &str) -> Self {
        self.material = material.to_owned();
        self
    }

    #[must_use]
    pub fn palette(mut self, bones: &[&str]) -> Self {
        self.palette = bones.iter().map(|&b| b.to_owned()).collect();
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.string(&self.name)
            .u32(self.vertex_count)
            .u32(self.stride)
            .u16(self.attributes.len() as u16);
        for descriptor in &self.attributes {
            w.bytes(descriptor);
        }
        w.bytes(&self.vertex_data);

        w.u8(self.index_type).u32(self.indices.len() as u32);
        // Index width follows the builder call, not the type byte.
        let wide = self.index_type == 1 || self.indices.iter().any(|&i| i > u32::from(u16::MAX));
        for &index in &self.indices {
            if wide {
                w.u32(index);
            } else {
                w.u16(index as u16);
            }
        }

        w.string(&self.material).u16(self.palette.len() as u16);
        for bone in &self.palette {
            w.string(bone);
        }
        w.finish()
    }
}

/// Builds a skeleton section payload.
#[derive(Debug, Clone, Default)]
pub struct SkeletonBuilder {
    bones: Vec<(String, i32, LocalTransform)>,
}

impl SkeletonBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone; `parent` is written as-is (-1 for a root).
    #[must_use]
    pub fn bone(mut self, name: &str, parent: i32, local: LocalTransform) -> Self {
        self.bones.push((name.to_owned(), parent, local));
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u32(self.bones.len() as u32);
        for (name, parent, local) in &self.bones {
            w.string(name)
                .i32(*parent)
                .f32s(&local.translation.to_array())
                .f32s(&local.rotation.to_array())
                .f32s(&local.scale.to_array());
        }
        w.finish()
    }
}

/// Builds one material record.
#[derive(Debug, Clone)]
pub struct MaterialBuilder {
    name: String,
    uniforms: Vec<(String, u8, String)>,
    shaders: Vec<[u32; 14]>,
}

impl MaterialBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            uniforms: Vec::new(),
            shaders: Vec::new(),
        }
    }

    #[must_use]
    pub fn uniform(self, parameter: &str, kind: UniformKind, value: &str) -> Self {
        self.raw_uniform(parameter, kind.tag(), value)
    }

    #[must_use]
    pub fn raw_uniform(mut self, parameter: &str, kind: u8, value: &str) -> Self {
        self.uniforms
            .push((parameter.to_owned(), kind, value.to_owned()));
        self
    }

    #[must_use]
    pub fn shader(mut self, words: [u32; 14]) -> Self {
        self.shaders.push(words);
        self
    }

    #[must_use]
    pub fn shader_name(self, name: ShaderName) -> Self {
        self.shader(*name.words())
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.string(&self.name).u8(self.uniforms.len() as u8);
        for (parameter, kind, value) in &self.uniforms {
            w.string(parameter).u8(*kind).string(value);
        }
        w.u8(self.shaders.len() as u8);
        for words in &self.shaders {
            for &word in words {
                w.u32(word);
            }
        }
        w.finish()
    }
}

/// Builds a whole container from section payloads.
#[derive(Debug, Clone)]
pub struct GeomBuilder {
    version: u32,
    section_count: Option<u32>,
    sections: Vec<([u8; 4], Vec<u8>)>,
    trailing: Vec<u8>,
}

impl Default for GeomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeomBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: CONTAINER_VERSION,
            section_count: None,
            sections: Vec::new(),
            trailing: Vec::new(),
        }
    }

    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Write `count` in the header instead of the real number of sections.
    #[must_use]
    pub fn section_count(mut self, count: u32) -> Self {
        self.section_count = Some(count);
        self
    }

    #[must_use]
    pub fn section(mut self, tag: [u8; 4], payload: Vec<u8>) -> Self {
        self.sections.push((tag, payload));
        self
    }

    #[must_use]
    pub fn skeleton(self, skeleton: &SkeletonBuilder) -> Self {
        self.section(SectionTag::Skeleton.fourcc(), skeleton.build())
    }

    #[must_use]
    pub fn material(self, material: &MaterialBuilder) -> Self {
        self.section(SectionTag::Material.fourcc(), material.build())
    }

    #[must_use]
    pub fn mesh(self, mesh: &MeshBuilder) -> Self {
        self.section(SectionTag::Mesh.fourcc(), mesh.build())
    }

    /// Inverse bind matrices, stored as their upper 3x4 in column-major order.
    #[must_use]
    pub fn inverse_bind_poses(self, matrices: &[Mat4]) -> Self {
        let mut w = ByteWriter::new();
        w.u32(matrices.len() as u32);
        for m in matrices {
            for column in [m.x_axis, m.y_axis, m.z_axis, m.w_axis] {
                w.f32s(&column.truncate().to_array());
            }
        }
        self.section(SectionTag::InverseBindPoses.fourcc(), w.finish())
    }

    /// Bytes appended after the last section.
    #[must_use]
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing = bytes.to_vec();
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u32(self.version)
            .u32(self.section_count.unwrap_or(self.sections.len() as u32));
        for (tag, payload) in &self.sections {
            w.bytes(tag).u32(payload.len() as u32).bytes(payload);
        }
        w.bytes(&self.trailing);
        w.finish()
    }
}
