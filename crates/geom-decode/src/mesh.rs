//! Mesh records: vertex layout, packed vertices, triangle list, palette.
//!
//! # Format
//!
//! ```text
//! name            string
//! vertex_count    u32
//! stride          u32
//! attribute_count u16
//! descriptors     attribute_count x 5 bytes
//! vertex_data     stride x vertex_count bytes
//! index_type      u8 (0 = u16, 1 = u32)
//! index_count     u32 (multiple of 3)
//! indices         index_count x u16/u32
//! material_name   string (empty = none)
//! palette_count   u16
//! palette         palette_count x string (bone names)
//! ```
//!
//! Attributes are not unpacked here. The mesh keeps the packed buffer and
//! the layout so consumers only pay for the attributes they ask for.

use crate::attributes::{AttributeDescriptor, Semantic, VertexLayout};
use crate::error::{DecodeError, DecodeResult};
use crate::hash::name_hash;
use crate::reader::Reader;
use crate::vertices::{self, AttributeArray, FloatArray, Normalization};

/// Width of the stored triangle indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::U16),
            1 => Some(Self::U32),
            _ => None,
        }
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::U16 => 0,
            Self::U32 => 1,
        }
    }

    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Borrowed view of a mesh's packed vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackInfo<'a> {
    pub bytes: &'a [u8],
    pub stride: usize,
    pub vertex_count: usize,
}

/// A decoded mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    layout: VertexLayout,
    vertex_count: usize,
    vertex_data: Vec<u8>,
    index_format: IndexFormat,
    indices: Vec<u32>,
    material: Option<String>,
    palette: Vec<String>,
}

impl Mesh {
    /// Read one mesh record.
    pub fn read(reader: &mut Reader<'_>) -> DecodeResult<Self> {
        let name = reader.read_string()?;
        let vertex_count = reader.read_u32()? as usize;
        let stride = reader.read_u32()? as usize;
        let attribute_count = usize::from(reader.read_u16()?);
        let layout = VertexLayout::read(reader, attribute_count, stride)?;
        if stride == 0 && vertex_count > 0 {
            return Err(DecodeError::layout(format!(
                "{vertex_count} vertices with a zero stride"
            )));
        }

        let data_offset = reader.absolute_position();
        let data_len = stride.checked_mul(vertex_count).ok_or_else(|| {
            DecodeError::corrupt(
                data_offset,
                format!("{vertex_count} vertices of {stride} bytes overflow"),
            )
        })?;
        let vertex_data = reader.read_bytes(data_len)?.to_vec();

        let format_offset = reader.absolute_position();
        let format_tag = reader.read_u8()?;
        let index_format = IndexFormat::from_tag(format_tag).ok_or_else(|| {
            DecodeError::corrupt(format_offset, format!("unknown index type {format_tag}"))
        })?;
        let indices = read_indices(reader, index_format, vertex_count)?;

        let material = Some(reader.read_string()?).filter(|m| !m.is_empty());

        let palette_count = usize::from(reader.read_u16()?);
        let palette = (0..palette_count)
            .map(|_| reader.read_string())
            .collect::<DecodeResult<Vec<_>>>()?;

        tracing::debug!(
            "Decoded mesh '{}': {} vertices, {} triangles, {} attributes, {} palette entries",
            name,
            vertex_count,
            indices.len() / 3,
            layout.attributes().len(),
            palette.len()
        );

        Ok(Self {
            name,
            layout,
            vertex_count,
            vertex_data,
            index_format,
            indices,
            material,
            palette,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn name_hash(&self) -> u32 {
        name_hash(&self.name)
    }

    #[must_use]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[must_use]
    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        self.layout.attributes()
    }

    #[must_use]
    pub fn pack_info(&self) -> PackInfo<'_> {
        PackInfo {
            bytes: &self.vertex_data,
            stride: self.layout.stride(),
            vertex_count: self.vertex_count,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[must_use]
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Flat triangle list in source winding order.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = [u32; 3]> {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Name of the referenced material, if any.
    #[must_use]
    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    /// Bone names, indexed by the per-vertex [`Semantic::Index`] values.
    #[must_use]
    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Unpack one attribute as typed values, or `None` if the mesh lacks it.
    pub fn extract_raw(&self, semantic: Semantic) -> DecodeResult<Option<AttributeArray>> {
        let Some(descriptor) = self.layout.find(semantic) else {
            return Ok(None);
        };
        let pack = self.pack_info();
        vertices::extract(pack.bytes, pack.stride, pack.vertex_count, descriptor).map(Some)
    }

    /// Unpack one attribute as floats under `normalization`.
    pub fn extract(
        &self,
        semantic: Semantic,
        normalization: Normalization,
    ) -> DecodeResult<Option<FloatArray>> {
        Ok(self
            .extract_raw(semantic)?
            .map(|array| array.to_f32(normalization)))
    }
}

/// Unpack `semantic` from `mesh` as floats. `None` if the mesh has no such attribute.
pub fn extract_attribute(
    mesh: &Mesh,
    semantic: Semantic,
    normalization: Normalization,
) -> DecodeResult<Option<FloatArray>> {
    mesh.extract(semantic, normalization)
}

/// Unpack `semantic` from `mesh` as typed values. `None` if the mesh has no such attribute.
pub fn extract_raw(mesh: &Mesh, semantic: Semantic) -> DecodeResult<Option<AttributeArray>> {
    mesh.extract_raw(semantic)
}

fn read_indices(
    reader: &mut Reader<'_>,
    format: IndexFormat,
    vertex_count: usize,
) -> DecodeResult<Vec<u32>> {
    let count_offset = reader.absolute_position();
    let count = reader.read_u32()? as usize;
    if count % 3 != 0 {
        return Err(DecodeError::corrupt(
            count_offset,
            format!("index count {count} is not a multiple of 3"),
        ));
    }

    let start = reader.absolute_position();
    let indices: Vec<u32> = match format {
        IndexFormat::U16 => reader
            .read_vec::<u16>(count)?
            .into_iter()
            .map(u32::from)
            .collect(),
        IndexFormat::U32 => reader.read_vec::<u32>(count)?,
    };

    if let Some(i) = indices.iter().position(|&index| index as usize >= vertex_count) {
        return Err(DecodeError::corrupt(
            start + i * format.size(),
            format!(
                "index {} references vertex {} of {vertex_count}",
                i, indices[i]
            ),
        ));
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Dtype;
    use crate::error::ErrorKind;
    use crate::testing::MeshBuilder;

    fn quad() -> MeshBuilder {
        MeshBuilder::new("Quad")
            .stride(12)
            .attribute(Semantic::Position, Dtype::Float32, 3, 0)
            .vertices_f32(&[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ])
            .indices_u16(&[0, 1, 2, 1, 3, 2])
    }

    #[test]
    fn decodes_triangles_in_source_winding() {
        let bytes = quad().build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();

        assert_eq!(mesh.name(), "Quad");
        assert_eq!(mesh.index_format(), IndexFormat::U16);
        assert_eq!(mesh.triangles().collect::<Vec<_>>(), vec![[0, 1, 2], [1, 3, 2]]);
        assert_eq!(mesh.material(), None);
    }

    #[test]
    fn pack_info_exposes_raw_buffer() {
        let bytes = quad().build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();
        let pack = mesh.pack_info();
        assert_eq!(pack.stride, 12);
        assert_eq!(pack.vertex_count, 4);
        assert_eq!(pack.bytes.len(), 48);
    }

    #[test]
    fn extracts_lazily_by_semantic() {
        let bytes = quad().build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();

        let positions = extract_attribute(&mesh, Semantic::Position, Normalization::BySemantic)
            .unwrap()
            .unwrap();
        assert_eq!(positions.row(3), Some(&[1.0, 1.0, 0.0][..]));
        assert!(mesh.extract_raw(Semantic::Normal).unwrap().is_none());
    }

    #[test]
    fn material_and_palette_are_kept() {
        let bytes = quad()
            .material("Skin")
            .palette(&["Hips", "Spine"])
            .build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(mesh.material(), Some("Skin"));
        assert_eq!(mesh.palette(), ["Hips", "Spine"]);
    }

    #[test]
    fn u32_indices() {
        let bytes = quad().indices_u32(&[3, 2, 1]).build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(mesh.index_format(), IndexFormat::U32);
        assert_eq!(mesh.indices(), &[3, 2, 1]);
    }

    #[test]
    fn partial_triangle_is_corrupt() {
        let bytes = quad().indices_u16(&[0, 1, 2, 3]).build();
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn index_past_vertex_count_is_corrupt() {
        let bytes = quad().indices_u16(&[0, 1, 4]).build();
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn unknown_index_type_is_corrupt() {
        let bytes = quad().index_type(7).build();
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn truncated_vertex_data_is_out_of_bounds() {
        let mut bytes = quad().build();
        // Cut inside the vertex buffer: name(2+4) + counts(10) + descriptor(5) + 20 bytes.
        bytes.truncate(2 + 4 + 10 + 5 + 20);
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn attribute_beyond_stride_fails_before_extraction() {
        let bytes = MeshBuilder::new("Broken")
            .stride(12)
            .attribute(Semantic::Position, Dtype::Float32, 3, 4)
            .raw_vertices(vec![0; 24], 2)
            .build();
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Layout);
    }

    #[test]
    fn zero_stride_with_vertices_is_layout_error() {
        // 26 bytes claiming four billion vertices.
        let bytes = MeshBuilder::new("Ghost")
            .stride(0)
            .raw_vertices(Vec::new(), u32::MAX)
            .build();
        let err = Mesh::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Layout);
    }

    #[test]
    fn zero_stride_without_vertices_is_an_empty_mesh() {
        let bytes = MeshBuilder::new("Empty").stride(0).build();
        let mesh = Mesh::read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.indices().is_empty());
    }
}
