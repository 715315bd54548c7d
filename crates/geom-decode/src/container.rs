//! Top-level container decoding.
//!
//! # Format
//!
//! ```text
//! version       u32 (must be 316)
//! section_count u32
//! sections      section_count x { tag [u8; 4], length u32, payload [u8; length] }
//! ```
//!
//! Section tags:
//!
//! - `SKEL`: the skeleton (at most one; an absent skeleton is empty)
//! - `MATL`: one material
//! - `MESH`: one mesh
//! - `IBPM`: stored inverse bind matrices (at most one), one per bone
//!
//! Every payload must be consumed exactly by its decoder, and nothing may
//! follow the last section.

use glam::Mat4;

use crate::error::{DecodeError, DecodeResult, SectionTag};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::reader::Reader;
use crate::skeleton::{self, Skeleton};

/// The only container version this crate reads.
pub const CONTAINER_VERSION: u32 = 316;

/// Tolerance used when checking stored inverse bind matrices during decode.
pub const INVERSE_BIND_TOLERANCE: f32 = 1e-3;

/// A fully decoded model file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    skeleton: Skeleton,
    materials: Vec<Material>,
    meshes: Vec<Mesh>,
    inverse_bind_matrices: Option<Vec<Mat4>>,
}

impl Container {
    #[must_use]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// First material called `name`.
    #[must_use]
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name() == name)
    }

    /// First mesh called `name`.
    #[must_use]
    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name() == name)
    }

    /// Resolve a mesh's material reference.
    ///
    /// A reference to a material the container does not hold resolves to
    /// `None` and logs a warning.
    #[must_use]
    pub fn mesh_material(&self, mesh: &Mesh) -> Option<&Material> {
        let name = mesh.material()?;
        let material = self.material(name);
        if material.is_none() {
            tracing::warn!(
                "Mesh '{}' references missing material '{}'",
                mesh.name(),
                name
            );
        }
        material
    }

    /// Inverse bind matrices as stored in the file, if present.
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> Option<&[Mat4]> {
        self.inverse_bind_matrices.as_deref()
    }

    /// Bones whose stored inverse bind matrix differs from the one computed
    /// from the skeleton by more than `tolerance` in any element.
    ///
    /// Empty when the file stores no inverse bind matrices.
    #[must_use]
    pub fn inverse_bind_mismatches(&self, tolerance: f32) -> Vec<usize> {
        let Some(stored) = &self.inverse_bind_matrices else {
            return Vec::new();
        };
        stored
            .iter()
            .zip(self.skeleton.inverse_bind_matrices())
            .enumerate()
            .filter(|(_, (stored, computed))| !stored.abs_diff_eq(*computed, tolerance))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Where an inverse bind pose section was found, for late error reporting.
struct IbpmSection {
    index: usize,
    offset: usize,
    matrices: Vec<Mat4>,
}

/// Decode a whole container from memory.
///
/// # Errors
///
/// Fails on the first malformed section; errors raised inside a section are
/// wrapped in [`DecodeError::Section`] with its tag, index and payload offset.
pub fn decode_container(bytes: &[u8]) -> DecodeResult<Container> {
    let mut reader = Reader::new(bytes);
    let header = |e: DecodeError| e.in_section(SectionTag::Header, 0, 0);

    let version = reader.read_u32().map_err(header)?;
    if version != CONTAINER_VERSION {
        return Err(header(DecodeError::corrupt(
            0,
            format!("unsupported container version {version}, expected {CONTAINER_VERSION}"),
        )));
    }
    let section_count = reader.read_u32().map_err(header)? as usize;

    let mut skeleton: Option<Skeleton> = None;
    let mut ibpm: Option<IbpmSection> = None;
    let mut materials = Vec::new();
    let mut meshes = Vec::new();

    for index in 0..section_count {
        let header_offset = reader.absolute_position();
        let framing = |e: DecodeError| e.in_section(SectionTag::Header, index, header_offset);

        let fourcc: [u8; 4] = reader.read_array().map_err(framing)?;
        let section = SectionTag::from_fourcc(fourcc).ok_or_else(|| {
            framing(DecodeError::corrupt(
                header_offset,
                format!("unknown section tag {:?}", String::from_utf8_lossy(&fourcc)),
            ))
        })?;
        let length = reader.read_u32().map_err(framing)? as usize;

        let offset = reader.absolute_position();
        let in_section = |e: DecodeError| e.in_section(section, index, offset);
        let mut payload = reader.sub_reader(length).map_err(in_section)?;

        match section {
            SectionTag::Skeleton => {
                if skeleton.is_some() {
                    return Err(in_section(DecodeError::corrupt(offset, "second skeleton section")));
                }
                skeleton = Some(Skeleton::read(&mut payload).map_err(in_section)?);
            }
            SectionTag::Material => {
                materials.push(Material::read(&mut payload).map_err(in_section)?);
            }
            SectionTag::Mesh => {
                meshes.push(Mesh::read(&mut payload).map_err(in_section)?);
            }
            SectionTag::InverseBindPoses => {
                if ibpm.is_some() {
                    return Err(in_section(DecodeError::corrupt(
                        offset,
                        "second inverse bind pose section",
                    )));
                }
                let matrices =
                    skeleton::read_inverse_bind_matrices(&mut payload).map_err(in_section)?;
                ibpm = Some(IbpmSection {
                    index,
                    offset,
                    matrices,
                });
            }
            SectionTag::Header => {
                return Err(framing(DecodeError::corrupt(
                    header_offset,
                    "header tag in section table",
                )));
            }
        }

        if payload.remaining() != 0 {
            return Err(in_section(DecodeError::corrupt(
                payload.absolute_position(),
                format!("{} unread bytes at end of section", payload.remaining()),
            )));
        }
    }

    if reader.remaining() != 0 {
        return Err(header(DecodeError::corrupt(
            reader.absolute_position(),
            format!("{} bytes after the last section", reader.remaining()),
        )));
    }

    let skeleton = skeleton.unwrap_or_default();
    let inverse_bind_matrices = match ibpm {
        Some(section) if section.matrices.len() != skeleton.len() => {
            return Err(DecodeError::corrupt(
                section.offset,
                format!(
                    "{} inverse bind matrices for {} bones",
                    section.matrices.len(),
                    skeleton.len()
                ),
            )
            .in_section(SectionTag::InverseBindPoses, section.index, section.offset));
        }
        Some(section) => Some(section.matrices),
        None => None,
    };

    let container = Container {
        skeleton,
        materials,
        meshes,
        inverse_bind_matrices,
    };

    let mismatches = container.inverse_bind_mismatches(INVERSE_BIND_TOLERANCE);
    if !mismatches.is_empty() {
        tracing::warn!(
            "{} stored inverse bind matrices disagree with the skeleton (first: bone {})",
            mismatches.len(),
            mismatches[0]
        );
    }

    tracing::debug!(
        "Decoded container: {} bones, {} materials, {} meshes",
        container.skeleton.len(),
        container.materials.len(),
        container.meshes.len()
    );

    Ok(container)
}
