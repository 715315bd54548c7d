//! Decode skeletons, meshes and materials from geom model containers.
//!
//! This crate provides pure synchronous decoding of the binary container
//! format. Everything operates on an in-memory buffer; loading files and
//! handing geometry to a host is left to the caller.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Lazy vertex unpacking**: Meshes keep their packed buffer; attributes
//!   are extracted on request
//! - **Fail fast**: Malformed input is an error, never a partial container
//!
//! # Key functions
//!
//! - [`decode_container`]: Parse a whole container
//! - [`extract_attribute`]: Unpack one vertex attribute as floats
//! - [`Skeleton::resolve_bind_pose`]: Bone heads, tails and global matrices
//! - [`name_hash`]: CRC-32 name hash used by the format

mod error;
mod hash;

pub mod attributes;
pub mod container;
pub mod material;
pub mod mesh;
pub mod reader;
pub mod skeleton;
pub mod transform;
pub mod vertices;

#[cfg(any(test, feature = "test-tools"))]
pub mod testing;

pub use attributes::{AttributeDescriptor, Dtype, Semantic, VertexLayout};
pub use container::{CONTAINER_VERSION, Container, decode_container};
pub use error::{DecodeError, DecodeResult, ErrorKind, SectionTag};
pub use hash::name_hash;
pub use material::{Material, ShaderName, ShaderNameError, Uniform, UniformKind, UniformValue};
pub use mesh::{IndexFormat, Mesh, PackInfo, extract_attribute, extract_raw};
pub use reader::Reader;
pub use skeleton::{BindPose, Bone, BonePose, LocalTransform, Skeleton};
pub use transform::CoordinateRemap;
pub use vertices::{AttributeArray, AttributeData, FloatArray, Normalization};
