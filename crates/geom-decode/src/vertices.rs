//! Interleaved vertex buffer unpacking.
//!
//! [`extract`] pulls one attribute out of a packed buffer as typed values.
//! Normalization is a separate step ([`AttributeArray::to_f32`]) because the
//! right policy depends on the semantic: bone indices must stay raw while
//! colors and weights are stored as normalized integers.

use glam::{Vec2, Vec3, Vec4};
use half::f16;

use crate::attributes::{AttributeDescriptor, Dtype, Semantic};
use crate::error::{DecodeError, DecodeResult};
use crate::reader::Scalar;

/// Typed values of one attribute, `components` per vertex, vertex-major.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    UByte(Vec<u8>),
    SByte(Vec<i8>),
    UShort(Vec<u16>),
    SShort(Vec<i16>),
    UInt(Vec<u32>),
    SInt(Vec<i32>),
    Float32(Vec<f32>),
    Float16(Vec<f16>),
}

impl AttributeData {
    /// Total number of scalar values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::UByte(v) => v.len(),
            Self::SByte(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::SShort(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::SInt(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float16(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::UByte(_) => Dtype::UByte,
            Self::SByte(_) => Dtype::SByte,
            Self::UShort(_) => Dtype::UShort,
            Self::SShort(_) => Dtype::SShort,
            Self::UInt(_) => Dtype::UInt,
            Self::SInt(_) => Dtype::SInt,
            Self::Float32(_) => Dtype::Float32,
            Self::Float16(_) => Dtype::Float16,
        }
    }

    /// Integer values as `u32`, or `None` for float or signed data.
    ///
    /// Used for bone palette indices, which are never normalized.
    #[must_use]
    pub fn to_u32(&self) -> Option<Vec<u32>> {
        match self {
            Self::UByte(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            Self::UShort(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            Self::UInt(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// How integer attribute values become floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Integers are converted unchanged (`255u8` becomes `255.0`).
    Raw,
    /// Unsigned integers map to `[0, 1]`, signed integers to `[-1, 1]`.
    Unorm,
    /// Colors and weights are normalized, everything else is raw.
    #[default]
    BySemantic,
}

impl Normalization {
    /// Whether values of `semantic` should be normalized under this policy.
    #[must_use]
    pub fn applies_to(self, semantic: Semantic) -> bool {
        match self {
            Self::Raw => false,
            Self::Unorm => true,
            Self::BySemantic => matches!(semantic, Semantic::Color | Semantic::Weight),
        }
    }
}

/// One extracted attribute: typed values plus the component count.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeArray {
    semantic: Semantic,
    components: usize,
    data: AttributeData,
}

impl AttributeArray {
    #[must_use]
    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    #[must_use]
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> AttributeData {
        self.data
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.components
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert to floats, normalizing according to `normalization`.
    #[must_use]
    pub fn to_f32(&self, normalization: Normalization) -> FloatArray {
        let unorm = normalization.applies_to(self.semantic);
        let values = match &self.data {
            AttributeData::UByte(v) => convert(v, unorm, |x| f32::from(x), f32::from(u8::MAX)),
            AttributeData::SByte(v) => convert(v, unorm, |x| f32::from(x), f32::from(i8::MAX)),
            AttributeData::UShort(v) => convert(v, unorm, |x| f32::from(x), f32::from(u16::MAX)),
            AttributeData::SShort(v) => convert(v, unorm, |x| f32::from(x), f32::from(i16::MAX)),
            AttributeData::UInt(v) => convert(v, unorm, |x| x as f32, u32::MAX as f32),
            AttributeData::SInt(v) => convert(v, unorm, |x| x as f32, i32::MAX as f32),
            AttributeData::Float32(v) => v.clone(),
            AttributeData::Float16(v) => v.iter().map(|x| x.to_f32()).collect(),
        };
        FloatArray {
            components: self.components,
            values,
        }
    }
}

fn convert<T: Copy>(values: &[T], unorm: bool, widen: impl Fn(T) -> f32, max: f32) -> Vec<f32> {
    if unorm {
        // Signed minimums (-128, -32768) clamp to -1.
        values.iter().map(|&x| (widen(x) / max).max(-1.0)).collect()
    } else {
        values.iter().map(|&x| widen(x)).collect()
    }
}

/// Float attribute values, `components` per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatArray {
    components: usize,
    values: Vec<f32>,
}

impl FloatArray {
    #[must_use]
    pub fn new(components: usize, values: Vec<f32>) -> Self {
        Self { components, values }
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Flat values, vertex-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Per-vertex slices of `components` values.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> {
        self.values.chunks_exact(self.components.max(1))
    }

    #[must_use]
    pub fn row(&self, vertex: usize) -> Option<&[f32]> {
        let start = vertex.checked_mul(self.components)?;
        self.values.get(start..start + self.components)
    }

    /// Rows as `Vec2`, missing components filled with zero.
    #[must_use]
    pub fn to_vec2(&self) -> Vec<Vec2> {
        self.rows().map(|r| Vec2::from_slice(&padded::<2>(r, 0.0))).collect()
    }

    /// Rows as `Vec3`, missing components filled with zero.
    #[must_use]
    pub fn to_vec3(&self) -> Vec<Vec3> {
        self.rows().map(|r| Vec3::from_slice(&padded::<3>(r, 0.0))).collect()
    }

    /// Rows as `Vec4`, missing x/y/z filled with zero and a missing w with `w`.
    #[must_use]
    pub fn to_vec4(&self, w: f32) -> Vec<Vec4> {
        self.rows()
            .map(|r| {
                let mut out = padded::<4>(r, 0.0);
                if r.len() < 4 {
                    out[3] = w;
                }
                Vec4::from_array(out)
            })
            .collect()
    }
}

fn padded<const N: usize>(row: &[f32], fill: f32) -> [f32; N] {
    std::array::from_fn(|i| row.get(i).copied().unwrap_or(fill))
}

/// Extract one attribute from an interleaved buffer.
///
/// # Arguments
///
/// * `packed` - `vertex_count` records of `stride` bytes each
/// * `stride` - Size of one vertex record in bytes
/// * `vertex_count` - Number of records
/// * `descriptor` - Which bytes of each record to read, and as what type
///
/// # Errors
///
/// [`DecodeError::Layout`] if `packed.len() != stride * vertex_count` or the
/// descriptor does not fit inside the stride.
pub fn extract(
    packed: &[u8],
    stride: usize,
    vertex_count: usize,
    descriptor: &AttributeDescriptor,
) -> DecodeResult<AttributeArray> {
    let expected = stride.checked_mul(vertex_count).ok_or_else(|| {
        DecodeError::layout(format!("{vertex_count} vertices of {stride} bytes overflow"))
    })?;
    if packed.len() != expected {
        return Err(DecodeError::layout(format!(
            "vertex buffer is {} bytes, expected {vertex_count} x {stride} = {expected}",
            packed.len()
        )));
    }
    descriptor.check_fits(stride)?;

    let data = match descriptor.dtype {
        Dtype::UByte => AttributeData::UByte(gather(packed, stride, descriptor)),
        Dtype::SByte => AttributeData::SByte(gather(packed, stride, descriptor)),
        Dtype::UShort => AttributeData::UShort(gather(packed, stride, descriptor)),
        Dtype::SShort => AttributeData::SShort(gather(packed, stride, descriptor)),
        Dtype::UInt => AttributeData::UInt(gather(packed, stride, descriptor)),
        Dtype::SInt => AttributeData::SInt(gather(packed, stride, descriptor)),
        Dtype::Float32 => AttributeData::Float32(gather(packed, stride, descriptor)),
        Dtype::Float16 => AttributeData::Float16(gather(packed, stride, descriptor)),
    };

    Ok(AttributeArray {
        semantic: descriptor.semantic,
        components: usize::from(descriptor.components),
        data,
    })
}

/// Read `descriptor.components` values of `T` from every record.
///
/// `stride` is non-zero here: the descriptor fits and is at least one byte.
fn gather<T: Scalar>(packed: &[u8], stride: usize, descriptor: &AttributeDescriptor) -> Vec<T> {
    let range = descriptor.range();
    packed
        .chunks_exact(stride)
        .flat_map(|record| record[range.clone()].chunks_exact(T::SIZE).map(T::from_le_slice))
        .collect()
}
