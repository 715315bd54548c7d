//! Vertex attribute descriptors and interleaved layout validation.
//!
//! # Format
//!
//! Each descriptor is 5 bytes:
//!
//! - Byte 0: Semantic tag
//! - Byte 1: Scalar dtype tag
//! - Byte 2: Component count (1-4)
//! - Bytes 3-4: Byte offset within one vertex record (`u16`)

use std::fmt;

use crate::error::{DecodeError, DecodeResult};
use crate::reader::Reader;

/// Encoded size of one attribute descriptor.
pub const DESCRIPTOR_SIZE: usize = 5;

/// What an attribute means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    Binormal,
    Uv1,
    Uv2,
    Uv3,
    /// Present in shipped files, meaning unknown.
    Other,
    Color,
    /// Per-vertex bone indices into the mesh's matrix palette.
    Index,
    /// Per-vertex bone weights matching [`Semantic::Index`].
    Weight,
}

impl Semantic {
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Position,
            2 => Self::Normal,
            3 => Self::Tangent,
            4 => Self::Binormal,
            5 => Self::Uv1,
            6 => Self::Uv2,
            7 => Self::Uv3,
            8 => Self::Other,
            9 => Self::Color,
            10 => Self::Index,
            11 => Self::Weight,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Position => 1,
            Self::Normal => 2,
            Self::Tangent => 3,
            Self::Binormal => 4,
            Self::Uv1 => 5,
            Self::Uv2 => 6,
            Self::Uv3 => 7,
            Self::Other => 8,
            Self::Color => 9,
            Self::Index => 10,
            Self::Weight => 11,
        }
    }

    /// UV channel semantics in channel order.
    pub const UV_CHANNELS: [Self; 3] = [Self::Uv1, Self::Uv2, Self::Uv3];
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::Tangent => "tangent",
            Self::Binormal => "binormal",
            Self::Uv1 => "uv1",
            Self::Uv2 => "uv2",
            Self::Uv3 => "uv3",
            Self::Other => "other",
            Self::Color => "color",
            Self::Index => "index",
            Self::Weight => "weight",
        };
        f.write_str(name)
    }
}

/// Scalar storage type of an attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    UByte,
    SByte,
    UShort,
    SShort,
    UInt,
    SInt,
    Float32,
    Float16,
}

impl Dtype {
    /// Decode a dtype tag. Tags 7 and 9 are aliases of 6 and 8.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::UByte,
            1 => Self::SByte,
            2 => Self::UShort,
            3 => Self::SShort,
            4 => Self::UInt,
            5 => Self::SInt,
            6 | 7 => Self::Float32,
            8 | 9 => Self::Float16,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::UByte => 0,
            Self::SByte => 1,
            Self::UShort => 2,
            Self::SShort => 3,
            Self::UInt => 4,
            Self::SInt => 5,
            Self::Float32 => 6,
            Self::Float16 => 8,
        }
    }

    /// Width of one component in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::UByte | Self::SByte => 1,
            Self::UShort | Self::SShort | Self::Float16 => 2,
            Self::UInt | Self::SInt | Self::Float32 => 4,
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float16)
    }
}

/// Location and type of one attribute inside a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeDescriptor {
    pub semantic: Semantic,
    pub dtype: Dtype,
    /// Number of components, 1-4.
    pub components: u8,
    /// Byte offset from the start of the vertex record.
    pub offset: u16,
}

impl AttributeDescriptor {
    /// Size in bytes of the attribute within one record.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.components as usize * self.dtype.size()
    }

    /// Byte range covered within one record.
    #[must_use]
    pub const fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.size()
    }

    /// Check that the attribute fits inside a record of `stride` bytes.
    pub fn check_fits(&self, stride: usize) -> DecodeResult<()> {
        if self.range().end > stride {
            return Err(DecodeError::layout(format!(
                "{} attribute covers bytes {:?} but stride is {stride}",
                self.semantic,
                self.range()
            )));
        }
        Ok(())
    }

    /// Read one descriptor.
    pub fn read(reader: &mut Reader<'_>) -> DecodeResult<Self> {
        let offset = reader.absolute_position();
        let [semantic, dtype, components] = reader.read_array::<u8, 3>()?;
        let attribute_offset = reader.read_u16()?;

        let semantic = Semantic::from_tag(semantic).ok_or_else(|| {
            DecodeError::corrupt(offset, format!("unknown semantic tag {semantic}"))
        })?;
        let dtype = Dtype::from_tag(dtype).ok_or_else(|| {
            DecodeError::corrupt(offset + 1, format!("unknown dtype tag {dtype}"))
        })?;
        if !(1..=4).contains(&components) {
            return Err(DecodeError::corrupt(
                offset + 2,
                format!("{semantic} attribute has {components} components"),
            ));
        }

        Ok(Self {
            semantic,
            dtype,
            components,
            offset: attribute_offset,
        })
    }
}

/// Descriptor table plus stride for one interleaved vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    stride: usize,
    attributes: Vec<AttributeDescriptor>,
}

impl VertexLayout {
    /// Build a layout, rejecting attributes that overflow the stride or overlap.
    pub fn new(stride: usize, attributes: Vec<AttributeDescriptor>) -> DecodeResult<Self> {
        for attribute in &attributes {
            attribute.check_fits(stride)?;
        }

        let mut sorted: Vec<&AttributeDescriptor> = attributes.iter().collect();
        sorted.sort_by_key(|a| a.offset);
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.range().end > b.range().start {
                return Err(DecodeError::layout(format!(
                    "{} attribute {:?} overlaps {} attribute {:?}",
                    a.semantic,
                    a.range(),
                    b.semantic,
                    b.range()
                )));
            }
        }

        Ok(Self { stride, attributes })
    }

    /// Read `count` descriptors and validate them against `stride`.
    ///
    /// The whole table must be present before any descriptor is parsed.
    pub fn read(reader: &mut Reader<'_>, count: usize, stride: usize) -> DecodeResult<Self> {
        let mut table = reader.sub_reader(count * DESCRIPTOR_SIZE)?;
        let attributes = (0..count)
            .map(|_| AttributeDescriptor::read(&mut table))
            .collect::<DecodeResult<Vec<_>>>()?;
        Self::new(stride, attributes)
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// First attribute with the given semantic.
    #[must_use]
    pub fn find(&self, semantic: Semantic) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    #[must_use]
    pub fn has(&self, semantic: Semantic) -> bool {
        self.find(semantic).is_some()
    }
}
