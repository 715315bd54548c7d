//! Error types for container decoding.

use std::fmt;

/// Result alias used throughout the crate.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Broad classification of a [`DecodeError`], ignoring section context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A read would have run past the end of the buffer.
    OutOfBounds,
    /// Stride, offsets or buffer sizes disagree with each other.
    Layout,
    /// The bytes are well-sized but describe something impossible.
    CorruptData,
}

/// Container section in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionTag {
    Header,
    Skeleton,
    Material,
    Mesh,
    InverseBindPoses,
}

impl SectionTag {
    /// The four ASCII bytes that introduce this section in a container.
    #[must_use]
    pub const fn fourcc(self) -> [u8; 4] {
        match self {
            Self::Header => *b"HEAD",
            Self::Skeleton => *b"SKEL",
            Self::Material => *b"MATL",
            Self::Mesh => *b"MESH",
            Self::InverseBindPoses => *b"IBPM",
        }
    }

    /// Look up a section by its four-byte tag.
    #[must_use]
    pub fn from_fourcc(tag: [u8; 4]) -> Option<Self> {
        match &tag {
            b"SKEL" => Some(Self::Skeleton),
            b"MATL" => Some(Self::Material),
            b"MESH" => Some(Self::Mesh),
            b"IBPM" => Some(Self::InverseBindPoses),
            _ => None,
        }
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Header => "header",
            Self::Skeleton => "skeleton",
            Self::Material => "material",
            Self::Mesh => "mesh",
            Self::InverseBindPoses => "inverse bind pose",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while decoding a container.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// A read of `needed` bytes at `offset` would exceed the buffer.
    #[error(
        "read of {needed} bytes at offset {offset:#x} exceeds buffer ({available} bytes available)"
    )]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Vertex layout is inconsistent.
    #[error("vertex layout error: {0}")]
    Layout(String),

    /// Data at `offset` is malformed.
    #[error("corrupt data at offset {offset:#x}: {reason}")]
    CorruptData { offset: usize, reason: String },

    /// Wraps an error with the section it came from.
    #[error("in {section} section #{index} (payload at {offset:#x}): {source}")]
    Section {
        section: SectionTag,
        index: usize,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn layout(reason: impl Into<String>) -> Self {
        Self::Layout(reason.into())
    }

    pub(crate) fn in_section(self, section: SectionTag, index: usize, offset: usize) -> Self {
        Self::Section {
            section,
            index,
            offset,
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through any section context.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::Layout(_) => ErrorKind::Layout,
            Self::CorruptData { .. } => ErrorKind::CorruptData,
            Self::Section { source, .. } => source.kind(),
        }
    }

    /// The innermost section this error was raised in, if any.
    #[must_use]
    pub fn section(&self) -> Option<SectionTag> {
        match self {
            Self::Section { section, .. } => Some(*section),
            _ => None,
        }
    }
}
