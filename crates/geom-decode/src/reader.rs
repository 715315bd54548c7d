//! Bounds-checked little-endian cursor over a byte slice.

use crate::error::{DecodeError, DecodeResult};

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width little-endian value that can be read from a buffer.
pub trait Scalar: Copy + sealed::Sealed {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] little-endian bytes.
    ///
    /// Callers guarantee the slice length; a mismatch is a bug, not bad input.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const SIZE: usize = $size;

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; $size];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    f32 => 4,
    half::f16 => 2,
}

/// Sequential reader with absolute offsets for error reporting.
///
/// `pos` is always within `0..=data.len()`. A reader created with
/// [`Reader::sub_reader`] covers a window of its parent but reports
/// offsets relative to the outermost buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Cursor position relative to the start of this reader.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Cursor position relative to the outermost buffer.
    #[must_use]
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the cursor to `pos` (relative to this reader).
    pub fn seek(&mut self, pos: usize) -> DecodeResult<()> {
        if pos > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset: self.base,
                needed: pos,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    fn check(&self, needed: usize) -> DecodeResult<()> {
        if needed > self.remaining() {
            return Err(DecodeError::OutOfBounds {
                offset: self.absolute_position(),
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        self.check(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Split off a reader over the next `n` bytes and advance past them.
    pub fn sub_reader(&mut self, n: usize) -> DecodeResult<Reader<'a>> {
        let base = self.absolute_position();
        let data = self.read_bytes(n)?;
        Ok(Reader { data, pos: 0, base })
    }

    pub fn read<T: Scalar>(&mut self) -> DecodeResult<T> {
        self.read_bytes(T::SIZE).map(T::from_le_slice)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.read()
    }

    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.read()
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        self.read()
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.read()
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        self.read()
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        self.read()
    }

    /// Read an IEEE-754 half and widen it to `f32`.
    pub fn read_f16(&mut self) -> DecodeResult<f32> {
        self.read::<half::f16>().map(half::f16::to_f32)
    }

    /// Read `N` consecutive values.
    pub fn read_array<T: Scalar, const N: usize>(&mut self) -> DecodeResult<[T; N]> {
        let bytes = self.read_bytes(N * T::SIZE)?;
        Ok(std::array::from_fn(|i| {
            T::from_le_slice(&bytes[i * T::SIZE..(i + 1) * T::SIZE])
        }))
    }

    /// Read `count` consecutive values.
    pub fn read_vec<T: Scalar>(&mut self, count: usize) -> DecodeResult<Vec<T>> {
        let Some(byte_len) = count.checked_mul(T::SIZE) else {
            return Err(DecodeError::OutOfBounds {
                offset: self.absolute_position(),
                needed: usize::MAX,
                available: self.remaining(),
            });
        };
        let bytes = self.read_bytes(byte_len)?;
        Ok(bytes.chunks_exact(T::SIZE).map(T::from_le_slice).collect())
    }

    /// Read a `u16` length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let offset = self.absolute_position();
        let len = usize::from(self.read_u16()?);
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| DecodeError::corrupt(offset, format!("string is not valid UTF-8: {e}")))
    }
}
