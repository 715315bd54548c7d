//! Material records.
//!
//! # Format
//!
//! ```text
//! name          string
//! uniform_count u8
//! uniforms      uniform_count x { parameter string, kind u8, value string }
//! shader_count  u8
//! shaders       shader_count x 14 x u32
//! ```
//!
//! Uniform kinds: 0 = texture (value names a texture asset), 1 = scalar
//! (value is a decimal number), 2 = other (value kept verbatim).

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, DecodeResult};
use crate::hash::name_hash;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Texture,
    Scalar,
    Other,
}

impl UniformKind {
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Texture),
            1 => Some(Self::Scalar),
            2 => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Texture => 0,
            Self::Scalar => 1,
            Self::Other => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Texture asset name, without extension.
    Texture(String),
    Scalar(f32),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub parameter: String,
    pub value: UniformValue,
}

impl Uniform {
    #[must_use]
    pub fn kind(&self) -> UniformKind {
        match self.value {
            UniformValue::Texture(_) => UniformKind::Texture,
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Other(_) => UniformKind::Other,
        }
    }

    fn read(reader: &mut Reader<'_>) -> DecodeResult<Self> {
        let parameter = reader.read_string()?;

        let kind_offset = reader.absolute_position();
        let tag = reader.read_u8()?;
        let kind = UniformKind::from_tag(tag).ok_or_else(|| {
            DecodeError::corrupt(
                kind_offset,
                format!("uniform '{parameter}' has unknown kind {tag}"),
            )
        })?;

        let value_offset = reader.absolute_position();
        let raw = reader.read_string()?;
        let value = match kind {
            UniformKind::Texture => UniformValue::Texture(raw),
            UniformKind::Scalar => UniformValue::Scalar(raw.trim().parse().map_err(|_| {
                DecodeError::corrupt(
                    value_offset,
                    format!("scalar uniform '{parameter}' has value '{raw}'"),
                )
            })?),
            UniformKind::Other => UniformValue::Other(raw),
        };

        Ok(Self { parameter, value })
    }
}

/// Number of 32-bit words in a shader name.
pub const SHADER_NAME_WORDS: usize = 14;

const ALPHABET: &[u8; 46] = b"0123456789abcdefghijklmnopqrstuvwxyz#$[]{}+@=&";
const DIGITS_PER_WORD: usize = 6;

/// A shader identifier stored as 14 words of base-46 text.
///
/// Displayed as six characters per word, with `_` before words 3, 6, 9, 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderName(pub [u32; SHADER_NAME_WORDS]);

impl ShaderName {
    #[must_use]
    pub fn words(&self) -> &[u32; SHADER_NAME_WORDS] {
        &self.0
    }
}

impl fmt::Display for ShaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &word) in self.0.iter().enumerate() {
            if i != 0 && i % 3 == 0 {
                f.write_str("_")?;
            }
            let mut digits = [ALPHABET[0]; DIGITS_PER_WORD];
            let mut value = word;
            for digit in digits.iter_mut().rev() {
                *digit = ALPHABET[(value % 46) as usize];
                value /= 46;
            }
            // Every u32 fits in six base-46 digits.
            for &digit in &digits {
                write!(f, "{}", char::from(digit))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderNameError {
    #[error(
        "shader name has {0} characters, expected {expected}",
        expected = SHADER_NAME_WORDS * DIGITS_PER_WORD
    )]
    Length(usize),
    #[error("'{0}' is not a shader name character")]
    Character(char),
    #[error("shader name word '{0}' does not fit in 32 bits")]
    Overflow(String),
}

impl FromStr for ShaderName {
    type Err = ShaderNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean: Vec<char> = s.chars().filter(|&c| c != '_').collect();
        if clean.len() != SHADER_NAME_WORDS * DIGITS_PER_WORD {
            return Err(ShaderNameError::Length(clean.len()));
        }

        let mut words = [0u32; SHADER_NAME_WORDS];
        for (word, chunk) in words.iter_mut().zip(clean.chunks_exact(DIGITS_PER_WORD)) {
            let mut value = 0u32;
            for &c in chunk {
                let digit = ALPHABET
                    .iter()
                    .position(|&a| char::from(a) == c)
                    .ok_or(ShaderNameError::Character(c))?;
                value = value
                    .checked_mul(46)
                    .and_then(|v| v.checked_add(digit as u32))
                    .ok_or_else(|| ShaderNameError::Overflow(chunk.iter().collect()))?;
            }
            *word = value;
        }
        Ok(Self(words))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    uniforms: Vec<Uniform>,
    shaders: Vec<ShaderName>,
}

impl Material {
    /// Read one material record.
    pub fn read(reader: &mut Reader<'_>) -> DecodeResult<Self> {
        let name = reader.read_string()?;

        let uniform_count = usize::from(reader.read_u8()?);
        let uniforms = (0..uniform_count)
            .map(|_| Uniform::read(reader))
            .collect::<DecodeResult<Vec<_>>>()?;

        let shader_count = usize::from(reader.read_u8()?);
        let shaders = (0..shader_count)
            .map(|_| reader.read_array().map(ShaderName))
            .collect::<DecodeResult<Vec<_>>>()?;

        tracing::debug!(
            "Decoded material '{}': {} uniforms, {} shaders",
            name,
            uniforms.len(),
            shaders.len()
        );

        Ok(Self {
            name,
            uniforms,
            shaders,
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
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    #[must_use]
    pub fn uniform(&self, parameter: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|u| u.parameter == parameter)
    }

    /// `(parameter, texture)` pairs for texture uniforms.
    pub fn textures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.uniforms.iter().filter_map(|u| match &u.value {
            UniformValue::Texture(texture) => Some((u.parameter.as_str(), texture.as_str())),
            _ => None,
        })
    }

    #[must_use]
    pub fn shaders(&self) -> &[ShaderName] {
        &self.shaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::MaterialBuilder;

    #[test]
    fn decodes_uniforms_by_kind() {
        let bytes = MaterialBuilder::new("Body")
            .uniform("DiffuseColor", UniformKind::Texture, "chr001_body_d")
            .uniform("Roughness", UniformKind::Scalar, "0.75")
            .uniform("BlendMode", UniformKind::Other, "opaque")
            .build();
        let material = Material::read(&mut Reader::new(&bytes)).unwrap();

        assert_eq!(material.name(), "Body");
        assert_eq!(
            material.uniform("Roughness").unwrap().value,
            UniformValue::Scalar(0.75)
        );
        assert_eq!(material.uniform("BlendMode").unwrap().kind(), UniformKind::Other);
        assert_eq!(
            material.textures().collect::<Vec<_>>(),
            vec![("DiffuseColor", "chr001_body_d")]
        );
    }

    #[test]
    fn unknown_uniform_kind_is_corrupt() {
        let mut bytes = MaterialBuilder::new("M")
            .uniform("P", UniformKind::Texture, "t")
            .build();
        // name(2+1) + count(1) + parameter(2+1) then the kind byte.
        bytes[7] = 9;
        let err = Material::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn unparseable_scalar_is_corrupt() {
        let bytes = MaterialBuilder::new("M")
            .uniform("Gloss", UniformKind::Scalar, "shiny")
            .build();
        let err = Material::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn shader_names_encode_base46() {
        let mut words = [0u32; SHADER_NAME_WORDS];
        words[0] = 45;
        words[1] = 46;
        words[13] = u32::MAX;
        let name = ShaderName(words).to_string();

        assert_eq!(name.len(), SHADER_NAME_WORDS * DIGITS_PER_WORD + 4);
        assert!(name.starts_with("00000&000010000000_"), "{name}");
        assert_eq!(name.parse::<ShaderName>().unwrap(), ShaderName(words));
    }

    #[test]
    fn shader_name_parse_rejects_bad_input() {
        assert_eq!(
            "abc".parse::<ShaderName>().unwrap_err(),
            ShaderNameError::Length(3)
        );

        let bad_char = "!".repeat(SHADER_NAME_WORDS * DIGITS_PER_WORD);
        assert_eq!(
            bad_char.parse::<ShaderName>().unwrap_err(),
            ShaderNameError::Character('!')
        );

        let overflow = "&".repeat(SHADER_NAME_WORDS * DIGITS_PER_WORD);
        assert!(matches!(
            overflow.parse::<ShaderName>().unwrap_err(),
            ShaderNameError::Overflow(_)
        ));
    }

    #[test]
    fn shaders_are_read_after_uniforms() {
        let words = [7u32; SHADER_NAME_WORDS];
        let bytes = MaterialBuilder::new("M").shader(words).build();
        let material = Material::read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(material.shaders(), &[ShaderName(words)]);
    }
}
