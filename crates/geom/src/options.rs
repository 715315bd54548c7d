//! Import configuration.

use geom_decode::{CoordinateRemap, Normalization};

/// How decoded geometry is converted for a host.
///
/// The default remaps engine Y-up space to Z-up, normalizes colors and
/// weights, and derives normals for meshes that store none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Applied to positions, normals, tangents and bind matrices alike.
    pub remap: CoordinateRemap,
    pub normalization: Normalization,
    /// Compute area-weighted normals when a mesh has no normal attribute.
    pub derive_normals: bool,
    /// Generate MikkTSpace tangents when a mesh has no tangent attribute.
    ///
    /// Needs normals (stored or derived) and a first UV channel.
    pub derive_tangents: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            remap: CoordinateRemap::z_up(),
            normalization: Normalization::default(),
            derive_normals: true,
            derive_tangents: false,
        }
    }
}

impl ImportOptions {
    /// Keep engine space and only read what the file stores.
    #[must_use]
    pub fn raw() -> Self {
        Self {
            remap: CoordinateRemap::IDENTITY,
            normalization: Normalization::default(),
            derive_normals: false,
            derive_tangents: false,
        }
    }

    #[must_use]
    pub fn with_remap(mut self, remap: CoordinateRemap) -> Self {
        self.remap = remap;
        self
    }

    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    #[must_use]
    pub fn with_derived_normals(mut self, derive: bool) -> Self {
        self.derive_normals = derive;
        self
    }

    #[must_use]
    pub fn with_derived_tangents(mut self, derive: bool) -> Self {
        self.derive_tangents = derive;
        self
    }
}
