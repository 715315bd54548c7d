//! Coordinate-space remapping for positions, directions and matrices.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Mat4, Vec3, Vec4};

/// A fixed affine transform applied consistently to decoded geometry.
///
/// Positions get the full transform, normals and tangents only the upper
/// 3x3 (then re-normalized), bind matrices are pre-multiplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateRemap {
    matrix: Mat4,
    rotation: Mat3,
}

impl Default for CoordinateRemap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CoordinateRemap {
    /// Leaves everything in engine space.
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
        rotation: Mat3::IDENTITY,
    };

    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            matrix,
            rotation: Mat3::from_mat4(matrix),
        }
    }

    /// Engine Y-up to Z-up: rotate +90 degrees about X.
    #[must_use]
    pub fn z_up() -> Self {
        Self::from_matrix(Mat4::from_rotation_x(FRAC_PI_2))
    }

    /// Z-up back to engine Y-up: rotate -90 degrees about X.
    #[must_use]
    pub fn y_up() -> Self {
        Self::from_matrix(Mat4::from_rotation_x(-FRAC_PI_2))
    }

    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.matrix == Mat4::IDENTITY
    }

    /// `R * p + t`.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    /// `normalize(R * n)`. Zero-length input stays zero.
    #[must_use]
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        (self.rotation * normal).normalize_or_zero()
    }

    /// Rotates `xyz` like a normal; `w` (bitangent sign) passes through.
    #[must_use]
    pub fn transform_tangent(&self, tangent: Vec4) -> Vec4 {
        self.transform_normal(tangent.truncate()).extend(tangent.w)
    }

    /// `M * matrix`.
    #[must_use]
    pub fn transform_matrix(&self, matrix: Mat4) -> Mat4 {
        self.matrix * matrix
    }

    pub fn transform_points(&self, points: &mut [Vec3]) {
        if self.is_identity() {
            return;
        }
        for p in points {
            *p = self.transform_point(*p);
        }
    }

    pub fn transform_normals(&self, normals: &mut [Vec3]) {
        for n in normals {
            *n = self.transform_normal(*n);
        }
    }

    pub fn transform_tangents(&self, tangents: &mut [Vec4]) {
        for t in tangents {
            *t = self.transform_tangent(*t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn z_up_sends_y_to_z() {
        let remap = CoordinateRemap::z_up();
        assert!(remap.transform_point(Vec3::Y).abs_diff_eq(Vec3::Z, EPS));
        assert!(remap.transform_point(Vec3::Z).abs_diff_eq(-Vec3::Y, EPS));

        let back = CoordinateRemap::y_up();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(back.transform_point(remap.transform_point(p)).abs_diff_eq(p, 1e-5));
    }

    #[test]
    fn points_get_translation_but_normals_do_not() {
        let remap = CoordinateRemap::from_matrix(Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(10.0, 0.0, 0.0),
        ));
        assert_eq!(remap.transform_point(Vec3::X), Vec3::new(12.0, 0.0, 0.0));
        // Scale is removed by re-normalization.
        assert!(remap.transform_normal(Vec3::X).abs_diff_eq(Vec3::X, EPS));
    }

    #[test]
    fn tangent_sign_passes_through() {
        let remap = CoordinateRemap::z_up();
        let t = remap.transform_tangent(Vec4::new(0.0, 1.0, 0.0, -1.0));
        assert!(t.truncate().abs_diff_eq(Vec3::Z, EPS));
        assert_eq!(t.w, -1.0);
    }

    #[test]
    fn zero_normals_stay_zero() {
        assert_eq!(CoordinateRemap::z_up().transform_normal(Vec3::ZERO), Vec3::ZERO);
    }
}
