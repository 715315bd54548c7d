//! Bone hierarchy decoding and bind-pose resolution.
//!
//! # Format
//!
//! ```text
//! bone_count u32
//! bones      bone_count x {
//!     name         string
//!     parent_index i32 (-1 = root)
//!     position     3 x f32
//!     quaternion   4 x f32 (x, y, z, w)
//!     scale        3 x f32
//! }
//! ```
//!
//! Bones live in a flat arena and refer to their parent by index. Parents may
//! be stored after their children; the resolution order is computed once at
//! decode time, which is also where parent cycles are rejected.

use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::error::{DecodeError, DecodeResult};
use crate::hash::name_hash;
use crate::reader::Reader;
use crate::transform::CoordinateRemap;

/// Direction leaf bones point in, in remapped space.
pub const LEAF_AXIS: Vec3 = Vec3::Z;

/// Leaf length used when no bone has children to measure.
pub const FALLBACK_BONE_LENGTH: f32 = 0.1;

/// Shortest tail offset given to a bone whose tail collapsed onto its head.
pub const MIN_BONE_LENGTH: f32 = 1e-3;

/// Tails closer than this to their head count as collapsed.
const DEGENERATE_LENGTH: f32 = 1e-5;

/// Parent-relative bind transform of a bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    /// Stored as (x, y, z, w).
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// `T(translation) * R(rotation) * S(scale)`.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone in the same skeleton.
    pub parent: Option<usize>,
    pub local: LocalTransform,
}

impl Bone {
    #[must_use]
    pub fn name_hash(&self) -> u32 {
        name_hash(&self.name)
    }

    fn read(reader: &mut Reader<'_>, bone_count: usize) -> DecodeResult<Self> {
        let name = reader.read_string()?;

        let parent_offset = reader.absolute_position();
        let parent = match reader.read_i32()? {
            -1 => None,
            index if index >= 0 && (index as usize) < bone_count => Some(index as usize),
            index => {
                return Err(DecodeError::corrupt(
                    parent_offset,
                    format!("bone '{name}' has parent {index} but there are {bone_count} bones"),
                ));
            }
        };

        let translation = Vec3::from_array(reader.read_array()?);
        let rotation = Quat::from_array(reader.read_array()?);
        let scale = Vec3::from_array(reader.read_array()?);

        Ok(Self {
            name,
            parent,
            local: LocalTransform {
                translation,
                rotation,
                scale,
            },
        })
    }
}

/// Resolved rest pose of one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub head: Vec3,
    pub tail: Vec3,
    /// Global bind matrix with the coordinate remap applied.
    pub global: Mat4,
}

impl BonePose {
    #[must_use]
    pub fn length(&self) -> f32 {
        self.head.distance(self.tail)
    }
}

/// Per-bone rest poses, indexed like [`Skeleton::bones`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindPose {
    bones: Vec<BonePose>,
}

impl BindPose {
    #[must_use]
    pub fn bones(&self) -> &[BonePose] {
        &self.bones
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BonePose> {
        self.bones.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    /// Every bone appears after its parent.
    order: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    /// Build a skeleton, rejecting out-of-range parents and parent cycles.
    pub fn new(bones: Vec<Bone>) -> DecodeResult<Self> {
        Self::build(bones, 0)
    }

    fn build(bones: Vec<Bone>, offset: usize) -> DecodeResult<Self> {
        let mut children = vec![Vec::new(); bones.len()];
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= bones.len() {
                    return Err(DecodeError::corrupt(
                        offset,
                        format!(
                            "bone '{}' has parent {parent} but there are {} bones",
                            bone.name,
                            bones.len()
                        ),
                    ));
                }
                children[parent].push(index);
            }
        }

        let order = resolution_order(&bones).map_err(|bone| {
            DecodeError::corrupt(
                offset,
                format!("bone '{}' is part of a parent cycle", bones[bone].name),
            )
        })?;

        let mut seen = HashSet::new();
        for bone in &bones {
            if !seen.insert(bone.name.as_str()) {
                tracing::warn!(
                    "Duplicate bone name '{}'; name lookups resolve to the first occurrence",
                    bone.name
                );
            }
        }

        Ok(Self {
            bones,
            order,
            children,
        })
    }

    /// Read a skeleton section.
    pub fn read(reader: &mut Reader<'_>) -> DecodeResult<Self> {
        let start = reader.absolute_position();
        let bone_count = reader.read_u32()? as usize;

        let mut bones = Vec::new();
        for _ in 0..bone_count {
            bones.push(Bone::read(reader, bone_count)?);
        }

        tracing::debug!("Decoded skeleton: {} bones", bones.len());
        Self::build(bones, start)
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Index of the first bone called `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    #[must_use]
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Global bind matrices in engine space: `G = G_parent * local`.
    #[must_use]
    pub fn global_matrices(&self) -> Vec<Mat4> {
        let mut globals = vec![Mat4::IDENTITY; self.bones.len()];
        for &index in &self.order {
            let bone = &self.bones[index];
            let local = bone.local.matrix();
            globals[index] = match bone.parent {
                Some(parent) => globals[parent] * local,
                None => local,
            };
        }
        globals
    }

    /// Inverse of each global bind matrix, in engine space.
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.global_matrices().iter().map(Mat4::inverse).collect()
    }

    /// Resolve heads, tails and global matrices in the space given by `remap`.
    ///
    /// Bones with children point at the mean of their children's heads.
    /// Leaf bones point along [`LEAF_AXIS`] with the median length of the
    /// bones that have children (or [`FALLBACK_BONE_LENGTH`]). The lengths are
    /// a display heuristic; the format stores none.
    #[must_use]
    pub fn resolve_bind_pose(&self, remap: &CoordinateRemap) -> BindPose {
        let globals: Vec<Mat4> = self
            .global_matrices()
            .into_iter()
            .map(|g| remap.transform_matrix(g))
            .collect();
        let heads: Vec<Vec3> = globals.iter().map(|g| g.w_axis.truncate()).collect();

        let child_centres: Vec<Option<Vec3>> = self
            .children
            .iter()
            .map(|children| {
                if children.is_empty() {
                    return None;
                }
                let sum: Vec3 = children.iter().map(|&c| heads[c]).sum();
                Some(sum / children.len() as f32)
            })
            .collect();

        let lengths: Vec<f32> = child_centres
            .iter()
            .zip(&heads)
            .filter_map(|(centre, head)| centre.map(|c| c.distance(*head)))
            .filter(|&length| length > 0.0)
            .collect();
        let leaf_length = median(lengths).unwrap_or(FALLBACK_BONE_LENGTH);

        let bones = globals
            .iter()
            .zip(heads.iter().zip(&child_centres))
            .map(|(&global, (&head, centre))| {
                let mut tail = centre.unwrap_or(head + LEAF_AXIS * leaf_length);
                if tail.distance(head) < DEGENERATE_LENGTH {
                    tail = head + LEAF_AXIS * leaf_length.max(MIN_BONE_LENGTH);
                }
                BonePose { head, tail, global }
            })
            .collect();

        BindPose { bones }
    }
}

/// Order bones so every parent precedes its children.
///
/// Returns the index of a bone on a cycle if one exists.
fn resolution_order(bones: &[Bone]) -> Result<Vec<usize>, usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Pending,
        OnPath,
        Done,
    }

    let mut state = vec![State::Pending; bones.len()];
    let mut order = Vec::with_capacity(bones.len());
    let mut path = Vec::new();

    for start in 0..bones.len() {
        let mut current = Some(start);
        while let Some(index) = current {
            match state[index] {
                State::Done => break,
                State::OnPath => return Err(index),
                State::Pending => {
                    state[index] = State::OnPath;
                    path.push(index);
                    current = bones[index].parent;
                }
            }
        }
        // Path runs child to ancestor; resolve ancestors first.
        for index in path.drain(..).rev() {
            state[index] = State::Done;
            order.push(index);
        }
    }

    Ok(order)
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Read an inverse bind pose section: `count u32`, then `count` 3x4
/// column-major matrices (12 x f32 each).
pub fn read_inverse_bind_matrices(reader: &mut Reader<'_>) -> DecodeResult<Vec<Mat4>> {
    let count = reader.read_u32()? as usize;
    let mut matrices = Vec::new();
    for _ in 0..count {
        let m: [f32; 12] = reader.read_array()?;
        matrices.push(Mat4::from_cols(
            Vec4::new(m[0], m[1], m[2], 0.0),
            Vec4::new(m[3], m[4], m[5], 0.0),
            Vec4::new(m[6], m[7], m[8], 0.0),
            Vec4::new(m[9], m[10], m[11], 1.0),
        ));
    }
    Ok(matrices)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::SkeletonBuilder;

    const EPS: f32 = 1e-5;

    fn bone(name: &str, parent: Option<usize>, translation: Vec3) -> Bone {
        Bone {
            name: name.to_owned(),
            parent,
            local: LocalTransform {
                translation,
                ..LocalTransform::default()
            },
        }
    }

    #[test]
    fn root_global_equals_local() {
        let local = LocalTransform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.3),
            scale: Vec3::new(1.0, 2.0, 1.0),
        };
        let skeleton = Skeleton::new(vec![Bone {
            name: "Root".into(),
            parent: None,
            local,
        }])
        .unwrap();
        assert_eq!(skeleton.global_matrices()[0], local.matrix());
    }

    #[test]
    fn child_global_is_parent_times_local() {
        let parent = LocalTransform {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::from_rotation_z(FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let child = LocalTransform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            ..LocalTransform::default()
        };
        let skeleton = Skeleton::new(vec![
            Bone {
                name: "A".into(),
                parent: None,
                local: parent,
            },
            Bone {
                name: "B".into(),
                parent: Some(0),
                local: child,
            },
        ])
        .unwrap();

        let globals = skeleton.global_matrices();
        assert!(globals[1].abs_diff_eq(parent.matrix() * child.matrix(), EPS));
        // Child offset is scaled by 2, rotated onto +Y, then moved up by 1.
        assert!(globals[1].w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), EPS));
    }

    #[test]
    fn siblings_compose_with_shared_parent() {
        let skeleton = Skeleton::new(vec![
            bone("A", None, Vec3::new(0.0, 1.0, 0.0)),
            bone("B", Some(0), Vec3::new(1.0, 0.0, 0.0)),
            bone("C", Some(0), Vec3::new(-1.0, 0.0, 0.0)),
        ])
        .unwrap();

        let pose = skeleton.resolve_bind_pose(&CoordinateRemap::IDENTITY);
        assert!(pose.bones()[1].head.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPS));
        assert!(pose.bones()[2].head.abs_diff_eq(Vec3::new(-1.0, 1.0, 0.0), EPS));
        // A points at the mean of B and C, which is its own head.
        assert!(pose.bones()[0].length() >= MIN_BONE_LENGTH - EPS);
    }

    #[test]
    fn parents_may_follow_children() {
        let skeleton = Skeleton::new(vec![
            bone("Hand", Some(1), Vec3::new(0.0, 0.0, 1.0)),
            bone("Arm", None, Vec3::new(0.0, 2.0, 0.0)),
        ])
        .unwrap();
        let globals = skeleton.global_matrices();
        assert!(globals[0].w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 2.0, 1.0), EPS));
        assert_eq!(skeleton.children(1), &[0]);
        assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn cycles_are_corrupt() {
        let err = Skeleton::new(vec![
            bone("A", Some(1), Vec3::ZERO),
            bone("B", Some(0), Vec3::ZERO),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);

        let err = Skeleton::new(vec![bone("Self", Some(0), Vec3::ZERO)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn out_of_range_parent_is_corrupt() {
        let bytes = SkeletonBuilder::new()
            .bone("Root", -1, LocalTransform::default())
            .bone("Bad", 5, LocalTransform::default())
            .build();
        let err = Skeleton::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);

        let bytes = SkeletonBuilder::new()
            .bone("Bad", -2, LocalTransform::default())
            .build();
        let err = Skeleton::read(&mut Reader::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn reads_quaternion_in_xyzw_order() {
        let rotation = Quat::from_rotation_x(0.5);
        let bytes = SkeletonBuilder::new()
            .bone(
                "Root",
                -1,
                LocalTransform {
                    translation: Vec3::new(1.0, 2.0, 3.0),
                    rotation,
                    scale: Vec3::ONE,
                },
            )
            .build();
        let skeleton = Skeleton::read(&mut Reader::new(&bytes)).unwrap();
        let bone = &skeleton.bones()[0];
        assert_eq!(bone.local.rotation, rotation);
        assert_eq!(bone.local.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bone.parent, None);
    }

    #[test]
    fn leaf_bones_use_median_length() {
        // Chain lengths 1 and 3, so the median is 2.
        let skeleton = Skeleton::new(vec![
            bone("A", None, Vec3::ZERO),
            bone("B", Some(0), Vec3::new(1.0, 0.0, 0.0)),
            bone("C", Some(1), Vec3::new(3.0, 0.0, 0.0)),
        ])
        .unwrap();
        let pose = skeleton.resolve_bind_pose(&CoordinateRemap::IDENTITY);

        assert!(pose.bones()[0].tail.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
        assert!(pose.bones()[1].tail.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), EPS));
        let leaf = pose.bones()[2];
        assert!(leaf.tail.abs_diff_eq(leaf.head + LEAF_AXIS * 2.0, EPS));
    }

    #[test]
    fn lone_bone_uses_fallback_length() {
        let skeleton = Skeleton::new(vec![bone("Only", None, Vec3::ONE)]).unwrap();
        let pose = skeleton.resolve_bind_pose(&CoordinateRemap::IDENTITY);
        assert!((pose.bones()[0].length() - FALLBACK_BONE_LENGTH).abs() < EPS);
    }

    #[test]
    fn collapsed_tails_get_minimum_length() {
        // Child sits exactly on its parent, and is the only measured length.
        let skeleton = Skeleton::new(vec![
            bone("A", None, Vec3::new(0.0, 5.0, 0.0)),
            bone("B", Some(0), Vec3::ZERO),
        ])
        .unwrap();
        let pose = skeleton.resolve_bind_pose(&CoordinateRemap::IDENTITY);
        for bone in pose.bones() {
            assert!(bone.length() >= MIN_BONE_LENGTH - 1e-6, "{bone:?}");
            let direction = (bone.tail - bone.head).normalize();
            assert!(direction.abs_diff_eq(LEAF_AXIS, EPS));
        }
    }

    #[test]
    fn remap_applies_to_heads_and_matrices() {
        let skeleton = Skeleton::new(vec![bone("A", None, Vec3::new(0.0, 1.0, 0.0))]).unwrap();
        let remap = CoordinateRemap::z_up();
        let pose = skeleton.resolve_bind_pose(&remap);
        assert!(pose.bones()[0].head.abs_diff_eq(Vec3::Z, EPS));
        assert!(pose.bones()[0]
            .global
            .abs_diff_eq(remap.matrix() * skeleton.global_matrices()[0], EPS));
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let skeleton = Skeleton::new(vec![
            bone("Twin", None, Vec3::ZERO),
            bone("Twin", Some(0), Vec3::X),
        ])
        .unwrap();
        assert_eq!(skeleton.find("Twin"), Some(0));
        assert_eq!(skeleton.find("Missing"), None);
    }

    #[test]
    fn inverse_bind_matrices_undo_globals() {
        let skeleton = Skeleton::new(vec![
            bone("A", None, Vec3::new(0.0, 1.0, 0.0)),
            bone("B", Some(0), Vec3::new(0.0, 1.0, 0.0)),
        ])
        .unwrap();
        for (g, inv) in skeleton
            .global_matrices()
            .iter()
            .zip(skeleton.inverse_bind_matrices())
        {
            assert!((*g * inv).abs_diff_eq(Mat4::IDENTITY, EPS));
        }
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(vec![5.0]), Some(5.0));
        assert_eq!(median(Vec::new()), None);
    }
}
