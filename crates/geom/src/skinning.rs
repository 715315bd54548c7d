//! Per-vertex bone weights mapped onto skeleton bones.
//!
//! Meshes store up to four `(index, weight)` pairs per vertex. The index
//! selects an entry in the mesh's palette, and the palette entry names a
//! skeleton bone.

use std::collections::{BTreeMap, HashSet};

use geom_decode::{DecodeResult, Mesh, Normalization, Semantic, Skeleton};

/// Weights one skeleton bone contributes to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightGroup {
    /// Index into the skeleton's bones.
    pub bone: usize,
    pub bone_name: String,
    /// `(vertex, weight)` in vertex order.
    pub weights: Vec<(u32, f32)>,
}

/// Map a mesh's palette-indexed weights onto `skeleton` bones.
///
/// Returns one group per bone that receives any weight, ordered by bone
/// index. Zero weights are skipped, and slots of one vertex that resolve to
/// the same bone add up to a single entry. Palette indices past the palette,
/// and palette names that match no bone, drop their contribution with a
/// warning. Indices must be unsigned integers; signed or float index data
/// drops every weight of the mesh with a warning. A mesh missing either the
/// index or the weight attribute has no weights.
pub fn skin_weights(
    mesh: &Mesh,
    skeleton: &Skeleton,
    normalization: Normalization,
) -> DecodeResult<Vec<WeightGroup>> {
    let (Some(indices), Some(weights)) = (
        mesh.extract_raw(Semantic::Index)?,
        mesh.extract(Semantic::Weight, normalization)?,
    ) else {
        return Ok(Vec::new());
    };

    let Some(palette_slots) = indices.data().to_u32() else {
        let dtype = indices.data().dtype();
        tracing::warn!(
            "Mesh '{}' stores bone indices as {} {:?}; dropping its weights",
            mesh.name(),
            if dtype.is_float() { "float" } else { "signed" },
            dtype
        );
        return Ok(Vec::new());
    };

    // Resolve each palette slot to a bone once.
    let palette: Vec<Option<usize>> = mesh
        .palette()
        .iter()
        .map(|name| {
            let bone = skeleton.find(name);
            if bone.is_none() {
                tracing::warn!(
                    "Mesh '{}' palette names bone '{}', which the skeleton lacks",
                    mesh.name(),
                    name
                );
            }
            bone
        })
        .collect();

    let mut groups: BTreeMap<usize, Vec<(u32, f32)>> = BTreeMap::new();
    let mut bad_slots = HashSet::new();

    let slot_rows = palette_slots.chunks(indices.components());
    for (vertex, (slots, amounts)) in slot_rows.zip(weights.rows()).enumerate() {
        let vertex = vertex as u32;
        for (&slot, &amount) in slots.iter().zip(amounts) {
            if amount == 0.0 {
                continue;
            }
            let slot = slot as usize;
            match palette.get(slot) {
                Some(Some(bone)) => {
                    let group = groups.entry(*bone).or_default();
                    match group.last_mut() {
                        Some((last, total)) if *last == vertex => *total += amount,
                        _ => group.push((vertex, amount)),
                    }
                }
                Some(None) => {}
                None => {
                    bad_slots.insert(slot);
                }
            }
        }
    }

    if !bad_slots.is_empty() {
        tracing::warn!(
            "Mesh '{}' uses {} palette slots beyond its {}-entry palette",
            mesh.name(),
            bad_slots.len(),
            palette.len()
        );
    }

    Ok(groups
        .into_iter()
        .map(|(bone, weights)| WeightGroup {
            bone,
            bone_name: skeleton.bones()[bone].name.clone(),
            weights,
        })
        .collect())
}
