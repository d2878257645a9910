use crate::geometry::SubMesh;
use crate::mesh::MeshRecord;

const DEFAULT_TANGENT: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Concatenate sub-meshes into one record.
///
/// Each sub-mesh's indices are shifted by the number of vertices already in
/// the record, so every index keeps addressing the vertex it did before.
/// When `with_tangents` is set the tangent array stays parallel to the
/// vertex array, padding sub-meshes that carry none.
pub fn merge_sub_meshes<I>(material: usize, sub_meshes: I, with_tangents: bool) -> MeshRecord
where
    I: IntoIterator<Item = SubMesh>,
{
    let mut record = MeshRecord::empty(material);

    for sub in sub_meshes {
        let offset = record.vertices.len() as u32;
        record
            .indices
            .extend(sub.indices.iter().map(|&i| i + offset));

        if with_tangents {
            match sub.tangents {
                Some(tangents) if tangents.len() == sub.vertices.len() => {
                    record.tangents.extend(tangents);
                }
                _ => record
                    .tangents
                    .extend(std::iter::repeat(DEFAULT_TANGENT).take(sub.vertices.len())),
            }
        }

        record.vertices.extend(sub.vertices);
    }

    record
}

/// Merge sub-meshes that share a material slot.
///
/// Records come out in the order their slot first appears in the input;
/// within a slot sub-meshes keep their input order.
pub fn group_by_material(sub_meshes: Vec<(usize, SubMesh)>, with_tangents: bool) -> Vec<MeshRecord> {
    let mut order: Vec<usize> = Vec::new();
    let mut groups: Vec<Vec<SubMesh>> = Vec::new();

    for (material, sub) in sub_meshes {
        match order.iter().position(|&m| m == material) {
            Some(slot) => groups[slot].push(sub),
            None => {
                order.push(material);
                groups.push(vec![sub]);
            }
        }
    }

    order
        .into_iter()
        .zip(groups)
        .map(|(material, subs)| merge_sub_meshes(material, subs, with_tangents))
        .collect()
}
