use std::collections::HashMap;

use glam::{Vec2, Vec3};
use tracing::trace;

use crate::error::ImportError;
use crate::mesh::Vertex;
use crate::options::ImportOptions;

/// Below this the UV parallelogram is treated as degenerate.
const UV_AREA_EPSILON: f32 = 1e-12;

/// How a primitive's index list is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    Points,
}

/// A primitive as it comes out of the file, before post-processing.
#[derive(Debug, Clone, Default)]
pub struct RawPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    pub topology: Option<Topology>,
}

/// A post-processed triangle list, ready to be merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub tangents: Option<Vec<[f32; 4]>>,
}

/// Run the requested post-processing steps on one primitive.
///
/// Returns `Ok(None)` when the primitive carries no triangles after
/// triangulation (points, lines, or an empty index list).
pub fn process(raw: RawPrimitive, options: ImportOptions) -> Result<Option<SubMesh>, ImportError> {
    let vertex_count = raw.positions.len();
    if let Some(&index) = raw.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ImportError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }

    let topology = raw.topology.unwrap_or(Topology::Triangles);
    let Some(indices) = triangulate(topology, &raw.indices, options) else {
        trace!("skipping {:?} primitive", topology);
        return Ok(None);
    };
    if indices.is_empty() {
        return Ok(None);
    }

    let normals = raw.normals.filter(|n| n.len() == vertex_count);
    let uvs = raw.uvs.filter(|uv| uv.len() == vertex_count);
    let has_uvs = uvs.is_some();

    let (mut vertices, mut indices) = match normals {
        Some(normals) => {
            let vertices = (0..vertex_count)
                .map(|i| {
                    let uv = uvs.as_ref().map_or([0.0; 2], |uv| uv[i]);
                    Vertex::new(raw.positions[i], normals[i], uv)
                })
                .collect();
            (vertices, indices)
        }
        None if options.contains(ImportOptions::GENERATE_NORMALS) => {
            flat_normals(&raw.positions, uvs.as_deref(), &indices)
        }
        None => {
            let vertices = (0..vertex_count)
                .map(|i| {
                    let uv = uvs.as_ref().map_or([0.0; 2], |uv| uv[i]);
                    Vertex::new(raw.positions[i], [0.0; 3], uv)
                })
                .collect();
            (vertices, indices)
        }
    };

    if options.contains(ImportOptions::WELD_VERTICES) {
        vertices = weld(vertices, &mut indices);
    }

    let tangents = options.contains(ImportOptions::COMPUTE_TANGENTS).then(|| {
        if has_uvs {
            compute_tangents(&vertices, &indices)
        } else {
            vec![[0.0, 0.0, 0.0, 1.0]; vertices.len()]
        }
    });

    Ok(Some(SubMesh {
        vertices,
        indices,
        tangents,
    }))
}

/// Expand an index list into a plain triangle list.
///
/// Strips and fans are only accepted when `TRIANGULATE` is set. Trailing
/// indices that do not complete a triangle are dropped.
pub fn triangulate(topology: Topology, indices: &[u32], options: ImportOptions) -> Option<Vec<u32>> {
    let convert = options.contains(ImportOptions::TRIANGULATE);
    match topology {
        Topology::Triangles => Some(
            indices
                .chunks_exact(3)
                .flat_map(|tri| tri.iter().copied())
                .collect(),
        ),
        Topology::TriangleStrip if convert => {
            let mut out = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for (i, w) in indices.windows(3).enumerate() {
                if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
                    continue;
                }
                // Odd triangles are flipped to keep a consistent winding.
                if i % 2 == 0 {
                    out.extend_from_slice(&[w[0], w[1], w[2]]);
                } else {
                    out.extend_from_slice(&[w[1], w[0], w[2]]);
                }
            }
            Some(out)
        }
        Topology::TriangleFan if convert => {
            let Some((&center, rest)) = indices.split_first() else {
                return Some(Vec::new());
            };
            Some(
                rest.windows(2)
                    .flat_map(|w| [center, w[0], w[1]])
                    .collect(),
            )
        }
        _ => None,
    }
}

/// De-index a triangle list and give each triangle its face normal.
fn flat_normals(
    positions: &[[f32; 3]],
    uvs: Option<&[[f32; 2]]>,
    indices: &[u32],
) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        let normal = (pb - pa).cross(pc - pa).normalize_or_zero().to_array();
        for i in [a, b, c] {
            let uv = uvs.map_or([0.0; 2], |uv| uv[i]);
            vertices.push(Vertex::new(positions[i], normal, uv));
        }
    }
    let indices = (0..vertices.len() as u32).collect();
    (vertices, indices)
}

/// Collapse bit-identical vertices, rewriting `indices` in place.
pub fn weld(vertices: Vec<Vertex>, indices: &mut [u32]) -> Vec<Vertex> {
    let mut seen: HashMap<[u32; 8], u32> = HashMap::with_capacity(vertices.len());
    let mut remap = Vec::with_capacity(vertices.len());
    let mut unique = Vec::with_capacity(vertices.len());

    for vertex in &vertices {
        let next = unique.len() as u32;
        let slot = *seen.entry(vertex.bits()).or_insert_with(|| {
            unique.push(*vertex);
            next
        });
        remap.push(slot);
    }

    for index in indices.iter_mut() {
        *index = remap[*index as usize];
    }
    unique
}

/// Per-vertex tangents from positions, normals and UVs.
///
/// The xyz part is orthogonalized against the normal; w is the bitangent
/// handedness (+1 or -1).
pub fn compute_tangents(vertices: &[Vertex], indices: &[u32]) -> Vec<[f32; 4]> {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let p0 = Vec3::from(vertices[a].position);
        let e1 = Vec3::from(vertices[b].position) - p0;
        let e2 = Vec3::from(vertices[c].position) - p0;

        let uv0 = Vec2::from(vertices[a].uv);
        let d1 = Vec2::from(vertices[b].uv) - uv0;
        let d2 = Vec2::from(vertices[c].uv) - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < UV_AREA_EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let bt = (e2 * d1.x - e1 * d2.x) * r;

        for i in [a, b, c] {
            tangents[i] += t;
            bitangents[i] += bt;
        }
    }

    vertices
        .iter()
        .zip(tangents.iter().zip(&bitangents))
        .map(|(vertex, (&t, &bt))| {
            let n = Vec3::from(vertex.normal).normalize_or_zero();
            let mut tangent = (t - n * n.dot(t)).normalize_or_zero();
            if tangent == Vec3::ZERO {
                tangent = if n == Vec3::ZERO {
                    Vec3::X
                } else {
                    n.any_orthonormal_vector()
                };
            }
            let w = if n.cross(tangent).dot(bt) < 0.0 { -1.0 } else { 1.0 };
            tangent.extend(w).to_array()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> RawPrimitive {
        RawPrimitive {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: Some(vec![[0.0, 0.0, 1.0]; 4]),
            uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
            indices: vec![0, 1, 2, 0, 2, 3],
            topology: Some(Topology::Triangles),
        }
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut raw = quad();
        raw.indices.push(9);
        match process(raw, ImportOptions::VIEWER) {
            Err(ImportError::IndexOutOfRange { index, vertex_count }) => {
                assert_eq!(index, 9);
                assert_eq!(vertex_count, 4);
            }
            other => panic!("expected IndexOutOfRange, got: {:?}", other),
        }
    }

    #[test]
    fn strip_becomes_triangle_list_with_consistent_winding() {
        let tris = triangulate(Topology::TriangleStrip, &[0, 1, 2, 3], ImportOptions::VIEWER)
            .unwrap();
        assert_eq!(tris, vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn fan_shares_first_vertex() {
        let tris = triangulate(Topology::TriangleFan, &[0, 1, 2, 3, 4], ImportOptions::VIEWER)
            .unwrap();
        assert_eq!(tris, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn strip_without_triangulate_is_skipped() {
        assert!(triangulate(Topology::TriangleStrip, &[0, 1, 2], ImportOptions::empty()).is_none());
    }

    #[test]
    fn points_and_lines_produce_nothing() {
        let mut raw = quad();
        raw.topology = Some(Topology::Points);
        assert!(process(raw.clone(), ImportOptions::VIEWER).unwrap().is_none());
        raw.topology = Some(Topology::Lines);
        assert!(process(raw, ImportOptions::VIEWER).unwrap().is_none());
    }

    #[test]
    fn incomplete_trailing_triangle_is_dropped() {
        let tris = triangulate(Topology::Triangles, &[0, 1, 2, 3, 4], ImportOptions::VIEWER)
            .unwrap();
        assert_eq!(tris, vec![0, 1, 2]);
    }

    #[test]
    fn weld_merges_identical_vertices() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        let w = Vertex::new([4.0, 5.0, 6.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        let mut indices = vec![0, 1, 2, 2, 1, 0];
        let unique = weld(vec![v, w, v], &mut indices);
        assert_eq!(unique, vec![v, w]);
        assert_eq!(indices, vec![0, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn weld_keeps_vertices_that_differ_only_in_uv() {
        let a = Vertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0, 0.0]);
        let b = Vertex::new([0.0; 3], [0.0, 0.0, 1.0], [1.0, 0.0]);
        let mut indices = vec![0, 1];
        assert_eq!(weld(vec![a, b], &mut indices).len(), 2);
    }

    #[test]
    fn missing_normals_are_generated_flat() {
        let mut raw = quad();
        raw.normals = None;
        let sub = process(raw, ImportOptions::VIEWER).unwrap().unwrap();
        assert!(sub.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        // Shared corners weld back together since the quad is planar.
        assert_eq!(sub.vertices.len(), 4);
        assert_eq!(sub.indices.len(), 6);
    }

    #[test]
    fn missing_normals_without_generation_are_zero() {
        let mut raw = quad();
        raw.normals = None;
        let sub = process(raw, ImportOptions::empty()).unwrap().unwrap();
        assert!(sub.vertices.iter().all(|v| v.normal == [0.0; 3]));
        assert!(sub.tangents.is_none());
    }

    #[test]
    fn missing_uvs_are_zero_with_default_tangents() {
        let mut raw = quad();
        raw.uvs = None;
        let sub = process(raw, ImportOptions::VIEWER).unwrap().unwrap();
        assert!(sub.vertices.iter().all(|v| v.uv == [0.0, 0.0]));
        let tangents = sub.tangents.unwrap();
        assert_eq!(tangents.len(), sub.vertices.len());
        assert!(tangents.iter().all(|t| *t == [0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn tangents_follow_u_direction() {
        let sub = process(quad(), ImportOptions::VIEWER).unwrap().unwrap();
        let tangents = sub.tangents.unwrap();
        assert_eq!(tangents.len(), 4);
        for t in tangents {
            assert!((t[0] - 1.0).abs() < 1e-5, "tangent {:?}", t);
            assert!(t[1].abs() < 1e-5);
            assert!(t[2].abs() < 1e-5);
            assert_eq!(t[3], 1.0);
        }
    }

    #[test]
    fn mirrored_uvs_flip_handedness() {
        let mut raw = quad();
        raw.uvs = Some(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
        let sub = process(raw, ImportOptions::VIEWER).unwrap().unwrap();
        assert!(sub.tangents.unwrap().iter().all(|t| t[3] == -1.0));
    }

    #[test]
    fn tangents_are_orthogonal_to_normals() {
        let mut raw = quad();
        raw.normals = Some(vec![[0.0, 0.6, 0.8]; 4]);
        let sub = process(raw, ImportOptions::VIEWER).unwrap().unwrap();
        for (v, t) in sub.vertices.iter().zip(sub.tangents.unwrap()) {
            let dot = Vec3::from(v.normal).dot(Vec3::new(t[0], t[1], t[2]));
            assert!(dot.abs() < 1e-5);
        }
    }
}
